use thiserror::Error;

/// Core error types for nsgsync
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV input could not be read or parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// az CLI invocation failed
    #[error("az CLI error: {message}")]
    AzCli {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    /// Input validation failed
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    /// Required configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal logic error
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

/// Database of az CLI error patterns and their translations
pub struct AzCliErrorPattern;

impl AzCliErrorPattern {
    /// Matches an error message against known patterns and returns a user-friendly translation.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();

        // Missing az binary
        if lower.contains("no such file") || lower.contains("command not found") {
            return ErrorTranslation::new("The Azure CLI is not installed or not found in PATH")
                .with_suggestion("Install it: https://learn.microsoft.com/cli/azure/install-azure-cli")
                .with_suggestion("Or point NSGSYNC_AZ_PATH at the az binary");
        }

        // Expired or missing login
        if lower.contains("az login")
            || lower.contains("please run 'az login'")
            || lower.contains("refresh token has expired")
        {
            return ErrorTranslation::new("Azure CLI session is missing or expired")
                .with_suggestion("Run: az login")
                .with_suggestion("For CI, use a service principal: az login --service-principal");
        }

        // Wrong resource scope
        if lower.contains("resourcegroupnotfound") || lower.contains("resource group") {
            return ErrorTranslation::new("Resource group not found")
                .with_suggestion("Check the RESOURCE_GROUP environment variable")
                .with_suggestion("List groups: az group list --output table");
        }

        if lower.contains("networksecuritygroup") && lower.contains("not found") {
            return ErrorTranslation::new("Network security group not found")
                .with_suggestion("Check the NSG_NAME environment variable")
                .with_suggestion("List NSGs: az network nsg list --output table");
        }

        // Service-side rule rejections
        if lower.contains("priority") && (lower.contains("invalid") || lower.contains("conflict")) {
            return ErrorTranslation::new("Rule priority rejected by the service")
                .with_suggestion("Priorities must be 100-4096 and unique per direction")
                .with_suggestion("Pick a priority no other rule in this NSG uses");
        }

        if lower.contains("securityrule") && lower.contains("invalid") {
            return ErrorTranslation::new("The service rejected the rule definition")
                .with_suggestion("Check address prefixes and port ranges for typos")
                .with_suggestion("Service tags (VirtualNetwork, Internet, ...) are case-sensitive");
        }

        // Authorization
        if lower.contains("authorizationfailed") || lower.contains("does not have authorization") {
            return ErrorTranslation::new("Not authorized to modify this NSG")
                .with_suggestion("You need the Network Contributor role on the resource group")
                .with_suggestion("Check: az role assignment list --assignee <your-principal>");
        }

        // Throttling
        if lower.contains("toomanyrequests") || lower.contains("retryableerror") {
            return ErrorTranslation::new("The Azure API is throttling requests")
                .with_suggestion("Wait a minute and re-run; the tool is idempotent")
                .with_suggestion("Already-correct rules are skipped on the next run");
        }

        // Generic fallback
        ErrorTranslation::new(format!("Azure CLI error: {msg}"))
            .with_suggestion("Check the detailed error message for more information")
            .with_suggestion(
                "Verify access manually: az network nsg show --resource-group <rg> --name <nsg>",
            )
    }
}
