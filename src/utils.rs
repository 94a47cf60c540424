//! Directory helpers
//!
//! Audit logs live under the XDG state directory
//! (`~/.local/state/nsgsync/` on Linux) following the Base Directory
//! specification.

use directories::ProjectDirs;
use std::path::PathBuf;

pub fn get_state_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "nsgsync", "nsgsync")
        .and_then(|pd| pd.state_dir().map(std::path::Path::to_path_buf))
}

pub fn ensure_dirs() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        let mut builder = DirBuilder::new();
        builder.mode(0o700); // User read/write/execute only
        builder.recursive(true);

        if let Some(dir) = get_state_dir() {
            builder.create(dir)?;
        }
    }

    #[cfg(not(unix))]
    {
        if let Some(dir) = get_state_dir() {
            std::fs::create_dir_all(dir)?;
        }
    }

    Ok(())
}
