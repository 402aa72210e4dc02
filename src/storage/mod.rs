pub mod notifications;

pub use notifications::NotificationLog;

use std::fs;
use std::path::Path;

/// Ensure the parent directory of a database file exists
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
