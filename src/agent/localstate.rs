//! Local state digest: the listing of the watched directory, as one
//! heartbeat payload string.

use std::fs;
use std::path::Path;

/// Reported when the directory exists but holds no entries.
pub const NO_FILES: &str = "No files available.";

/// Describe the node's local state as a single payload string.
///
/// Creates the directory on first use. I/O problems are folded into the
/// returned string so the heartbeat cadence is never interrupted.
pub fn describe_local_state(dir: &Path) -> String {
    if !dir.exists() {
        tracing::info!(dir = %dir.display(), "home directory missing, creating");
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create home directory");
            return format!("ERROR: cannot create home directory: {e}");
        }
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot read home directory");
            return format!("ERROR: cannot read home directory: {e}");
        }
    };

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    if names.is_empty() {
        return NO_FILES.to_string();
    }
    names.sort();
    names.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lists_entries_sorted_and_comma_joined() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(describe_local_state(dir.path()), "a.txt,b.txt,sub");
    }

    #[test]
    fn empty_directory_reports_sentinel() {
        let dir = TempDir::new().unwrap();
        assert_eq!(describe_local_state(dir.path()), NO_FILES);
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");

        assert_eq!(describe_local_state(&home), NO_FILES);
        assert!(home.is_dir());
    }
}
