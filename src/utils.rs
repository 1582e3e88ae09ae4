//! Utility functions for directory management and list formatting
//!
//! Directories follow the XDG Base Directory specification:
//!
//! - Config: `~/.config/rulegate/` - Policy configuration (`policy.json`)
//! - State: `~/.local/state/rulegate/` - Audit log
//!
//! # Example
//!
//! ```
//! use rulegate::utils::{get_config_dir, summarize_list};
//!
//! if let Some(config_path) = get_config_dir() {
//!     // Look for policy.json under config_path
//! }
//!
//! let sources = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string(), "10.0.0.3".to_string()];
//! assert_eq!(summarize_list(&sources, 2), "10.0.0.1, 10.0.0.2...");
//! ```

use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "rulegate", "rulegate")
}

pub fn get_config_dir() -> Option<PathBuf> {
    project_dirs().map(|pd| pd.config_dir().to_path_buf())
}

pub fn get_state_dir() -> Option<PathBuf> {
    project_dirs().and_then(|pd| pd.state_dir().map(std::path::Path::to_path_buf))
}

/// Creates the state directory with user-only permissions and returns it.
pub fn ensure_state_dir() -> std::io::Result<PathBuf> {
    let dir = get_state_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "State directory not found")
    })?;

    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        DirBuilder::new().mode(0o700).recursive(true).create(&dir)?;
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(&dir)?;
    }

    Ok(dir)
}

/// Joins the first `max_items` entries with `, ` and appends `...` when
/// entries were left out.
pub fn summarize_list(items: &[String], max_items: usize) -> String {
    let shown = items
        .iter()
        .take(max_items)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    if items.len() > max_items {
        format!("{shown}...")
    } else {
        shown
    }
}

/// Title-cases a `snake_case` key: `ticket_id` becomes `Ticket Id`.
pub fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_summarize_list() {
        assert_eq!(summarize_list(&strings(&["a"]), 2), "a");
        assert_eq!(summarize_list(&strings(&["a", "b"]), 2), "a, b");
        assert_eq!(summarize_list(&strings(&["a", "b", "c"]), 2), "a, b...");
        assert_eq!(summarize_list(&[], 2), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("ticket_id"), "Ticket Id");
        assert_eq!(title_case("requested_by"), "Requested By");
        assert_eq!(title_case("ENVIRONMENT"), "Environment");
        assert_eq!(title_case("__x"), "X");
    }
}
