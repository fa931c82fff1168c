/// Where the application keeps its files, and the few knobs that can be
/// changed from the environment.
///
/// | Variable                    | Default                                      |
/// |-----------------------------|----------------------------------------------|
/// | `OFFICEVIEWER_CACHE_DIR`    | `<cache dir>/OfficeViewer`                   |
/// | `OFFICEVIEWER_DATA_DIR`     | `<data dir>/OfficeViewer`                    |
/// | `OFFICEVIEWER_RECENT_LIMIT` | unbounded                                    |
/// | `OFFICEVIEWER_SHELL`        | `/bin/zsh` on macOS, `/bin/sh` elsewhere     |

use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const APP_DIR_NAME: &str = "OfficeViewer";
pub const DB_FILE_NAME: &str = "office_viewer.db";

#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    /// Root under which every decoded folder is created
    pub cache_dir: PathBuf,
    /// Directory holding the settings database
    pub data_dir: PathBuf,
    /// Maximum number of recent files kept; `None` keeps everything
    pub recent_limit: Option<usize>,
    /// Shell override for running open commands
    pub shell: Option<PathBuf>,
}

impl AppPaths {
    /// Resolve paths from the environment, falling back to the platform directories
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cache_dir = non_empty("OFFICEVIEWER_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_dir);
        let data_dir = non_empty("OFFICEVIEWER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let recent_limit = non_empty("OFFICEVIEWER_RECENT_LIMIT").and_then(|raw| {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => Some(limit),
                _ => {
                    warn!("⚠️  Ignoring OFFICEVIEWER_RECENT_LIMIT={:?}, expected a positive integer", raw);
                    None
                }
            }
        });
        let shell = non_empty("OFFICEVIEWER_SHELL").map(PathBuf::from);

        Self {
            cache_dir,
            data_dir,
            recent_limit,
            shell,
        }
    }

    /// Get the path where the settings database should be stored
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

/// ~/.cache/OfficeViewer on Linux, ~/Library/Caches/OfficeViewer on macOS
fn default_cache_dir() -> PathBuf {
    let mut path = dirs_next::cache_dir()
        .or_else(|| dirs_next::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(env::temp_dir);
    path.push(APP_DIR_NAME);
    path
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(env::temp_dir);
    path.push(APP_DIR_NAME);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn paths_with(vars: &[(&str, &str)]) -> AppPaths {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppPaths::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_end_in_app_dir() {
        let paths = paths_with(&[]);
        assert!(paths.cache_dir.ends_with(APP_DIR_NAME));
        assert!(paths.data_dir.ends_with(APP_DIR_NAME));
        assert_eq!(paths.recent_limit, None);
        assert_eq!(paths.shell, None);
        assert!(paths.db_path().ends_with(DB_FILE_NAME));
    }

    #[test]
    fn test_environment_overrides() {
        let paths = paths_with(&[
            ("OFFICEVIEWER_CACHE_DIR", "/tmp/ov-cache"),
            ("OFFICEVIEWER_DATA_DIR", "/tmp/ov-data"),
            ("OFFICEVIEWER_RECENT_LIMIT", "25"),
            ("OFFICEVIEWER_SHELL", "/bin/bash"),
        ]);

        assert_eq!(paths.cache_dir, PathBuf::from("/tmp/ov-cache"));
        assert_eq!(paths.db_path(), PathBuf::from("/tmp/ov-data/office_viewer.db"));
        assert_eq!(paths.recent_limit, Some(25));
        assert_eq!(paths.shell, Some(PathBuf::from("/bin/bash")));
    }

    #[test]
    fn test_bad_limit_means_unbounded() {
        assert_eq!(paths_with(&[("OFFICEVIEWER_RECENT_LIMIT", "0")]).recent_limit, None);
        assert_eq!(paths_with(&[("OFFICEVIEWER_RECENT_LIMIT", "lots")]).recent_limit, None);
    }
}
