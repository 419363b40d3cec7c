//! Environment constants and path utilities for tasktree.
//!
//! Centralizes the file and directory names used by configuration discovery.

use std::path::{Path, PathBuf};

/// Hidden per-project and per-user directory name
pub const TASKTREE_DIR_NAME: &str = ".tasktree";

/// Configuration file name inside [`TASKTREE_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name at a project root
pub const LOCAL_CONFIG_FILE_NAME: &str = "tasktree.toml";

/// Filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "tasktree=info";

/// Filter used by `--verbose`
pub const VERBOSE_LOG_FILTER: &str = "tasktree=debug";

/// Build the .tasktree directory path under `base`
pub fn tasktree_dir_path(base: &Path) -> PathBuf {
    base.join(TASKTREE_DIR_NAME)
}

/// Build ./tasktree.toml
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_CONFIG_FILE_NAME)
}

/// Build ./.tasktree/config.toml
pub fn local_dir_config_file_path(current_dir: &Path) -> PathBuf {
    tasktree_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

/// Build ~/.tasktree/config.toml
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    tasktree_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let home_dir = Path::new("/home/user");
        let current_dir = Path::new("/current/project");

        assert_eq!(
            user_config_file_path(home_dir),
            Path::new("/home/user/.tasktree/config.toml")
        );
        assert_eq!(
            local_config_file_path(current_dir),
            Path::new("/current/project/tasktree.toml")
        );
        assert_eq!(
            local_dir_config_file_path(current_dir),
            Path::new("/current/project/.tasktree/config.toml")
        );
    }
}
