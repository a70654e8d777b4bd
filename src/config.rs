use std::{
    env, fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use which::which;

use crate::{Result, VaultError};

/// Environment variable naming an explicit storage directory.
pub const STORAGE_DIR_ENV: &str = "CONTENT_VAULT_DIR";

/// When set (to anything but `0`/`false`), storage goes under the system temp directory.
pub const EPHEMERAL_ENV: &str = "CONTENT_VAULT_EPHEMERAL";

pub const DEFAULT_SNAPSHOT_FILE: &str = "items.json";
pub const DEFAULT_RECENT_DAYS: u32 = 7;

const LOCAL_DIR_NAME: &str = ".content-vault";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the snapshot file
    pub storage_dir: PathBuf,

    /// File name of the snapshot inside `storage_dir`
    pub snapshot_file: String,

    /// Look-back window used by `recent` when none is given
    pub recent_days: u32,

    /// Editor used to compose notes
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
            recent_days: DEFAULT_RECENT_DAYS,
            editor_command: None,
        }
    }
}

impl Config {
    /// Loads configuration from an explicit file, or from `config.json` in the
    /// platform config directory when one exists, then applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_file().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Reads a JSON configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| VaultError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&raw).map_err(|e| VaultError::ConfigError {
            message: format!("invalid configuration in {}: {}", path.display(), e),
        })
    }

    /// Applies `CONTENT_VAULT_DIR` / `CONTENT_VAULT_EPHEMERAL`. An explicit
    /// directory wins over the ephemeral switch.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(STORAGE_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            debug!("{} overrides storage directory: {}", STORAGE_DIR_ENV, dir);
            self.storage_dir = PathBuf::from(dir.trim());
            return;
        }

        let ephemeral = lookup(EPHEMERAL_ENV)
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "" | "0" | "false"))
            .unwrap_or(false);
        if ephemeral {
            self.storage_dir = env::temp_dir().join(LOCAL_DIR_NAME);
            debug!(
                "{} set, using ephemeral storage at {}",
                EPHEMERAL_ENV,
                self.storage_dir.display()
            );
        }
    }

    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.storage_dir.join(&self.snapshot_file)
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -W -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "contentvault")
}

/// Platform data directory, or `./.content-vault` when none can be determined.
fn default_storage_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(LOCAL_DIR_NAME))
}

fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn explicit_dir_beats_ephemeral() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[
            (STORAGE_DIR_ENV, "/srv/vault"),
            (EPHEMERAL_ENV, "1"),
        ]));
        assert_eq!(config.snapshot_path(), PathBuf::from("/srv/vault/items.json"));
    }

    #[test]
    fn ephemeral_uses_temp_dir() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[(EPHEMERAL_ENV, "true")]));
        assert_eq!(config.storage_dir, env::temp_dir().join(".content-vault"));

        let mut untouched = Config::default();
        untouched.apply_env(lookup_from(&[(EPHEMERAL_ENV, "false")]));
        assert_eq!(untouched, Config::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "storage_dir": "/data/vault", "recent_days": 30 }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/data/vault"));
        assert_eq!(config.recent_days, 30);
        assert_eq!(config.snapshot_file, DEFAULT_SNAPSHOT_FILE);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(VaultError::ConfigError { .. })
        ));
    }
}
