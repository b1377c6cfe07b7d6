use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use toml;
use tracing::{info, warn};

/// Configuration for the quizbank data layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL for the database connection (the key-value store)
    pub database_url: String,
    /// Directory holding the bundled dataset tree, if any
    pub data_dir: Option<PathBuf>,
    /// Base URL of the remote dataset host, if any
    pub remote_base_url: Option<String>,
    /// Active content dataset version
    pub dataset_version: String,
}

/// Update structure for Config with all fields optional
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigUpdate {
    /// Optional update for database URL
    #[serde(default)]
    pub database_url: Option<String>,
    /// Optional update for the bundled data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Optional update for the remote base URL
    #[serde(default)]
    pub remote_base_url: Option<String>,
    /// Optional update for the dataset version
    #[serde(default)]
    pub dataset_version: Option<String>,
}

/// Command line arguments for the application
#[derive(Parser, Debug)]
#[clap(name = "quizbank", about = "Offline question-bank data layer")]
pub struct CliArgs {
    /// Database URL
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Bundled data directory
    #[clap(long, env = "QUIZBANK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Remote dataset base URL
    #[clap(long, env = "QUIZBANK_REMOTE_URL")]
    pub remote_base_url: Option<String>,

    /// Dataset version
    #[clap(long, env = "QUIZBANK_DATASET_VERSION")]
    pub dataset_version: Option<String>,
}

impl Config {
    /// Applies a config update to the current configuration
    pub fn apply_update(self, update: ConfigUpdate) -> Self {
        Self {
            database_url: update.database_url.unwrap_or(self.database_url),
            data_dir: update.data_dir.or(self.data_dir),
            remote_base_url: update.remote_base_url.or(self.remote_base_url),
            dataset_version: update.dataset_version.unwrap_or(self.dataset_version),
        }
    }
}

/// Returns the XDG config directory for quizbank, if resolvable
pub fn get_config_dir_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "quizbank", "quizbank")
        .map(|proj_dirs| PathBuf::from(proj_dirs.config_dir()))
}

/// Returns the base (default) configuration
pub fn base_config(config_path: Option<PathBuf>) -> Config {
    let database_url = config_path.map_or("quizbank.db".to_string(), |path| {
        path.join("quizbank.db").to_string_lossy().to_string()
    });

    Config {
        database_url,
        data_dir: None,
        remote_base_url: None,
        dataset_version: "v1".to_string(),
    }
}

/// Loads configuration from a TOML file
pub fn config_from_file(config_path: Option<PathBuf>) -> Result<ConfigUpdate, String> {
    let Some(config_path) = config_path else {
        return Ok(ConfigUpdate::default());
    };

    if !config_path.exists() {
        info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(ConfigUpdate::default());
    }

    match fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<ConfigUpdate>(&content) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to parse config file: {}", e);
                Err(format!("Failed to parse config file: {}", e))
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            Err(format!("Failed to read config file: {}", e))
        }
    }
}

/// Loads configuration from command line arguments
pub fn config_from_args(args: CliArgs) -> ConfigUpdate {
    ConfigUpdate {
        database_url: args.database_url,
        data_dir: args.data_dir,
        remote_base_url: args.remote_base_url,
        dataset_version: args.dataset_version,
    }
}

/// Gets the complete configuration by combining defaults with values
/// from config file, environment variables, and command line arguments
/// in order of increasing precedence
pub fn get_config(args: CliArgs) -> Config {
    let config_dir = get_config_dir_path().or_else(|| {
        warn!("Could not determine XDG config directory, skipping config file");
        None
    });

    let config_dir = config_dir.filter(|path| {
        if path.exists() {
            true
        } else {
            info!("Config path not found at {:?}, using defaults", path);
            false
        }
    });

    let base = base_config(config_dir.clone());
    let file_update = config_from_file(config_dir.map(|dir| dir.join("config.toml")));

    let config = base
        .apply_update(file_update.unwrap_or_default())
        .apply_update(config_from_args(args));

    info!(
        "Final configuration: database_url={}, dataset_version={}, data_dir={:?}",
        config.database_url, config.dataset_version, config.data_dir
    );

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::{TempDir, tempdir};

    /// Helper function to create a test configuration file
    fn create_test_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let config_path = dir.path().join("config.toml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        config_path
    }

    #[test]
    fn test_apply_update_with_all_values() {
        let config = base_config(None);

        let update = ConfigUpdate {
            database_url: Some("updated.db".to_string()),
            data_dir: Some(PathBuf::from("/data")),
            remote_base_url: Some("https://bank.example.com".to_string()),
            dataset_version: Some("v7".to_string()),
        };

        let updated = config.apply_update(update);

        assert_eq!(updated.database_url, "updated.db");
        assert_eq!(updated.data_dir, Some(PathBuf::from("/data")));
        assert_eq!(updated.remote_base_url.as_deref(), Some("https://bank.example.com"));
        assert_eq!(updated.dataset_version, "v7");
    }

    #[test]
    fn test_apply_update_with_partial_values() {
        let config = base_config(None);

        let update = ConfigUpdate {
            database_url: Some("updated.db".to_string()),
            ..Default::default()
        };

        let updated = config.apply_update(update);

        assert_eq!(updated.database_url, "updated.db");
        assert_eq!(updated.data_dir, None); // Unchanged
        assert_eq!(updated.dataset_version, "v1"); // Unchanged
    }

    #[test]
    fn test_base_config_defaults() {
        let config = base_config(None);

        assert_eq!(config.database_url, "quizbank.db");
        assert_eq!(config.data_dir, None);
        assert_eq!(config.remote_base_url, None);
        assert_eq!(config.dataset_version, "v1");
    }

    #[test]
    fn test_base_config_with_path() {
        let temp_dir = tempdir().unwrap();
        let config = base_config(Some(temp_dir.path().to_path_buf()));

        let expected_db_path = temp_dir.path().join("quizbank.db").to_string_lossy().to_string();
        assert_eq!(config.database_url, expected_db_path);
    }

    #[test]
    fn test_config_from_file_with_valid_toml() {
        let temp_dir = tempdir().unwrap();
        let config_content = r#"
            database_url = "file.db"
            dataset_version = "v3"
        "#;

        let config_path = create_test_config_file(&temp_dir, config_content);

        let result = config_from_file(Some(config_path));

        assert!(result.is_ok(), "Failed to parse config file: {}", result.err().unwrap());
        let update = result.unwrap();
        assert_eq!(update.database_url, Some("file.db".to_string()));
        assert_eq!(update.dataset_version, Some("v3".to_string()));
        assert_eq!(update.data_dir, None);
    }

    #[test]
    fn test_config_from_file_with_invalid_toml() {
        let temp_dir = tempdir().unwrap();
        let config_content = r#"
            database_url = "file.db"
            dataset_version = 3 # Type error
        "#;

        let config_path = create_test_config_file(&temp_dir, config_content);

        let result = config_from_file(Some(config_path));

        assert!(result.is_err());
    }

    #[test]
    fn test_config_from_file_with_nonexistent_file() {
        let temp_dir = tempdir().unwrap();
        let nonexistent_path = temp_dir.path().join("nonexistent_config.toml");

        let result = config_from_file(Some(nonexistent_path));

        assert!(result.is_ok());
        let update = result.unwrap();
        assert_eq!(update.database_url, None);
    }

    #[test]
    fn test_precedence_args_over_file_over_base() {
        let args = CliArgs {
            database_url: Some("args.db".to_string()),
            data_dir: None,
            remote_base_url: None,
            dataset_version: None,
        };

        let file_update = ConfigUpdate {
            database_url: Some("file.db".to_string()),
            dataset_version: Some("v5".to_string()),
            ..Default::default()
        };

        let config = base_config(None)
            .apply_update(file_update)
            .apply_update(config_from_args(args));

        assert_eq!(config.database_url, "args.db"); // From args
        assert_eq!(config.dataset_version, "v5"); // From file
        assert_eq!(config.remote_base_url, None); // From base
    }
}
