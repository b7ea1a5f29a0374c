use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Well-known location of the nftables configuration loaded at boot
pub const DEFAULT_CONF_PATH: &str = "/etc/nftables.conf";

/// Overrides `conf_path` for a single invocation
pub const CONF_PATH_ENV: &str = "NFTPROF_CONF_PATH";

/// Overrides `nft_command` for a single invocation (used by tests to point at a mock)
pub const NFT_COMMAND_ENV: &str = "NFTPROF_NFT_COMMAND";

/// Persistent application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// nftables configuration file managed by this tool
    #[serde(default = "default_conf_path")]
    pub conf_path: PathBuf,
    /// nft binary name or path
    #[serde(default = "default_nft_command")]
    pub nft_command: String,
    /// Run `nft --check` on the written file before loading it
    #[serde(default)]
    pub check_before_apply: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            conf_path: default_conf_path(),
            nft_command: default_nft_command(),
            check_before_apply: false,
        }
    }
}

fn default_conf_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONF_PATH)
}

fn default_nft_command() -> String {
    "nft".to_string()
}

impl AppConfig {
    /// Applies environment and command-line overrides on top of the stored config.
    ///
    /// Precedence: `cli_conf` > `NFTPROF_CONF_PATH` > stored value.
    /// `NFTPROF_NFT_COMMAND` replaces the stored nft command when set.
    pub fn with_overrides(mut self, cli_conf: Option<&Path>) -> Self {
        if let Some(path) = cli_conf {
            self.conf_path = path.to_path_buf();
        } else if let Some(path) = std::env::var_os(CONF_PATH_ENV).filter(|p| !p.is_empty()) {
            self.conf_path = PathBuf::from(path);
        }

        if let Ok(nft) = std::env::var(NFT_COMMAND_ENV)
            && !nft.is_empty()
        {
            self.nft_command = nft;
        }

        self
    }
}

fn config_file_path() -> Option<PathBuf> {
    get_data_dir().map(|mut path| {
        path.push("config.json");
        path
    })
}

/// Saves the app config to disk using an atomic write pattern.
/// 1. Writes to a temporary file.
/// 2. Sets restrictive permissions (0o600).
/// 3. Atomically renames to the target path.
pub async fn save_config(config: &AppConfig) -> std::io::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Data directory not available",
        ));
    };
    save_config_to(config, &path).await
}

pub(crate) async fn save_config_to(config: &AppConfig, path: &Path) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("json.tmp");

    #[cfg(unix)]
    {
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600) // Set permissions BEFORE any data is written
            .open(&temp_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    #[cfg(not(unix))]
    {
        tokio::fs::write(&temp_path, json).await?;
    }

    tokio::fs::rename(temp_path, path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save configuration. Free up space and try again.",
            )
        } else {
            e
        }
    })
}

/// Loads the app config from disk, or returns default if not found.
pub async fn load_config() -> AppConfig {
    match config_file_path() {
        Some(path) => load_config_from(&path).await,
        None => AppConfig::default(),
    }
}

pub(crate) async fn load_config_from(path: &Path) -> AppConfig {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::ENV_VAR_MUTEX;

    #[tokio::test]
    async fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).await;
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.conf_path, PathBuf::from("/etc/nftables.conf"));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            conf_path: PathBuf::from("/tmp/test.conf"),
            nft_command: "/usr/local/sbin/nft".into(),
            check_before_apply: true,
        };

        save_config_to(&config, &path).await.unwrap();

        assert_eq!(load_config_from(&path).await, config);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"check_before_apply": true}"#)
            .await
            .unwrap();

        let config = load_config_from(&path).await;
        assert!(config.check_before_apply);
        assert_eq!(config.nft_command, "nft");
    }

    #[tokio::test]
    async fn test_corrupt_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        assert_eq!(load_config_from(&path).await, AppConfig::default());
    }

    #[test]
    fn test_override_precedence() {
        let _guard = ENV_VAR_MUTEX.lock().unwrap();
        unsafe {
            std::env::set_var(CONF_PATH_ENV, "/from/env.conf");
        }

        let from_env = AppConfig::default().with_overrides(None);
        let from_cli = AppConfig::default().with_overrides(Some(Path::new("/from/cli.conf")));

        unsafe {
            std::env::remove_var(CONF_PATH_ENV);
        }

        assert_eq!(from_env.conf_path, PathBuf::from("/from/env.conf"));
        assert_eq!(from_cli.conf_path, PathBuf::from("/from/cli.conf"));
    }
}
