//! Process configuration, loaded from a JSON file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use quorumtoken_approval::{ConfigError, WalletConfig};
use quorumtoken_core::WalletId;
pub use quorumtoken_observability::LogFormat;

/// Names the JSON config file.
pub const CONFIG_ENV: &str = "QUORUMTOKEN_CONFIG";
/// Overrides `bind_addr`.
pub const BIND_ENV: &str = "QUORUMTOKEN_BIND";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid bind address {0:?}")]
    BindAddr(String),

    #[error("invalid wallet configuration: {0}")]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Event log file; absent means in-memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub wallet_id: WalletId,
    pub wallet: WalletConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl AppConfig {
    /// Parse and validate. Wallet construction arguments are checked here so
    /// a bad approver list fails at startup.
    pub fn from_json(json: &str) -> Result<Self, ConfigLoadError> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.wallet.approver_set(config.wallet_id)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load the file named by `QUORUMTOKEN_CONFIG`, then apply
    /// `QUORUMTOKEN_BIND` if set.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("quorumtoken.json"));
        let mut config = Self::from_file(&path)?;

        if let Ok(bind) = std::env::var(BIND_ENV) {
            config.bind_addr = bind
                .parse()
                .map_err(|_| ConfigLoadError::BindAddr(bind.clone()))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorumtoken_core::AccountId;

    fn json_with(approvers: &[AccountId], quorum: u32) -> String {
        let list = approvers
            .iter()
            .map(|a| format!("\"{a}\""))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            r#"{{
                "wallet_id": "{}",
                "wallet": {{ "approvers": [{list}], "quorum": {quorum}, "initial_supply": 1000 }}
            }}"#,
            WalletId::new()
        )
    }

    #[test]
    fn defaults_apply() {
        let approvers = [AccountId::new(), AccountId::new()];
        let config = AppConfig::from_json(&json_with(&approvers, 2)).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.store.path, None);
        assert_eq!(config.wallet.initial_supply, 1000);
        assert_eq!(config.wallet.token.symbol, "QRM");
    }

    #[test]
    fn invalid_wallet_is_rejected_at_load() {
        let err = AppConfig::from_json(&json_with(&[AccountId::new()], 2)).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigError::QuorumOutOfRange { quorum: 2, approvers: 1 })
        ));
    }

    #[test]
    fn treasury_approver_is_rejected_at_load() {
        let wallet_id = WalletId::new();
        let treasury = wallet_id.treasury();
        let json = format!(
            r#"{{
                "wallet_id": "{wallet_id}",
                "wallet": {{ "approvers": ["{treasury}", "{}"], "quorum": 2, "initial_supply": 1000 }}
            }}"#,
            AccountId::new()
        );

        let err = AppConfig::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigError::TreasuryApprover(account)) if account == treasury
        ));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, json_with(&[AccountId::new()], 1)).unwrap();

        assert!(AppConfig::from_file(&path).is_ok());
        assert!(matches!(
            AppConfig::from_file(dir.path().join("missing.json")),
            Err(ConfigLoadError::Io { .. })
        ));
    }
}
