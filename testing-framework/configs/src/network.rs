use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};
use testing_framework_env as tf_env;
use thiserror::Error;
use tracing::debug;

use crate::constants::{
    DEFAULT_CHAIN_ID, DEFAULT_CONFIG_PATH, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_FAUCET_TOKENS,
    DEFAULT_POLL_INTERVAL, DEFAULT_SDK_BINARY, DEFAULT_SDK_COMMAND_TIMEOUT, DEFAULT_TEST_TIMEOUT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Signature scheme the wallets of the target network use.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    #[default]
    Ed25519,
    Bls0chain,
}

/// S3 gateway endpoint and credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Zs3Config {
    pub server_url: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Storage CLI used for file operations.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default = "default_sdk_binary")]
    pub binary: PathBuf,
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_sdk_command_timeout")]
    pub command_timeout: Duration,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            binary: default_sdk_binary(),
            config_dir: None,
            command_timeout: DEFAULT_SDK_COMMAND_TIMEOUT,
        }
    }
}

/// Endpoints and knobs of the deployed network under test.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Discovery endpoint; miners and sharders are fetched from it when the
    /// explicit lists are empty.
    #[serde(default)]
    pub block_worker: Option<String>,
    #[serde(default)]
    pub miners: Vec<String>,
    #[serde(default)]
    pub sharders: Vec<String>,
    #[serde(default)]
    pub zs3: Option<Zs3Config>,
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    #[serde(default)]
    pub signature_scheme: SignatureScheme,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_test_timeout")]
    pub default_test_timeout: Duration,
    #[serde(default = "default_faucet_amount")]
    pub faucet_amount: f64,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout: Duration,
    #[serde(default)]
    pub sdk: SdkConfig,
    #[serde(default)]
    pub wallet_pool: Option<PathBuf>,
}

impl NetworkConfig {
    /// Config for explicit node lists with every other value at its default.
    #[must_use]
    pub fn with_nodes(miners: Vec<String>, sharders: Vec<String>) -> Self {
        Self {
            block_worker: None,
            miners,
            sharders,
            zs3: None,
            chain_id: default_chain_id(),
            signature_scheme: SignatureScheme::default(),
            default_test_timeout: DEFAULT_TEST_TIMEOUT,
            faucet_amount: DEFAULT_FAUCET_TOKENS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            sdk: SdkConfig::default(),
            wallet_pool: None,
        }
    }

    /// Read, parse and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading network config");
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `SYSTEM_TEST_CONFIG` (or the default path) and apply the
    /// environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = tf_env::system_test_config().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::load(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(secs) = tf_env::system_test_default_timeout_secs() {
            self.default_test_timeout = Duration::from_secs(secs);
        }
        if let Some(binary) = tf_env::system_test_sdk_bin() {
            self.sdk.binary = binary;
        }
        if let Some(pool) = tf_env::system_test_wallet_pool() {
            self.wallet_pool = Some(pool);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_nodes = !self.miners.is_empty() && !self.sharders.is_empty();
        if !has_nodes && self.block_worker.is_none() {
            return Err(ConfigError::Invalid {
                field: "miners/sharders",
                reason: "set both node lists or a block_worker to discover them".to_owned(),
            });
        }

        if self.default_test_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "default_test_timeout",
                reason: "must be non-zero".to_owned(),
            });
        }

        if self.signature_scheme != SignatureScheme::Ed25519 {
            return Err(ConfigError::Invalid {
                field: "signature_scheme",
                reason: format!("{:?} wallets are not supported", self.signature_scheme),
            });
        }

        if !(self.faucet_amount.is_finite() && self.faucet_amount > 0.0) {
            return Err(ConfigError::Invalid {
                field: "faucet_amount",
                reason: format!("must be a positive token amount, got {}", self.faucet_amount),
            });
        }

        Ok(())
    }
}

fn default_chain_id() -> String {
    DEFAULT_CHAIN_ID.to_owned()
}

fn default_sdk_binary() -> PathBuf {
    PathBuf::from(DEFAULT_SDK_BINARY)
}

const fn default_sdk_command_timeout() -> Duration {
    DEFAULT_SDK_COMMAND_TIMEOUT
}

const fn default_test_timeout() -> Duration {
    DEFAULT_TEST_TIMEOUT
}

const fn default_faucet_amount() -> f64 {
    DEFAULT_FAUCET_TOKENS
}

const fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

const fn default_confirmation_timeout() -> Duration {
    DEFAULT_CONFIRMATION_TIMEOUT
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const MINIMAL: &str = "
miners: [\"http://127.0.0.1:7071\"]
sharders: [\"http://127.0.0.1:7171\"]
";

    #[test]
    fn minimal_config_fills_defaults() {
        let config: NetworkConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(config.default_test_timeout, DEFAULT_TEST_TIMEOUT);
        assert_eq!(config.signature_scheme, SignatureScheme::Ed25519);
        assert_eq!(config.sdk.binary, PathBuf::from(DEFAULT_SDK_BINARY));
        assert!(config.zs3.is_none());
    }

    #[test]
    fn durations_are_read_as_seconds() {
        let raw = format!("{MINIMAL}default_test_timeout: 42\npoll_interval: 3\n");
        let config: NetworkConfig = serde_yaml::from_str(&raw).unwrap();

        assert_eq!(config.default_test_timeout, Duration::from_secs(42));
        assert_eq!(config.poll_interval, Duration::from_secs(3));
    }

    #[test]
    fn explicit_nodes_match_yaml_defaults() {
        let from_yaml: NetworkConfig = serde_yaml::from_str(MINIMAL).unwrap();
        let built = NetworkConfig::with_nodes(
            vec!["http://127.0.0.1:7071".to_owned()],
            vec!["http://127.0.0.1:7171".to_owned()],
        );
        built.validate().unwrap();

        assert_eq!(built.miners, from_yaml.miners);
        assert_eq!(built.confirmation_timeout, from_yaml.confirmation_timeout);
        assert_eq!(built.sdk.command_timeout, from_yaml.sdk.command_timeout);
    }

    #[test]
    fn block_worker_alone_is_enough() {
        let config: NetworkConfig =
            serde_yaml::from_str("block_worker: https://dev.example.invalid/dns\n").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn rejects_missing_nodes() {
        let config: NetworkConfig = serde_yaml::from_str("miners: [\"http://m\"]\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "miners/sharders",
                ..
            }
        ));
    }

    #[test]
    fn rejects_bls_wallets() {
        let raw = format!("{MINIMAL}signature_scheme: bls0chain\n");
        let config: NetworkConfig = serde_yaml::from_str(&raw).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "signature_scheme",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_positive_faucet_amount() {
        let raw = format!("{MINIMAL}faucet_amount: 0\n");
        let config: NetworkConfig = serde_yaml::from_str(&raw).unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid {
                field: "faucet_amount",
                ..
            }
        ));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "miners: [unterminated").unwrap();

        let err = NetworkConfig::load(file.path()).unwrap_err();
        let message = err.to_string();
        assert!(
            message.starts_with(&format!(
                "failed to parse config file {}:",
                file.path().display()
            )),
            "{message}"
        );
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_reads_zs3_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{MINIMAL}zs3:\n  server_url: http://127.0.0.1:9004\n  access_key: rootroot\n  secret_key: rootroot\n"
        )
        .unwrap();

        let config = NetworkConfig::load(file.path()).unwrap();
        let zs3 = config.zs3.unwrap();
        assert_eq!(zs3.server_url, "http://127.0.0.1:9004");
        assert_eq!(zs3.access_key, "rootroot");
    }

    #[test]
    fn bundled_sample_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/system_test.yaml");

        let config = NetworkConfig::load(&path).unwrap();
        assert!(config.block_worker.is_some());
        assert!(config.zs3.is_some());
        assert_eq!(config.sdk.command_timeout, DEFAULT_SDK_COMMAND_TIMEOUT);
    }
}
