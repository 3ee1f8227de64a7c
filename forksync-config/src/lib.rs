//! Layered configuration for the reconciler: built-in defaults, an optional
//! TOML file, then `FORKSYNC_*` environment variables.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use forksync_chain::{PrivateKeySigner, ReceiptPolicy};
use forksync_core::{Address, BaseUnits, ConfigurationError, DisplayAmount, PoolIdentity};
use serde::{Deserialize, Serialize};

pub type ConfigResult<T> = Result<T, ConfigurationError>;

pub const DEFAULT_CONFIG_FILE: &str = "forksync.toml";
pub const ENV_PREFIX: &str = "FORKSYNC";

/// Native currency uses 18 decimals on every EVM chain we target.
const NATIVE_DECIMALS: u8 = 18;

/// Configuration as read from disk and environment, before validation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub reference_rpc: Option<String>,
    pub sandbox_rpc: Option<String>,
    pub pool: PoolSection,
    pub operator: OperatorSection,
    pub bootstrap: BootstrapSection,
    pub rpc: RpcSection,
    pub logging: LoggingSection,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    pub address: Option<String>,
    pub asset0: Option<String>,
    pub asset1: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorSection {
    pub address: Option<String>,
    pub private_key: Option<SecretString>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSection {
    pub enabled: bool,
    /// Decimal amount of native currency, in whole units.
    pub native_amount: String,
}

impl Default for BootstrapSection {
    fn default() -> Self {
        Self {
            enabled: true,
            native_amount: "1000000".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    pub requests_per_second: Option<u32>,
    pub receipt_poll_interval_ms: u64,
    pub receipt_max_polls: u32,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            requests_per_second: None,
            receipt_poll_interval_ms: 500,
            receipt_max_polls: 120,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

/// String that never shows up in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

/// Builds a [`RawConfig`] from the configured sources.
#[derive(Clone, Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer a TOML file under the environment. A missing file is ignored.
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Read variables from `vars` instead of the process environment.
    #[must_use]
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn load(&self) -> ConfigResult<RawConfig> {
        let mut builder = Config::builder();
        if let Some(path) = &self.file {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(self.env.clone());
        builder
            .add_source(environment)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|err| ConfigurationError::Load(err.to_string()))
    }
}

/// Validated settings consumed by the reconciler.
#[derive(Clone, Debug)]
pub struct ReconcilerSettings {
    pub reference_rpc: String,
    pub sandbox_rpc: String,
    pub pool: PoolIdentity,
    pub operator: Address,
    pub signer: Option<PrivateKeySigner>,
    pub bootstrap: BootstrapSettings,
    pub rpc: RpcSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootstrapSettings {
    pub enabled: bool,
    pub native_amount: BaseUnits,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcSettings {
    pub requests_per_second: Option<NonZeroU32>,
    pub receipts: ReceiptPolicy,
}

impl RawConfig {
    /// Parse and check every field. The pool address is checked first so a
    /// run without one fails before anything else is inspected.
    pub fn validate(&self) -> ConfigResult<ReconcilerSettings> {
        let pool = parse_address("pool.address", self.pool.address.as_deref())?;
        let reference_rpc = required("reference_rpc", self.reference_rpc.as_deref())?;
        let sandbox_rpc = required("sandbox_rpc", self.sandbox_rpc.as_deref())?;
        let asset0 = parse_address("pool.asset0", self.pool.asset0.as_deref())?;
        let asset1 = parse_address("pool.asset1", self.pool.asset1.as_deref())?;
        if asset0 == asset1 {
            return Err(ConfigurationError::Invalid {
                key: "pool.asset1",
                message: format!("must differ from pool.asset0 ({asset0})"),
            });
        }
        let operator = parse_address("operator.address", self.operator.address.as_deref())?;
        let signer = self
            .operator
            .private_key
            .as_ref()
            .filter(|key| !key.expose().trim().is_empty())
            .map(|key| parse_signer(key, operator))
            .transpose()?;
        let native_amount = DisplayAmount::from_str(self.bootstrap.native_amount.trim())
            .and_then(|amount| amount.to_base_units(NATIVE_DECIMALS))
            .map_err(|err| ConfigurationError::Invalid {
                key: "bootstrap.native_amount",
                message: err.to_string(),
            })?;
        if self.rpc.receipt_max_polls == 0 {
            return Err(ConfigurationError::Invalid {
                key: "rpc.receipt_max_polls",
                message: "must be at least 1".into(),
            });
        }
        let requests_per_second = match self.rpc.requests_per_second {
            Some(value) => Some(NonZeroU32::new(value).ok_or(ConfigurationError::Invalid {
                key: "rpc.requests_per_second",
                message: "must be greater than zero".into(),
            })?),
            None => None,
        };
        Ok(ReconcilerSettings {
            reference_rpc,
            sandbox_rpc,
            pool: PoolIdentity::new(pool, asset0, asset1),
            operator,
            signer,
            bootstrap: BootstrapSettings {
                enabled: self.bootstrap.enabled,
                native_amount,
            },
            rpc: RpcSettings {
                requests_per_second,
                receipts: ReceiptPolicy {
                    poll_interval: Duration::from_millis(self.rpc.receipt_poll_interval_ms),
                    max_polls: self.rpc.receipt_max_polls,
                },
            },
        })
    }
}

fn required(key: &'static str, value: Option<&str>) -> ConfigResult<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ConfigurationError::Missing(key)),
    }
}

fn parse_address(key: &'static str, value: Option<&str>) -> ConfigResult<Address> {
    let raw = required(key, value)?;
    Address::from_str(&raw).map_err(|err| ConfigurationError::Invalid {
        key,
        message: format!("{raw} is not an address: {err}"),
    })
}

fn parse_signer(key: &SecretString, operator: Address) -> ConfigResult<PrivateKeySigner> {
    let signer = PrivateKeySigner::from_str(key.expose().trim()).map_err(|_| {
        ConfigurationError::Invalid {
            key: "operator.private_key",
            message: "not a valid secp256k1 private key".into(),
        }
    })?;
    if signer.address() != operator {
        return Err(ConfigurationError::Invalid {
            key: "operator.private_key",
            message: format!(
                "derives {} but operator.address is {operator}",
                signer.address()
            ),
        });
    }
    Ok(signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const POOL: &str = "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc";
    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
    // Well-known development key #0.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn complete() -> RawConfig {
        RawConfig {
            reference_rpc: Some("https://mainnet.example".into()),
            sandbox_rpc: Some("https://sandbox.example".into()),
            pool: PoolSection {
                address: Some(POOL.into()),
                asset0: Some(USDC.into()),
                asset1: Some(WETH.into()),
            },
            operator: OperatorSection {
                address: Some(DEV_ADDRESS.into()),
                private_key: Some(SecretString::new(DEV_KEY)),
            },
            ..RawConfig::default()
        }
    }

    #[test]
    fn complete_config_validates() {
        let settings = complete().validate().unwrap();
        assert_eq!(settings.pool.pool(), Address::from_str(POOL).unwrap());
        assert!(settings.signer.is_some());
        assert!(settings.bootstrap.enabled);
        assert_eq!(
            settings.bootstrap.native_amount.to_string(),
            "1000000000000000000000000"
        );
        assert_eq!(settings.rpc.receipts, ReceiptPolicy::default());
    }

    #[test]
    fn missing_pool_address_is_reported_first() {
        let raw = RawConfig::default();
        assert_eq!(
            raw.validate().unwrap_err(),
            ConfigurationError::Missing("pool.address")
        );
    }

    #[test]
    fn identical_assets_are_rejected() {
        let mut raw = complete();
        raw.pool.asset1 = Some(USDC.into());
        let err = raw.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { key: "pool.asset1", .. }));
    }

    #[test]
    fn signer_must_match_operator() {
        let mut raw = complete();
        raw.operator.address = Some(POOL.into());
        let err = raw.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::Invalid {
                key: "operator.private_key",
                ..
            }
        ));
    }

    #[test]
    fn private_key_is_optional() {
        let mut raw = complete();
        raw.operator.private_key = None;
        assert!(raw.validate().unwrap().signer.is_none());
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let rendered = format!("{:?}", complete());
        assert!(!rendered.contains("ac0974bec"));
        assert!(rendered.contains("<REDACTED>"));
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let toml = toml::to_string(&complete()).unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let env = HashMap::from([
            ("FORKSYNC_SANDBOX_RPC".to_string(), "http://127.0.0.1:8545".to_string()),
            ("FORKSYNC_RPC__RECEIPT_MAX_POLLS".to_string(), "7".to_string()),
        ]);
        let raw = ConfigLoader::new()
            .with_file(file.path())
            .with_env(env)
            .load()
            .unwrap();
        let settings = raw.validate().unwrap();
        assert_eq!(settings.sandbox_rpc, "http://127.0.0.1:8545");
        assert_eq!(settings.reference_rpc, "https://mainnet.example");
        assert_eq!(settings.rpc.receipts.max_polls, 7);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let raw = ConfigLoader::new()
            .with_file(dir.path().join("absent.toml"))
            .with_env(HashMap::new())
            .load()
            .unwrap();
        assert!(raw.pool.address.is_none());
        assert_eq!(raw.logging.level, "info");
        assert_eq!(raw.rpc.receipt_poll_interval_ms, 500);
    }
}
