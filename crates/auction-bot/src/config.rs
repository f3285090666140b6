//! Application configuration.

use crate::error::{AppError, AppResult};
use alloy::primitives::Address;
use auction_decoder::DEFAULT_DEBT_GROWTH_FACTOR;
use auction_signer::KeySource;
use auction_strategy::StrategyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable holding the private key by default.
pub const DEFAULT_KEY_ENV_VAR: &str = "AUCTION_BIDDER_PRIVATE_KEY";

/// Deployment the bot runs against.
///
/// Fills in the contract address, chain id and exchange URL when the config
/// does not set them explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Ropsten,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Mainnet => 1,
            Self::Ropsten => 3,
        }
    }

    pub fn contract_address(&self) -> &'static str {
        match self {
            Self::Mainnet => "0x241e82C79452F51fbfc89Fac6d912e021dB1a3B7",
            Self::Ropsten => "0x06898143DF04616a8A8F9614deb3B99Ba12b3096",
        }
    }

    pub fn exchange_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.ddex.io/v4",
            Self::Ropsten => "https://bfd-ropsten-59c1702d-api.intra.ddex.io/v4/",
        }
    }
}

/// Chain access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of an Ethereum node.
    pub rpc_url: String,
    /// Overrides the network's auction contract.
    #[serde(default)]
    pub contract_address: Option<String>,
    /// Overrides the network's chain id.
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Block height poll interval (ms). Default: 3,000.
    #[serde(default = "default_block_poll_interval_ms")]
    pub block_poll_interval_ms: u64,
    /// Receipt poll interval (ms). Default: 1,000.
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

fn default_block_poll_interval_ms() -> u64 {
    3_000
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

/// Exchange access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Overrides the network's exchange REST root.
    #[serde(default)]
    pub url: Option<String>,
}

/// Gas pricing for the fill transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas station endpoint reporting prices in tenths of a gwei.
    #[serde(default = "default_gas_station_url")]
    pub station_url: String,
    /// Added to the station's price. Default: 5 gwei.
    #[serde(default = "default_tip_gwei")]
    pub tip_gwei: Decimal,
    /// Used when the station is unreachable. Default: 30 gwei.
    #[serde(default = "default_fallback_gwei")]
    pub fallback_gwei: Decimal,
    /// Upper bound on the station's price. Default: 300 gwei.
    #[serde(default = "default_cap_gwei")]
    pub cap_gwei: Decimal,
    /// Gas limit of the fill call. Default: 500,000.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

fn default_gas_station_url() -> String {
    "https://ethgasstation.info/json/ethgasAPI.json".to_string()
}

fn default_tip_gwei() -> Decimal {
    Decimal::from(5)
}

fn default_fallback_gwei() -> Decimal {
    Decimal::from(30)
}

fn default_cap_gwei() -> Decimal {
    Decimal::from(300)
}

fn default_gas_limit() -> u64 {
    auction_executor::DEFAULT_GAS_LIMIT
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            station_url: default_gas_station_url(),
            tip_gwei: default_tip_gwei(),
            fallback_gwei: default_fallback_gwei(),
            cap_gwei: default_cap_gwei(),
            gas_limit: default_gas_limit(),
        }
    }
}

/// Hedge retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeSettings {
    /// Delay between failed hedge attempts (ms). Default: 1,000.
    #[serde(default = "default_hedge_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

fn default_hedge_retry_interval_ms() -> u64 {
    1_000
}

impl Default for HedgeSettings {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_hedge_retry_interval_ms(),
        }
    }
}

/// Where the private key comes from. The key itself never lives in this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Environment variable holding the hex key.
    #[serde(default = "default_key_env_var")]
    pub env_var: String,
    /// Key file; takes precedence over `env_var` when set.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// If set, the loaded key must derive this address.
    #[serde(default)]
    pub expected_address: Option<String>,
}

fn default_key_env_var() -> String {
    DEFAULT_KEY_ENV_VAR.to_string()
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            env_var: default_key_env_var(),
            key_file: None,
            expected_address: None,
        }
    }
}

/// Settlement ledger location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub data_dir: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data/settlements".to_string(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus textfile written after every scan.
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: Network,
    pub chain: ChainConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub hedge: HedgeSettings,
    #[serde(default)]
    pub key: KeyConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Multiplier applied to the raw auction debt for interest accrued since
    /// the read. Default: 1.00001.
    #[serde(default = "default_debt_growth_factor")]
    pub debt_growth_factor: Decimal,
}

fn default_debt_growth_factor() -> Decimal {
    DEFAULT_DEBT_GROWTH_FACTOR
}

impl AppConfig {
    /// Load and validate configuration from file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        if self.chain.rpc_url.trim().is_empty() {
            return Err(AppError::Config("chain.rpc_url must be set".to_string()));
        }
        self.strategy.validate().map_err(AppError::Config)?;
        self.contract_address()?;
        self.expected_address()?;

        if self.gas.tip_gwei.is_sign_negative() {
            return Err(AppError::Config(format!(
                "gas.tip_gwei ({}) must be non-negative",
                self.gas.tip_gwei
            )));
        }
        if self.gas.fallback_gwei <= Decimal::ZERO || self.gas.cap_gwei < self.gas.fallback_gwei {
            return Err(AppError::Config(format!(
                "gas.fallback_gwei ({}) must be positive and not above gas.cap_gwei ({})",
                self.gas.fallback_gwei, self.gas.cap_gwei
            )));
        }
        if self.gas.gas_limit == 0 {
            return Err(AppError::Config("gas.gas_limit must be positive".to_string()));
        }
        if self.debt_growth_factor < Decimal::ONE {
            return Err(AppError::Config(format!(
                "debt_growth_factor ({}) must be at least 1",
                self.debt_growth_factor
            )));
        }
        if self.chain.block_poll_interval_ms == 0
            || self.chain.receipt_poll_interval_ms == 0
            || self.hedge.retry_interval_ms == 0
        {
            return Err(AppError::Config("poll and retry intervals must be positive".to_string()));
        }
        Ok(())
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id.unwrap_or_else(|| self.network.chain_id())
    }

    pub fn contract_address(&self) -> AppResult<Address> {
        let raw = self
            .chain
            .contract_address
            .as_deref()
            .unwrap_or_else(|| self.network.contract_address());
        parse_address(raw, "chain.contract_address")
    }

    pub fn exchange_url(&self) -> &str {
        self.exchange
            .url
            .as_deref()
            .unwrap_or_else(|| self.network.exchange_url())
    }

    pub fn key_source(&self) -> KeySource {
        match &self.key.key_file {
            Some(path) => KeySource::File { path: path.clone() },
            None => KeySource::EnvVar {
                var_name: self.key.env_var.clone(),
            },
        }
    }

    pub fn expected_address(&self) -> AppResult<Option<Address>> {
        self.key
            .expected_address
            .as_deref()
            .map(|raw| parse_address(raw, "key.expected_address"))
            .transpose()
    }

    pub fn block_poll_interval(&self) -> Duration {
        Duration::from_millis(self.chain.block_poll_interval_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.chain.receipt_poll_interval_ms)
    }

    pub fn hedge_retry_interval(&self) -> Duration {
        Duration::from_millis(self.hedge.retry_interval_ms)
    }
}

/// Parse a hex address without enforcing EIP-55 checksum casing.
fn parse_address(raw: &str, field: &str) -> AppResult<Address> {
    Address::from_str(&raw.trim().to_ascii_lowercase())
        .map_err(|e| AppError::Config(format!("{field} ({raw}) is not an address: {e}")))
}
