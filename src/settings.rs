use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    /// Single fixed network endpoint used for every read.
    pub url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    42220 // Celo mainnet
}

#[derive(Debug, Deserialize, Clone)]
pub struct MulticallSettings {
    /// Multicall2 deployment on the configured network.
    pub address: String,
    /// Calls per aggregated read. Bounded by the aggregator's gas/size limits.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrySettings {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_registry_url() -> String {
    "https://raw.githubusercontent.com/mobiusAMM/mobius-pool-registry/master/data/pools.json"
        .to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceSettings {
    #[serde(default = "default_price_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_price_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            base_url: default_price_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputSettings {
    #[serde(default = "default_output_path")]
    pub path: String,
}

fn default_output_path() -> String {
    "data/pools.json".to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
    /// External price-lookup identifier (CoinGecko id). Optional.
    #[serde(default)]
    pub coingecko_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LpTokenConfig {
    pub address: String,
    #[serde(default = "default_lp_decimals")]
    pub decimals: u8,
}

fn default_lp_decimals() -> u8 {
    18
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    pub name: String,
    pub address: String,
    pub lp_token: LpTokenConfig,
    pub tokens: Vec<TokenConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: Rpc,
    pub multicall: MulticallSettings,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub prices: PriceSettings,
    #[serde(default)]
    pub output: OutputSettings,
    /// Static pool list. Order must match the registry's entry order.
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("Config.toml")
    }

    /// Loads `path`, then `TVL__*` environment overrides (e.g. `TVL__RPC__URL`).
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("TVL").separator("__"))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?;

        let settings: Self = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        // Short forms commonly set in .env
        if let Ok(url) = env::var("TVL_RPC_URL") {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.rpc.url = trimmed.to_string();
            }
        }
        if let Ok(raw) = env::var("TVL_MULTICALL_CHUNK_SIZE") {
            match raw.trim().parse::<usize>() {
                Ok(n) => self.multicall.chunk_size = n,
                Err(e) => log::warn!("Ignoring TVL_MULTICALL_CHUNK_SIZE={}: {}", raw, e),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, raw) in [
            ("rpc.url", &self.rpc.url),
            ("registry.url", &self.registry.url),
            ("prices.base_url", &self.prices.base_url),
        ] {
            url::Url::parse(raw)
                .map_err(|e| ConfigError::Message(format!("{} is not a valid URL: {}", key, e)))?;
        }

        if self.multicall.chunk_size == 0 {
            return Err(ConfigError::Message(
                "multicall.chunk_size must be greater than zero".to_string(),
            ));
        }

        for pool in &self.pools {
            if pool.tokens.len() != 2 {
                return Err(ConfigError::Message(format!(
                    "pool `{}` must declare exactly 2 tokens, found {}",
                    pool.name,
                    pool.tokens.len()
                )));
            }
        }

        Ok(())
    }
}
