// src/pools.rs

use crate::error::{Result, TvlError};
use crate::settings::{PoolConfig, TokenConfig};
use crate::types::conversions::parse_address;
use ethers::types::Address;

/// One constituent token of a stable-swap pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    /// External price-lookup identifier. Tokens without one never get a direct price.
    pub coingecko_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpToken {
    pub address: Address,
    pub decimals: u8,
}

/// Static descriptor of a two-token stable-swap pool.
///
/// Built once at start-up from the configured pool list and never mutated. The position
/// of a pool in that list is its identity: registry entries and batch results are
/// matched to it by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub name: String,
    pub address: Address,
    pub lp_token: LpToken,
    pub tokens: [Token; 2],
}

impl TryFrom<&TokenConfig> for Token {
    type Error = TvlError;

    fn try_from(cfg: &TokenConfig) -> Result<Self> {
        Ok(Token {
            symbol: cfg.symbol.clone(),
            address: parse_address(&cfg.address)?,
            decimals: cfg.decimals,
            coingecko_id: cfg
                .coingecko_id
                .as_ref()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        })
    }
}

impl TryFrom<&PoolConfig> for Pool {
    type Error = TvlError;

    fn try_from(cfg: &PoolConfig) -> Result<Self> {
        let tokens = cfg
            .tokens
            .iter()
            .map(Token::try_from)
            .collect::<Result<Vec<_>>>()?;

        let tokens: [Token; 2] = tokens.try_into().map_err(|v: Vec<Token>| {
            TvlError::Config(config::ConfigError::Message(format!(
                "pool `{}` must declare exactly 2 tokens, found {}",
                cfg.name,
                v.len()
            )))
        })?;

        Ok(Pool {
            name: cfg.name.clone(),
            address: parse_address(&cfg.address)?,
            lp_token: LpToken {
                address: parse_address(&cfg.lp_token.address)?,
                decimals: cfg.lp_token.decimals,
            },
            tokens,
        })
    }
}

impl Pool {
    /// Price-lookup identifiers of both tokens, skipping tokens without one.
    pub fn price_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens
            .iter()
            .filter_map(|t| t.coingecko_id.as_deref())
    }
}

/// Validates every address in the configured pool list. Fails before any network call.
pub fn load_pools(configs: &[PoolConfig]) -> Result<Vec<Pool>> {
    configs.iter().map(Pool::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LpTokenConfig;

    fn token_cfg(symbol: &str, address: &str, id: Option<&str>) -> TokenConfig {
        TokenConfig {
            symbol: symbol.to_string(),
            address: address.to_string(),
            decimals: 18,
            coingecko_id: id.map(str::to_string),
        }
    }

    fn pool_cfg(address: &str, tokens: Vec<TokenConfig>) -> PoolConfig {
        PoolConfig {
            name: "test".to_string(),
            address: address.to_string(),
            lp_token: LpTokenConfig {
                address: "0x0000000000000000000000000000000000000003".to_string(),
                decimals: 18,
            },
            tokens,
        }
    }

    #[test]
    fn test_load_valid_pool() {
        let cfg = pool_cfg(
            "0x0000000000000000000000000000000000000001",
            vec![
                token_cfg("A", "0x0000000000000000000000000000000000000010", Some("celo-dollar")),
                token_cfg("B", "0x0000000000000000000000000000000000000011", Some("  ")),
            ],
        );
        let pools = load_pools(&[cfg]).unwrap();
        assert_eq!(pools.len(), 1);
        // Blank ids are treated as absent
        assert_eq!(pools[0].price_ids().collect::<Vec<_>>(), vec!["celo-dollar"]);
    }

    #[test]
    fn test_invalid_address_fails_load() {
        let cfg = pool_cfg(
            "0x00000000000000000000000000000000000001",
            vec![
                token_cfg("A", "0x0000000000000000000000000000000000000010", None),
                token_cfg("B", "0x0000000000000000000000000000000000000011", None),
            ],
        );
        assert!(matches!(load_pools(&[cfg]), Err(TvlError::InvalidAddress(_))));
    }

    #[test]
    fn test_wrong_token_count_fails_load() {
        let cfg = pool_cfg(
            "0x0000000000000000000000000000000000000001",
            vec![token_cfg("A", "0x0000000000000000000000000000000000000010", None)],
        );
        assert!(matches!(load_pools(&[cfg]), Err(TvlError::Config(_))));
    }
}
