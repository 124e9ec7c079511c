// src/pool_registry.rs

use crate::error::{Result, TvlError};
use crate::types::{fee_fraction, Fees};
use async_trait::async_trait;
use log::{info, warn};
use num_bigint::BigUint;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Wire format of one registry element. Numbers are decimal integer strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRegistryEntry {
    pub amp_factor: String,
    pub paused: bool,
    pub fees: RawFees,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFees {
    pub trade: String,
    pub admin: String,
    pub deposit: String,
    pub withdraw: String,
}

/// Per-pool metadata, index-aligned with the static pool list.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub amp_factor: BigUint,
    pub paused: bool,
    pub fees: Fees,
}

fn parse_integer(field: &str, raw: &str) -> Result<BigUint> {
    BigUint::from_str(raw.trim()).map_err(|e| {
        TvlError::RegistryUnavailable(format!("malformed `{}` value '{}': {}", field, raw, e))
    })
}

impl TryFrom<RawRegistryEntry> for RegistryEntry {
    type Error = TvlError;

    fn try_from(raw: RawRegistryEntry) -> Result<Self> {
        Ok(RegistryEntry {
            amp_factor: parse_integer("ampFactor", &raw.amp_factor)?,
            paused: raw.paused,
            fees: Fees {
                trade: fee_fraction(&parse_integer("fees.trade", &raw.fees.trade)?),
                admin: fee_fraction(&parse_integer("fees.admin", &raw.fees.admin)?),
                deposit: fee_fraction(&parse_integer("fees.deposit", &raw.fees.deposit)?),
                withdraw: fee_fraction(&parse_integer("fees.withdraw", &raw.fees.withdraw)?),
            },
        })
    }
}

/// Converts a raw registry body into typed entries.
pub fn parse_registry(raw: Vec<RawRegistryEntry>) -> Result<Vec<RegistryEntry>> {
    raw.into_iter().map(RegistryEntry::try_from).collect()
}

/// Rejects a registry whose length differs from the pool list instead of shifting indices.
pub fn align_registry(entries: Vec<RegistryEntry>, pool_count: usize) -> Result<Vec<RegistryEntry>> {
    if entries.len() != pool_count {
        return Err(TvlError::RegistryMisaligned {
            expected: pool_count,
            actual: entries.len(),
        });
    }

    for (i, entry) in entries.iter().enumerate() {
        if entry.paused {
            info!("Pool {} is paused in the registry; valuing it anyway", i);
        }
    }

    Ok(entries)
}

/// Source of pool registry metadata.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn fetch_registry(&self) -> Result<Vec<RegistryEntry>>;
}

/// Fetches the registry JSON array over HTTP.
pub struct HttpPoolRegistry {
    url: String,
    client: reqwest::Client,
}

impl HttpPoolRegistry {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TvlError::RegistryUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }
}

#[async_trait]
impl RegistrySource for HttpPoolRegistry {
    async fn fetch_registry(&self) -> Result<Vec<RegistryEntry>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TvlError::RegistryUnavailable(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            warn!("Registry {} answered {}", self.url, response.status());
            return Err(TvlError::RegistryUnavailable(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let raw: Vec<RawRegistryEntry> = response
            .json()
            .await
            .map_err(|e| TvlError::RegistryUnavailable(format!("JSON parse failed: {}", e)))?;

        let entries = parse_registry(raw)?;
        info!("Fetched {} pool registry entries", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port_url, serve_once};
    use num_bigint::BigInt;
    use num_rational::BigRational;

    const BODY: &str = r#"[
        {"ampFactor": "200", "paused": false,
         "fees": {"trade": "2000000", "admin": "5000000000", "deposit": "0", "withdraw": "0"}},
        {"ampFactor": "85", "paused": true,
         "fees": {"trade": "4000000", "admin": "5000000000", "deposit": "0", "withdraw": "10000000"}}
    ]"#;

    fn entries() -> Vec<RegistryEntry> {
        let raw: Vec<RawRegistryEntry> = serde_json::from_str(BODY).unwrap();
        parse_registry(raw).unwrap()
    }

    #[test]
    fn test_fees_become_exact_fractions() {
        let entries = entries();
        assert_eq!(entries[0].amp_factor, BigUint::from(200u32));
        // 2_000_000 / 1e10 = 1/5000
        assert_eq!(
            entries[0].fees.trade,
            BigRational::new(BigInt::from(1), BigInt::from(5000))
        );
        // 5e9 / 1e10 = 1/2
        assert_eq!(
            entries[0].fees.admin,
            BigRational::new(BigInt::from(1), BigInt::from(2))
        );
        assert!(entries[1].paused);
        assert_eq!(
            entries[1].fees.withdraw,
            BigRational::new(BigInt::from(1), BigInt::from(1000))
        );
    }

    #[test]
    fn test_malformed_number_is_registry_unavailable() {
        let body = BODY.replace("\"85\"", "\"8.5\"");
        let raw: Vec<RawRegistryEntry> = serde_json::from_str(&body).unwrap();
        assert!(matches!(
            parse_registry(raw),
            Err(TvlError::RegistryUnavailable(_))
        ));
    }

    fn registry_at(url: String) -> HttpPoolRegistry {
        HttpPoolRegistry::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_served_registry() {
        let (base, server) = serve_once("200 OK", BODY).await;
        let fetched = registry_at(format!("{}/data/pools.json", base))
            .fetch_registry()
            .await
            .unwrap();

        assert_eq!(fetched, entries());
        assert!(server.await.unwrap().starts_with("GET /data/pools.json "));
    }

    #[tokio::test]
    async fn test_error_status_is_registry_unavailable() {
        let (base, _server) = serve_once("500 Internal Server Error", "oops").await;
        let err = registry_at(base).fetch_registry().await.unwrap_err();
        assert!(matches!(err, TvlError::RegistryUnavailable(ref m) if m.contains("500")), "{}", err);
    }

    #[tokio::test]
    async fn test_non_array_body_is_registry_unavailable() {
        let (base, _server) = serve_once("200 OK", r#"{"not":"an array"}"#).await;
        let err = registry_at(base).fetch_registry().await.unwrap_err();
        assert!(matches!(err, TvlError::RegistryUnavailable(_)), "{}", err);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_registry_unavailable() {
        let err = registry_at(closed_port_url().await).fetch_registry().await.unwrap_err();
        assert!(matches!(err, TvlError::RegistryUnavailable(_)), "{}", err);
    }

    #[test]
    fn test_alignment_requires_exact_length() {
        assert_eq!(align_registry(entries(), 2).unwrap().len(), 2);
        assert!(matches!(
            align_registry(entries(), 3),
            Err(TvlError::RegistryMisaligned {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            align_registry(entries(), 1),
            Err(TvlError::RegistryMisaligned {
                expected: 1,
                actual: 2
            })
        ));
    }
}
