// src/coingecko_price_feed.rs

use crate::error::{Result, TvlError};
use crate::pools::{Pool, Token};
use async_trait::async_trait;
use log::{debug, info, warn};
use num_bigint::BigInt;
use num_rational::BigRational;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Prices are quantised to micro-dollars before becoming exact fractions.
const PRICE_SCALE: i64 = 1_000_000;

const VS_CURRENCY: &str = "usd";

// CoinGecko returns a flat map id -> { "usd": price }
type CoinGeckoPriceResponse = HashMap<String, CoinGeckoTokenPrice>;

#[derive(Debug, Deserialize)]
struct CoinGeckoTokenPrice {
    usd: Option<f64>,
}

/// USD prices keyed by external price identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    prices: HashMap<String, BigRational>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, price: BigRational) {
        self.prices.insert(id.into(), price);
    }

    pub fn get(&self, id: &str) -> Option<&BigRational> {
        self.prices.get(id)
    }

    /// Direct USD price of `token`, if it has an identifier and the source quoted it.
    pub fn price_of(&self, token: &Token) -> Option<BigRational> {
        token
            .coingecko_id
            .as_deref()
            .and_then(|id| self.get(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// `round(usd * 1e6) / 1e6`. Zero, negative and non-finite quotes count as no price.
pub fn usd_to_fraction(usd: f64) -> Option<BigRational> {
    if !usd.is_finite() || usd <= 0.0 {
        return None;
    }
    let micros = (usd * PRICE_SCALE as f64).round();
    if micros < 1.0 || micros > i64::MAX as f64 {
        return None;
    }
    Some(BigRational::new(
        BigInt::from(micros as i64),
        BigInt::from(PRICE_SCALE),
    ))
}

/// Every price identifier across `pools`, deduplicated. Tokens without one are skipped.
pub fn collect_price_ids(pools: &[Pool]) -> BTreeSet<String> {
    pools
        .iter()
        .flat_map(|p| p.price_ids())
        .map(str::to_string)
        .collect()
}

fn build_price_table(response: CoinGeckoPriceResponse) -> PriceTable {
    let mut table = PriceTable::new();
    for (id, quote) in response {
        match quote.usd.and_then(usd_to_fraction) {
            Some(price) => table.insert(id, price),
            None => warn!("CoinGecko: no usable USD price for {}", id),
        }
    }
    table
}

/// Source of USD spot prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self, ids: &BTreeSet<String>) -> Result<PriceTable>;
}

/// CoinGecko `simple/price` client. One request per run.
pub struct CoinGeckoPriceFeed {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoPriceFeed {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TvlError::PriceSourceUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    /// `{base}/simple/price?ids=a,b&vs_currencies=usd`. Each id is escaped on its own so the
    /// separating commas stay literal.
    fn price_url(&self, ids: &BTreeSet<String>) -> Result<url::Url> {
        let ids_param = ids
            .iter()
            .map(|id| url::form_urlencoded::byte_serialize(id.as_bytes()).collect::<String>())
            .collect::<Vec<_>>()
            .join(",");
        let mut url = url::Url::parse(&format!(
            "{}/simple/price",
            self.base_url.trim_end_matches('/')
        ))
        .map_err(|e| TvlError::PriceSourceUnavailable(format!("bad base URL: {}", e)))?;

        url.set_query(Some(&format!(
            "ids={}&vs_currencies={}",
            ids_param, VS_CURRENCY
        )));
        Ok(url)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoPriceFeed {
    async fn fetch_prices(&self, ids: &BTreeSet<String>) -> Result<PriceTable> {
        if ids.is_empty() {
            debug!("No price identifiers configured, skipping CoinGecko request");
            return Ok(PriceTable::new());
        }

        let url = self.price_url(ids)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TvlError::PriceSourceUnavailable(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            if response.status() == 429 {
                return Err(TvlError::PriceSourceUnavailable("Rate limited (429)".to_string()));
            }
            return Err(TvlError::PriceSourceUnavailable(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let price_data: CoinGeckoPriceResponse = response
            .json()
            .await
            .map_err(|e| TvlError::PriceSourceUnavailable(format!("JSON parse failed: {}", e)))?;

        let table = build_price_table(price_data);
        info!("Fetched {} of {} requested USD prices", table.len(), ids.len());
        Ok(table)
    }
}
