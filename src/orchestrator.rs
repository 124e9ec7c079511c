//! # TVL Orchestrator
//!
//! Wires the pipeline together:
//!
//! ```text
//! static pool list -> read calls -> chunked multicall -> reserve decoder ─┐
//!                                   pool registry ───────────────────────┼─> aggregator
//!                                   price oracle ────────────────────────┘
//! ```
//!
//! The three remote reads run concurrently and are all joined before aggregation. Any fatal
//! failure aborts the run; nothing is written by the orchestrator itself.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stableswap_tvl::{Settings, TvlOrchestrator};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = Settings::new()?;
//! let orchestrator = TvlOrchestrator::from_settings(&settings)?;
//! let report = orchestrator.run().await?;
//! println!("{}", report.total);
//! # Ok(())
//! # }
//! ```

use crate::{
    coingecko_price_feed::{collect_price_ids, CoinGeckoPriceFeed, PriceSource},
    contracts::{lp_token_codec, swap_codec, AbiCodec},
    error::{Result, TvlError},
    multicall::{ChunkedMulticall, Multicall2Reader},
    pool_registry::{align_registry, HttpPoolRegistry, RegistrySource},
    pools::{load_pools, Pool},
    reserve_decoder::{build_read_calls, decode_reserves},
    settings::Settings,
    tvl::{aggregate_tvl, assemble_snapshots, TvlReport},
    types::conversions::parse_address,
};
use config::ConfigError;
use ethers::prelude::{Http, Provider};
use log::info;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct TvlOrchestrator {
    pools: Vec<Pool>,
    lp_codec: AbiCodec,
    swap_codec: AbiCodec,
    multicall: ChunkedMulticall,
    registry: Arc<dyn RegistrySource>,
    prices: Arc<dyn PriceSource>,
    expected_chain_id: Option<u64>,
}

impl TvlOrchestrator {
    /// Builds an orchestrator from explicit collaborators.
    pub fn new(
        pools: Vec<Pool>,
        multicall: ChunkedMulticall,
        registry: Arc<dyn RegistrySource>,
        prices: Arc<dyn PriceSource>,
    ) -> Result<Self> {
        Ok(Self {
            pools,
            lp_codec: lp_token_codec()?,
            swap_codec: swap_codec()?,
            multicall,
            registry,
            prices,
            expected_chain_id: None,
        })
    }

    /// Refuses to run against any network other than `chain_id`.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.expected_chain_id = Some(chain_id);
        self
    }

    /// Builds the production collaborators. Every address is validated here, before any
    /// network traffic.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let pools = load_pools(&settings.pools)?;
        let multicall_address = parse_address(&settings.multicall.address)?;

        let provider = Provider::<Http>::try_from(settings.rpc.url.as_str())
            .map_err(|e| TvlError::Transport(format!("RPC provider {}: {}", settings.rpc.url, e)))?;
        let reader = Arc::new(Multicall2Reader::new(Arc::new(provider), multicall_address));
        let multicall = ChunkedMulticall::new(reader, settings.multicall.chunk_size);

        let registry = HttpPoolRegistry::new(
            settings.registry.url.clone(),
            Duration::from_millis(settings.registry.timeout_ms),
        )?;
        let prices = CoinGeckoPriceFeed::new(
            settings.prices.base_url.clone(),
            Duration::from_millis(settings.prices.timeout_ms),
        )?;

        Ok(Self::new(pools, multicall, Arc::new(registry), Arc::new(prices))?
            .with_chain_id(settings.rpc.chain_id))
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Fails with `Transport` when the reader is connected to another network.
    async fn check_chain(&self) -> Result<()> {
        let Some(expected) = self.expected_chain_id else {
            return Ok(());
        };
        let actual = self.multicall.chain_id().await?;
        if actual != expected {
            return Err(TvlError::Transport(format!(
                "connected to chain {}, expected {}",
                actual, expected
            )));
        }
        Ok(())
    }

    /// Runs one full aggregation.
    pub async fn run(&self) -> Result<TvlReport> {
        if self.pools.is_empty() {
            return Err(TvlError::Config(ConfigError::Message(
                "no pools configured; add [[pools]] entries in registry order".to_string(),
            )));
        }
        self.check_chain().await?;

        let start = Instant::now();
        let calls = build_read_calls(&self.pools, &self.lp_codec, &self.swap_codec)?;
        let price_ids = collect_price_ids(&self.pools);
        info!(
            "Reading {} pools ({} calls, chunk size {}), {} price ids",
            self.pools.len(),
            calls.len(),
            self.multicall.chunk_size(),
            price_ids.len()
        );

        let reserves_fut = async {
            let results = self.multicall.run(calls).await?;
            decode_reserves(&self.pools, &results, &self.lp_codec, &self.swap_codec)
        };
        let (reserves, registry, prices) = tokio::try_join!(
            reserves_fut,
            self.registry.fetch_registry(),
            self.prices.fetch_prices(&price_ids),
        )?;

        let registry = align_registry(registry, self.pools.len())?;
        let snapshots = assemble_snapshots(registry, reserves)?;
        let report = aggregate_tvl(&self.pools, &snapshots, &prices)?;

        info!(
            "Valued {}/{} pools in {:?}",
            report.resolved_count(),
            self.pools.len(),
            start.elapsed()
        );
        Ok(report)
    }
}
