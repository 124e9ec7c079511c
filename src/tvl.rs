//! # TVL aggregation
//!
//! Resolves a USD price for both tokens of every pool, values the pool's reserves, and folds
//! all resolvable pool values into one exact total.
//!
//! ## Price resolution
//!
//! 1. A direct external price always wins.
//! 2. A missing side is derived from the other side and the pool's exchange rate
//!    (token 1 per token 0): `p1 = p0 × rate`, `p0 = p1 ÷ rate`.
//! 3. With no direct price on either side the pool is unresolvable and contributes zero.
//!
//! Everything stays in exact rationals until display time.

use crate::coingecko_price_feed::PriceTable;
use crate::error::{Result, TvlError};
use crate::pool_registry::RegistryEntry;
use crate::pools::Pool;
use crate::reserve_decoder::PoolReserves;
use crate::stableswap::calculate_swap_price;
use crate::types::TokenAmount;
use log::{debug, warn};
use num_rational::BigRational;
use num_traits::Zero;

/// Everything known about one pool at valuation time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeSnapshot {
    pub registry: RegistryEntry,
    pub lp_total_supply: TokenAmount,
    pub reserves: [TokenAmount; 2],
}

impl ExchangeSnapshot {
    pub fn new(registry: RegistryEntry, reserves: PoolReserves) -> Self {
        Self {
            registry,
            lp_total_supply: reserves.lp_total_supply,
            reserves: reserves.reserves,
        }
    }

    /// Token 1 per token 0 from the stable-swap invariant, if defined.
    pub fn swap_price(&self) -> Option<BigRational> {
        calculate_swap_price(&self.registry, &self.reserves)
    }
}

/// Pairs index-aligned registry entries with decoded reserves.
pub fn assemble_snapshots(
    registry: Vec<RegistryEntry>,
    reserves: Vec<PoolReserves>,
) -> Result<Vec<ExchangeSnapshot>> {
    if registry.len() != reserves.len() {
        return Err(TvlError::RegistryMisaligned {
            expected: reserves.len(),
            actual: registry.len(),
        });
    }

    Ok(registry
        .into_iter()
        .zip(reserves)
        .map(|(entry, reserves)| ExchangeSnapshot::new(entry, reserves))
        .collect())
}

/// Which side, if any, was derived through the exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrigin {
    Direct,
    DerivedToken0,
    DerivedToken1,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrices {
    pub token0: BigRational,
    pub token1: BigRational,
    pub origin: PriceOrigin,
}

/// Resolves both token prices of the pool at `index`.
///
/// Fails with the non-fatal `UnresolvablePrice` when neither token has a direct price or
/// the exchange rate needed for the derivation is undefined.
pub fn resolve_prices(
    index: usize,
    pool: &Pool,
    snapshot: &ExchangeSnapshot,
    prices: &PriceTable,
) -> Result<ResolvedPrices> {
    let direct0 = prices.price_of(&pool.tokens[0]);
    let direct1 = prices.price_of(&pool.tokens[1]);
    let unresolvable = || TvlError::UnresolvablePrice { pool: index };

    match (direct0, direct1) {
        (Some(token0), Some(token1)) => Ok(ResolvedPrices {
            token0,
            token1,
            origin: PriceOrigin::Direct,
        }),
        (Some(token0), None) => {
            let rate = snapshot.swap_price().ok_or_else(unresolvable)?;
            Ok(ResolvedPrices {
                token1: &token0 * rate,
                token0,
                origin: PriceOrigin::DerivedToken1,
            })
        }
        (None, Some(token1)) => {
            let rate = snapshot.swap_price().ok_or_else(unresolvable)?;
            Ok(ResolvedPrices {
                token0: &token1 / rate,
                token1,
                origin: PriceOrigin::DerivedToken0,
            })
        }
        (None, None) => Err(unresolvable()),
    }
}

/// `p0 × reserve0 + p1 × reserve1`, reserves in whole tokens.
pub fn pool_value(prices: &ResolvedPrices, snapshot: &ExchangeSnapshot) -> BigRational {
    &prices.token0 * snapshot.reserves[0].to_fraction()
        + &prices.token1 * snapshot.reserves[1].to_fraction()
}

/// Exact sum starting from exact zero.
pub fn sum_values<'a, I>(values: I) -> BigRational
where
    I: IntoIterator<Item = &'a BigRational>,
{
    values
        .into_iter()
        .fold(BigRational::zero(), |acc, value| acc + value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolValuation {
    pub index: usize,
    pub name: String,
    pub paused: bool,
    /// `None` for unresolvable pools.
    pub prices: Option<ResolvedPrices>,
    pub value: Option<BigRational>,
    pub lp_supply: BigRational,
    /// USD value per LP token, when both the value and a non-zero supply exist.
    pub lp_virtual_price: Option<BigRational>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TvlReport {
    pub total: BigRational,
    pub pools: Vec<PoolValuation>,
}

impl TvlReport {
    pub fn resolved_count(&self) -> usize {
        self.pools.iter().filter(|p| p.value.is_some()).count()
    }
}

/// Values every pool and folds the resolvable ones into the total. Pure: inputs are only read.
pub fn aggregate_tvl(
    pools: &[Pool],
    snapshots: &[ExchangeSnapshot],
    prices: &PriceTable,
) -> Result<TvlReport> {
    if pools.len() != snapshots.len() {
        return Err(TvlError::RegistryMisaligned {
            expected: pools.len(),
            actual: snapshots.len(),
        });
    }

    let mut valuations = Vec::with_capacity(pools.len());
    for (index, (pool, snapshot)) in pools.iter().zip(snapshots).enumerate() {
        let resolved = match resolve_prices(index, pool, snapshot, prices) {
            Ok(resolved) => Some(resolved),
            Err(e) if !e.is_fatal() => {
                warn!("Skipping pool {} ({}): {}", index, pool.name, e);
                None
            }
            Err(e) => return Err(e),
        };

        let value = resolved.as_ref().map(|p| pool_value(p, snapshot));
        let lp_supply = snapshot.lp_total_supply.to_fraction();
        let lp_virtual_price = value
            .as_ref()
            .filter(|_| !lp_supply.is_zero())
            .map(|v| v / &lp_supply);

        if let (Some(value), Some(prices)) = (&value, &resolved) {
            debug!(
                "Pool {} ({}): value={} p0={} p1={} origin={:?} lp_price={:?}",
                index, pool.name, value, prices.token0, prices.token1, prices.origin, lp_virtual_price
            );
        }

        valuations.push(PoolValuation {
            index,
            name: pool.name.clone(),
            paused: snapshot.registry.paused,
            prices: resolved,
            value,
            lp_supply,
            lp_virtual_price,
        });
    }

    let total = sum_values(valuations.iter().filter_map(|v| v.value.as_ref()));
    Ok(TvlReport {
        total,
        pools: valuations,
    })
}
