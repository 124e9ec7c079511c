//! # Stable-swap TVL
//!
//! Computes the total value locked across a fixed list of two-token stable-swap pools.
//!
//! ## Overview
//!
//! One run reads LP supply and both reserves of every pool in as few aggregated on-chain
//! calls as possible, fetches per-pool registry metadata (amplification factor, fees, pause
//! flag) and USD spot prices, then folds everything into a single exact TVL figure.
//!
//! ## Architecture
//!
//! ### Batching Layer
//! [`multicall`] splits the read list into chunks, issues them concurrently through a
//! Multicall2 deployment and reassembles the payloads in input order.
//!
//! ### Decoding Layer
//! [`reserve_decoder`] builds the per-pool read calls and decodes the result windows back
//! into typed amounts.
//!
//! ### External Sources
//! [`pool_registry`] and [`coingecko_price_feed`] fetch metadata and prices over HTTP.
//!
//! ### Valuation Layer
//! [`stableswap`] provides the invariant math behind the pool exchange rate; [`tvl`] resolves
//! prices, values pools and sums them in exact rational arithmetic.

// Core Types
/// Crate error type
pub mod error;
/// Static pool descriptors
pub mod pools;
/// Amounts, fees and conversions
pub mod types;

// Configuration
pub mod settings;

// Chain access
/// Stateless ABI encode/decode for the contracts read
pub mod contracts;
/// Chunked Multicall2 batch caller
pub mod multicall;
pub mod reserve_decoder;

// External sources
pub mod pool_registry;
pub mod coingecko_price_feed;

// Valuation
pub mod stableswap;
pub mod tvl;

// Pipeline and output
pub mod orchestrator;
pub mod output;

#[cfg(test)]
mod test_support;

pub use error::{Result, TvlError};
pub use orchestrator::TvlOrchestrator;
pub use settings::Settings;
pub use tvl::TvlReport;
