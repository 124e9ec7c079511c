//! Error taxonomy for the TVL pipeline.
//!
//! Every variant except [`TvlError::UnresolvablePrice`] is fatal: it propagates to the
//! binary, gets logged, and the run ends without touching the output artifact.

/// Crate-wide result alias.
pub type Result<T, E = TvlError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum TvlError {
    /// Malformed or badly checksummed contract address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A return payload did not match the expected function output.
    #[error("Decode error for pool {pool} field `{field}`: {reason}")]
    Decode {
        pool: usize,
        field: &'static str,
        reason: String,
    },

    #[error("Pool registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Registry response is not index-aligned with the static pool list.
    #[error("Pool registry misaligned: expected {expected} entries, got {actual}")]
    RegistryMisaligned { expected: usize, actual: usize },

    #[error("Price source unavailable: {0}")]
    PriceSourceUnavailable(String),

    /// Chain read transport failure (RPC error, reverted aggregate, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Batch length mismatch: submitted {expected} calls, received {actual} results")]
    BatchLengthMismatch { expected: usize, actual: usize },

    /// No USD price could be resolved for this pool. Non-fatal.
    #[error("No USD price resolvable for pool {pool}")]
    UnresolvablePrice { pool: usize },

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

impl TvlError {
    /// Whether the run may continue after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TvlError::UnresolvablePrice { .. })
    }
}

impl From<ethers::abi::Error> for TvlError {
    fn from(e: ethers::abi::Error) -> Self {
        TvlError::Abi(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unresolvable_price_is_non_fatal() {
        assert!(!TvlError::UnresolvablePrice { pool: 3 }.is_fatal());
        assert!(TvlError::RegistryMisaligned { expected: 2, actual: 1 }.is_fatal());
        assert!(TvlError::InvalidAddress("0x12".into()).is_fatal());
    }

    #[test]
    fn test_decode_error_names_pool_and_field() {
        let err = TvlError::Decode {
            pool: 4,
            field: "reserve1",
            reason: "short payload".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pool 4"));
        assert!(msg.contains("reserve1"));
    }
}
