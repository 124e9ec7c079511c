pub mod amounts;
pub mod conversions;

pub use amounts::{fee_fraction, Fees, TokenAmount, FEE_DENOMINATOR};
