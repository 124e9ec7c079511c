use crate::types::conversions::{pow10, u256_to_biguint};
use ethers::types::U256;
use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::Zero;

/// Implicit denominator of every registry fee numerator (10^10).
pub const FEE_DENOMINATOR: u64 = 10_000_000_000;

/// An on-chain integer amount together with the decimal precision of its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    pub raw: BigUint,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(raw: BigUint, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn from_u256(raw: U256, decimals: u8) -> Self {
        Self::new(u256_to_biguint(raw), decimals)
    }

    /// Whole-token amount as an exact fraction (`raw / 10^decimals`).
    pub fn to_fraction(&self) -> BigRational {
        BigRational::new(
            BigInt::from(self.raw.clone()),
            BigInt::from(pow10(self.decimals as u32)),
        )
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }
}

/// Pool fee structure. Every field is an exact fraction of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Fees {
    pub trade: BigRational,
    pub admin: BigRational,
    pub deposit: BigRational,
    pub withdraw: BigRational,
}

impl Fees {
    pub fn zero() -> Self {
        Self {
            trade: BigRational::zero(),
            admin: BigRational::zero(),
            deposit: BigRational::zero(),
            withdraw: BigRational::zero(),
        }
    }
}

/// `numerator / 10^10`
pub fn fee_fraction(numerator: &BigUint) -> BigRational {
    BigRational::new(
        BigInt::from(numerator.clone()),
        BigInt::from(FEE_DENOMINATOR),
    )
}
