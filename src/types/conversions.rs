use crate::error::{Result, TvlError};
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

// Addresses

/// Parses a hex contract address, rejecting mixed-case input whose EIP-55 checksum is wrong.
pub fn parse_address(value: &str) -> Result<Address> {
    let trimmed = value.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_part.len() != 40 {
        return Err(TvlError::InvalidAddress(format!(
            "'{}' ({} hex chars, expected 40)",
            value,
            hex_part.len()
        )));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| TvlError::InvalidAddress(format!("'{}': {}", value, e)))?;
    let address = Address::from_slice(&bytes);

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None)[2..] != *hex_part {
        return Err(TvlError::InvalidAddress(format!("'{}': bad checksum", value)));
    }

    Ok(address)
}

/// Returns the EIP-55 checksummed form of `value`, or `InvalidAddress`.
pub fn checksum_address(value: &str) -> Result<String> {
    parse_address(value).map(|address| to_checksum(&address, None))
}

// Amounts

pub fn u256_to_biguint(value: U256) -> BigUint {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigUint::from_bytes_be(&buf)
}

pub fn pow10(exponent: u32) -> BigUint {
    BigUint::from(10u32).pow(exponent)
}

/// Rounds `value` half away from zero to `scale` fractional digits.
pub fn rational_to_decimal(value: &BigRational, scale: u32) -> Result<Decimal> {
    let factor = BigRational::from_integer(BigInt::from(pow10(scale)));
    let scaled = (value * factor).round().to_integer();
    let mantissa = scaled
        .to_i128()
        .ok_or_else(|| TvlError::Conversion(format!("{} does not fit in i128", scaled)))?;

    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map_err(|e| TvlError::Conversion(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_checksum_lowercase_input() {
        let checksummed = checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(checksummed, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_checksum_accepts_valid_mixed_case() {
        let input = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
        assert_eq!(checksum_address(input).unwrap(), input);
    }

    #[test]
    fn test_rejects_bad_checksum() {
        // Second character lowercased
        let err = checksum_address("0xfb6916095ca1df60bB79Ce92cE3Ea74c37c5d359").unwrap_err();
        assert!(matches!(err, TvlError::InvalidAddress(_)));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            parse_address("0x1234"),
            Err(TvlError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_address("0xzz5aaeb6053f3e94c9b9a09f33669435e7ef1bea"),
            Err(TvlError::InvalidAddress(_))
        ));
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_u256_to_biguint() {
        let value = U256::from_dec_str("123456789012345678901234567890").unwrap();
        assert_eq!(
            u256_to_biguint(value),
            BigUint::from_str("123456789012345678901234567890").unwrap()
        );
        assert_eq!(u256_to_biguint(U256::zero()), BigUint::from(0u32));
    }

    #[test]
    fn test_rational_to_decimal_rounds_half_up() {
        let value = BigRational::new(BigInt::from(12345), BigInt::from(1000)); // 12.345
        assert_eq!(rational_to_decimal(&value, 2).unwrap(), Decimal::from_str("12.35").unwrap());

        let third = BigRational::new(BigInt::from(1), BigInt::from(3));
        assert_eq!(rational_to_decimal(&third, 4).unwrap(), Decimal::from_str("0.3333").unwrap());
    }
}
