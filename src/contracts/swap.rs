use super::AbiCodec;
use crate::error::Result;
use ethers::abi::Token;
use ethers::types::U256;

pub const GET_TOKEN_BALANCE: &str = "getTokenBalance";

/// Stable-swap pool interface (reads only).
pub fn swap_codec() -> Result<AbiCodec> {
    AbiCodec::from_human_readable(&[
        "function getTokenBalance(uint8 index) external view returns (uint256)",
    ])
}

pub fn token_index_arg(index: u8) -> Token {
    Token::Uint(U256::from(index))
}
