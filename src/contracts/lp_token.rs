use super::AbiCodec;
use crate::error::Result;

pub const TOTAL_SUPPLY: &str = "totalSupply";

pub fn lp_token_codec() -> Result<AbiCodec> {
    AbiCodec::from_human_readable(&[
        "function totalSupply() external view returns (uint256)",
    ])
}
