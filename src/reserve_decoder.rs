//! Read-call construction and positional decoding of the batched results.
//!
//! Every pool contributes exactly [`CALLS_PER_POOL`] consecutive calls, in this order:
//! LP total supply, reserve of token 0, reserve of token 1. Pool `i` therefore always owns
//! the result window `[3i, 3i + 1, 3i + 2]`.

use crate::contracts::lp_token::TOTAL_SUPPLY;
use crate::contracts::swap::{token_index_arg, GET_TOKEN_BALANCE};
use crate::contracts::AbiCodec;
use crate::error::{Result, TvlError};
use crate::multicall::Call;
use crate::pools::Pool;
use crate::types::TokenAmount;
use ethers::types::Bytes;
use log::debug;

pub const CALLS_PER_POOL: usize = 3;

/// Decoded on-chain state of one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReserves {
    pub lp_total_supply: TokenAmount,
    pub reserves: [TokenAmount; 2],
}

/// Encodes the three reads every pool needs.
pub fn build_read_calls(pools: &[Pool], lp_codec: &AbiCodec, swap_codec: &AbiCodec) -> Result<Vec<Call>> {
    let total_supply = lp_codec.encode(TOTAL_SUPPLY, &[])?;
    let balance_0 = swap_codec.encode(GET_TOKEN_BALANCE, &[token_index_arg(0)])?;
    let balance_1 = swap_codec.encode(GET_TOKEN_BALANCE, &[token_index_arg(1)])?;

    let calls: Vec<Call> = pools
        .iter()
        .flat_map(|pool| {
            [
                Call {
                    target: pool.lp_token.address,
                    call_data: total_supply.clone(),
                },
                Call {
                    target: pool.address,
                    call_data: balance_0.clone(),
                },
                Call {
                    target: pool.address,
                    call_data: balance_1.clone(),
                },
            ]
        })
        .collect();

    debug!("Built {} read calls for {} pools", calls.len(), pools.len());
    Ok(calls)
}

/// Splits the flat batch result into per-pool windows and decodes each one.
///
/// Output order mirrors `pools`. A payload that does not decode as the expected `uint256`
/// fails with `TvlError::Decode` naming the pool index and field.
pub fn decode_reserves(
    pools: &[Pool],
    results: &[Bytes],
    lp_codec: &AbiCodec,
    swap_codec: &AbiCodec,
) -> Result<Vec<PoolReserves>> {
    let expected = pools.len() * CALLS_PER_POOL;
    if results.len() != expected {
        return Err(TvlError::BatchLengthMismatch {
            expected,
            actual: results.len(),
        });
    }

    pools
        .iter()
        .zip(results.chunks_exact(CALLS_PER_POOL))
        .enumerate()
        .map(|(i, (pool, window))| {
            let field = |field: &'static str, codec: &AbiCodec, function: &str, data: &Bytes| {
                codec.decode_uint(function, data).map_err(|e| TvlError::Decode {
                    pool: i,
                    field,
                    reason: format!("{} (payload 0x{})", e, hex::encode(data)),
                })
            };

            let supply = field("lpTotalSupply", lp_codec, TOTAL_SUPPLY, &window[0])?;
            let reserve0 = field("reserve0", swap_codec, GET_TOKEN_BALANCE, &window[1])?;
            let reserve1 = field("reserve1", swap_codec, GET_TOKEN_BALANCE, &window[2])?;

            Ok(PoolReserves {
                lp_total_supply: TokenAmount::from_u256(supply, pool.lp_token.decimals),
                reserves: [
                    TokenAmount::from_u256(reserve0, pool.tokens[0].decimals),
                    TokenAmount::from_u256(reserve1, pool.tokens[1].decimals),
                ],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{lp_token_codec, swap_codec};
    use crate::pools::{LpToken, Token};
    use ethers::abi::Token as AbiToken;
    use ethers::types::{Address, U256};
    use num_bigint::BigUint;

    fn pool(seed: u64, decimals: [u8; 2]) -> Pool {
        let token = |offset: u64, decimals: u8| Token {
            symbol: format!("T{}", seed + offset),
            address: Address::from_low_u64_be(seed * 100 + offset),
            decimals,
            coingecko_id: None,
        };
        Pool {
            name: format!("pool-{}", seed),
            address: Address::from_low_u64_be(seed * 100),
            lp_token: LpToken {
                address: Address::from_low_u64_be(seed * 100 + 50),
                decimals: 18,
            },
            tokens: [token(1, decimals[0]), token(2, decimals[1])],
        }
    }

    fn uint(v: u64) -> Bytes {
        Bytes::from(ethers::abi::encode(&[AbiToken::Uint(U256::from(v))]))
    }

    #[test]
    fn test_build_read_calls_layout() {
        let pools = vec![pool(1, [18, 18]), pool(2, [18, 6])];
        let calls = build_read_calls(&pools, &lp_token_codec().unwrap(), &swap_codec().unwrap()).unwrap();

        assert_eq!(calls.len(), 6);
        assert_eq!(calls[0].target, pools[0].lp_token.address);
        assert_eq!(calls[1].target, pools[0].address);
        assert_eq!(calls[2].target, pools[0].address);
        assert_eq!(calls[3].target, pools[1].lp_token.address);
        assert_ne!(calls[1].call_data, calls[2].call_data);
        assert_eq!(calls[1].call_data, calls[4].call_data);
    }

    #[test]
    fn test_windows_map_to_their_own_pool() {
        let pools = vec![pool(1, [18, 18]), pool(2, [18, 6]), pool(3, [6, 6])];
        let results: Vec<Bytes> = (0..9).map(|v| uint(1000 + v)).collect();

        let decoded =
            decode_reserves(&pools, &results, &lp_token_codec().unwrap(), &swap_codec().unwrap()).unwrap();

        assert_eq!(decoded.len(), 3);
        for (i, reserves) in decoded.iter().enumerate() {
            let base = 1000 + 3 * i as u64;
            assert_eq!(reserves.lp_total_supply.raw, BigUint::from(base));
            assert_eq!(reserves.reserves[0].raw, BigUint::from(base + 1));
            assert_eq!(reserves.reserves[1].raw, BigUint::from(base + 2));
            assert_eq!(reserves.reserves[0].decimals, pools[i].tokens[0].decimals);
            assert_eq!(reserves.reserves[1].decimals, pools[i].tokens[1].decimals);
        }
    }

    #[test]
    fn test_bad_payload_names_pool_and_field() {
        let pools = vec![pool(1, [18, 18]), pool(2, [18, 18])];
        let mut results: Vec<Bytes> = (0..6).map(uint).collect();
        results[5] = Bytes::from(vec![0xde, 0xad]);

        let err = decode_reserves(&pools, &results, &lp_token_codec().unwrap(), &swap_codec().unwrap())
            .unwrap_err();
        match err {
            TvlError::Decode { pool, field, .. } => {
                assert_eq!(pool, 1);
                assert_eq!(field, "reserve1");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_result_count_must_match_pool_count() {
        let pools = vec![pool(1, [18, 18])];
        let results: Vec<Bytes> = (0..4).map(uint).collect();
        assert!(matches!(
            decode_reserves(&pools, &results, &lp_token_codec().unwrap(), &swap_codec().unwrap()),
            Err(TvlError::BatchLengthMismatch { expected: 3, actual: 4 })
        ));
    }
}
