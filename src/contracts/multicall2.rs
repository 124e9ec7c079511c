use crate::error::{Result, TvlError};
use crate::multicall::Call;
use ethers::abi::{Function, Param, ParamType, StateMutability, Token};
use ethers::types::Bytes;

/// Multicall2 `aggregate((address,bytes)[]) returns (uint256 blockNumber, bytes[] returnData)`.
///
/// Reverts as a whole if any inner call reverts.
pub fn aggregate_function() -> Function {
    Function {
        name: "aggregate".to_string(),
        inputs: vec![Param {
            name: "calls".to_string(),
            kind: ParamType::Array(Box::new(ParamType::Tuple(vec![
                ParamType::Address,
                ParamType::Bytes,
            ]))),
            internal_type: None,
        }],
        outputs: vec![
            Param {
                name: "blockNumber".to_string(),
                kind: ParamType::Uint(256),
                internal_type: None,
            },
            Param {
                name: "returnData".to_string(),
                kind: ParamType::Array(Box::new(ParamType::Bytes)),
                internal_type: None,
            },
        ],
        constant: None,
        state_mutability: StateMutability::NonPayable,
    }
}

pub fn encode_aggregate(calls: &[Call]) -> Result<Bytes> {
    let call_tokens = calls
        .iter()
        .map(|call| {
            Token::Tuple(vec![
                Token::Address(call.target),
                Token::Bytes(call.call_data.to_vec()),
            ])
        })
        .collect();

    let data = aggregate_function().encode_input(&[Token::Array(call_tokens)])?;
    Ok(Bytes::from(data))
}

/// Returns the `returnData` array of an `aggregate` response, in call order.
pub fn decode_aggregate(response: &[u8]) -> Result<Vec<Bytes>> {
    let mut decoded = aggregate_function().decode_output(response)?;
    if decoded.len() != 2 {
        return Err(TvlError::Abi(format!(
            "aggregate returned {} values, expected 2",
            decoded.len()
        )));
    }

    let return_data = decoded
        .pop()
        .and_then(|t| t.into_array())
        .ok_or_else(|| TvlError::Abi("Invalid multicall response format".to_string()))?;

    return_data
        .into_iter()
        .map(|token| match token {
            Token::Bytes(data) => Ok(Bytes::from(data)),
            other => Err(TvlError::Abi(format!(
                "aggregate returnData entry is {:?}, expected bytes",
                other
            ))),
        })
        .collect()
}
