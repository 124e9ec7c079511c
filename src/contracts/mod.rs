// Contracts Module - Stateless ABI codecs
//
// No contract here is bound to an address or a provider: callers pass the target
// address with every call and run the encoded bytes through whichever transport they hold.

pub mod lp_token;
pub mod multicall2;
pub mod swap;

use crate::error::{Result, TvlError};
use ethers::abi::{Abi, Function, Token};
use ethers::types::{Bytes, U256};

pub use lp_token::lp_token_codec;
pub use multicall2::{aggregate_function, decode_aggregate, encode_aggregate};
pub use swap::swap_codec;

/// Encode/decode capability for one contract interface.
#[derive(Debug, Clone)]
pub struct AbiCodec {
    abi: Abi,
}

impl AbiCodec {
    pub fn new(abi: Abi) -> Self {
        Self { abi }
    }

    /// Builds a codec from human-readable signatures, e.g. `function totalSupply() view returns (uint256)`.
    pub fn from_human_readable(signatures: &[&str]) -> Result<Self> {
        let abi = ethers::abi::parse_abi(signatures).map_err(|e| TvlError::Abi(e.to_string()))?;
        Ok(Self::new(abi))
    }

    fn function(&self, name: &str) -> Result<&Function> {
        Ok(self.abi.function(name)?)
    }

    pub fn encode(&self, name: &str, args: &[Token]) -> Result<Bytes> {
        let data = self.function(name)?.encode_input(args)?;
        Ok(Bytes::from(data))
    }

    /// Decodes `data` as the output tuple of `name`. Fails if the shape does not match.
    pub fn decode(&self, name: &str, data: &[u8]) -> Result<Vec<Token>> {
        Ok(self.function(name)?.decode_output(data)?)
    }

    /// Decodes a function whose only output is a `uint`.
    pub fn decode_uint(&self, name: &str, data: &[u8]) -> Result<U256> {
        let mut tokens = self.decode(name, data)?;
        match (tokens.len(), tokens.pop()) {
            (1, Some(Token::Uint(value))) => Ok(value),
            (_, other) => Err(TvlError::Abi(format!(
                "{} returned {:?}, expected a single uint",
                name, other
            ))),
        }
    }
}
