use crate::contracts::{decode_aggregate, encode_aggregate};
use crate::error::{Result, TvlError};
use async_trait::async_trait;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use futures::future::try_join_all;
use log::{debug, warn};
use std::sync::Arc;

/// Largest chunk the aggregator is known to accept without hitting call gas/size limits.
pub const MAX_CHUNK_SIZE: usize = 200;

/// A single read-only contract call to be batched in a multicall.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    /// Target contract address
    pub target: Address,
    /// Encoded function call data
    pub call_data: Bytes,
}

/// Transport for one aggregated read.
///
/// Implementations return exactly one payload per call, in call order, or fail the
/// whole aggregate.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn aggregate(&self, calls: &[Call]) -> Result<Vec<Bytes>>;

    /// Id of the network the reader is connected to.
    async fn chain_id(&self) -> Result<u64>;
}

/// `ChainReader` backed by a Multicall2 deployment, executed through `eth_call`.
#[derive(Clone)]
pub struct Multicall2Reader<M: Middleware> {
    provider: Arc<M>,
    multicall_address: Address,
}

impl<M: Middleware> Multicall2Reader<M> {
    pub fn new(provider: Arc<M>, multicall_address: Address) -> Self {
        Self {
            provider,
            multicall_address,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainReader for Multicall2Reader<M> {
    async fn aggregate(&self, calls: &[Call]) -> Result<Vec<Bytes>> {
        let calldata = encode_aggregate(calls)?;

        let tx_request = TransactionRequest::new()
            .to(self.multicall_address)
            .data(calldata);
        let typed_tx: TypedTransaction = tx_request.into();

        let response = self
            .provider
            .call(&typed_tx, None)
            .await
            .map_err(|e| TvlError::Transport(e.to_string()))?;

        decode_aggregate(&response)
    }

    async fn chain_id(&self) -> Result<u64> {
        let id = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| TvlError::Transport(e.to_string()))?;
        u64::try_from(id).map_err(|_| TvlError::Transport(format!("chain id {} out of range", id)))
    }
}

/// Chunked batch caller.
///
/// Splits an arbitrary call list into groups of at most `chunk_size`, issues one
/// aggregated read per group (all groups concurrently), and reassembles the payloads in
/// input order no matter which group finishes first.
///
/// ## Behaviour
///
/// - **Coalescing**: identical `(target, call_data)` pairs are sent once and fanned back
///   out to every position that asked for them
/// - **All-or-nothing**: any failed group fails the whole run; there is no retry
/// - **Length check**: a group answering with the wrong number of payloads is an error
///
/// ## Example
///
/// ```rust,ignore
/// let reader = Arc::new(Multicall2Reader::new(provider, multicall_address));
/// let multicall = ChunkedMulticall::new(reader, 100);
/// let results = multicall.run(calls).await?;
/// ```
#[derive(Clone)]
pub struct ChunkedMulticall {
    reader: Arc<dyn ChainReader>,
    chunk_size: usize,
}

impl ChunkedMulticall {
    pub fn new(reader: Arc<dyn ChainReader>, chunk_size: usize) -> Self {
        if chunk_size > MAX_CHUNK_SIZE {
            warn!(
                "Chunk size {} exceeds recommended maximum ({}), capping to {}",
                chunk_size, MAX_CHUNK_SIZE, MAX_CHUNK_SIZE
            );
        }

        Self {
            reader,
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.reader.chain_id().await
    }

    /// Runs every call and returns one payload per call, in input order.
    pub async fn run(&self, calls: Vec<Call>) -> Result<Vec<Bytes>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        // Coalesce identical calls to reduce load
        let mut unique_calls = indexmap::IndexSet::new();
        let original_indices: Vec<usize> = calls
            .into_iter()
            .map(|call| unique_calls.insert_full(call).0)
            .collect();

        let unique_call_vec: Vec<Call> = unique_calls.into_iter().collect();
        debug!(
            "Multicall coalesced {} calls into {} ({} chunks of <= {})",
            original_indices.len(),
            unique_call_vec.len(),
            unique_call_vec.len().div_ceil(self.chunk_size),
            self.chunk_size
        );

        // try_join_all yields results in future order, not completion order
        let chunk_results = try_join_all(
            unique_call_vec
                .chunks(self.chunk_size)
                .map(|chunk| self.run_chunk(chunk)),
        )
        .await?;

        let all_results_unique: Vec<Bytes> = chunk_results.into_iter().flatten().collect();

        // Reconstruct the full result set in the original order
        Ok(original_indices
            .into_iter()
            .map(|index| all_results_unique[index].clone())
            .collect())
    }

    async fn run_chunk(&self, chunk: &[Call]) -> Result<Vec<Bytes>> {
        let return_data = self.reader.aggregate(chunk).await?;
        if return_data.len() != chunk.len() {
            return Err(TvlError::BatchLengthMismatch {
                expected: chunk.len(),
                actual: return_data.len(),
            });
        }
        Ok(return_data)
    }
}
