//! Errors returned by the upstream node adapter.

use alloy_primitives::B256;
use alloy_transport::{RpcError, TransportErrorKind};
use std::time::Duration;
use thiserror::Error;

/// An error talking to the upstream node.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The transport or the node failed the request.
    #[error(transparent)]
    Rpc(#[from] RpcError<TransportErrorKind>),
    /// The request did not complete in time.
    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
    /// The node does not know the requested block.
    #[error("block {0} not found")]
    BlockNotFound(u64),
    /// The node does not know the requested transaction.
    #[error("transaction {0} not found")]
    TransactionNotFound(B256),
    /// The head subscription could not be established.
    #[error("head subscription unavailable: {0}")]
    Subscription(String),
}

impl UpstreamError {
    /// Returns true if the requested entity does not exist upstream.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::BlockNotFound(_) | Self::TransactionNotFound(_))
    }

    /// Returns true if retrying the same request may succeed.
    ///
    /// Not-found answers are transient as well: the scanner asks for heights the node may
    /// not have imported yet.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Rpc(err) => matches!(err, RpcError::Transport(_) | RpcError::NullResp),
            Self::Timeout(_) |
            Self::Subscription(_) |
            Self::BlockNotFound(_) |
            Self::TransactionNotFound(_) => true,
        }
    }
}
