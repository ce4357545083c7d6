//! Error types for the peer network.

use cerulean_types::NodeVersion;
use thiserror::Error;

/// A transport-level failure reported by the message bus.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SenderError(pub String);

impl SenderError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A failure reported by a request, gossip, or response handler. Treated as
/// fatal by the host engine except where the network explicitly consumes it
/// (deadline overruns).
#[derive(Debug, Error)]
#[error("handler failed: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors surfaced by [`crate::Network`] operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("error acquiring semaphore")]
    AcquiringSemaphore,
    #[error("cannot send request to empty node id")]
    EmptyNodeId,
    #[error("no peers found matching version {min_version:?} out of {peer_count} peers")]
    NoPeersMatchingVersion { min_version: Option<NodeVersion>, peer_count: usize },
    #[error("message bus send failed: {0}")]
    Send(#[source] SenderError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
}
