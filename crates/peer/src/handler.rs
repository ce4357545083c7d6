//! Handler seams for inbound and outbound message traffic.

use async_trait::async_trait;
use bytes::Bytes;
use cerulean_types::{
    message::{BlockRequest, CodeRequest, Gossip, Request, SignatureRequest, TxGossip},
    NodeId,
};

use crate::error::HandlerError;

/// Callback registered for one outstanding outbound request. Exactly one of
/// the two methods is invoked, exactly once: `on_response` when the peer
/// answers, `on_failure` when the request fails or the network shuts down.
pub trait ResponseHandler: Send + Sync {
    fn on_response(&self, response: Bytes) -> Result<(), HandlerError>;
    fn on_failure(&self) -> Result<(), HandlerError>;
}

/// Serves decoded inbound requests. Each method returns the encoded response
/// payload; an empty payload means no response is sent.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle_block_request(
        &self,
        node_id: NodeId,
        request_id: u32,
        request: BlockRequest,
    ) -> Result<Bytes, HandlerError>;

    async fn handle_code_request(
        &self,
        node_id: NodeId,
        request_id: u32,
        request: CodeRequest,
    ) -> Result<Bytes, HandlerError>;

    async fn handle_signature_request(
        &self,
        node_id: NodeId,
        request_id: u32,
        request: SignatureRequest,
    ) -> Result<Bytes, HandlerError>;
}

/// Serves decoded inbound gossip.
#[async_trait]
pub trait GossipHandler: Send + Sync {
    async fn handle_tx_gossip(&self, node_id: NodeId, gossip: TxGossip)
        -> Result<(), HandlerError>;
}

/// Installed at construction until the host registers a real handler.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRequestHandler;

#[async_trait]
impl RequestHandler for NoopRequestHandler {
    async fn handle_block_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _request: BlockRequest,
    ) -> Result<Bytes, HandlerError> {
        Ok(Bytes::new())
    }

    async fn handle_code_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _request: CodeRequest,
    ) -> Result<Bytes, HandlerError> {
        Ok(Bytes::new())
    }

    async fn handle_signature_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _request: SignatureRequest,
    ) -> Result<Bytes, HandlerError> {
        Ok(Bytes::new())
    }
}

/// Drops all gossip until the host registers a real handler.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopGossipHandler;

#[async_trait]
impl GossipHandler for NoopGossipHandler {
    async fn handle_tx_gossip(
        &self,
        _node_id: NodeId,
        _gossip: TxGossip,
    ) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Route a decoded request envelope to the matching handler method.
pub(crate) async fn dispatch_request(
    request: Request,
    node_id: NodeId,
    request_id: u32,
    handler: &dyn RequestHandler,
) -> Result<Bytes, HandlerError> {
    match request {
        Request::Blocks(request) => handler.handle_block_request(node_id, request_id, request).await,
        Request::Code(request) => handler.handle_code_request(node_id, request_id, request).await,
        Request::Signature(request) => {
            handler.handle_signature_request(node_id, request_id, request).await
        }
    }
}

/// Route a decoded gossip envelope to the matching handler method.
pub(crate) async fn dispatch_gossip(
    gossip: Gossip,
    node_id: NodeId,
    handler: &dyn GossipHandler,
) -> Result<(), HandlerError> {
    match gossip {
        Gossip::Txs(gossip) => handler.handle_tx_gossip(node_id, gossip).await,
    }
}
