//! Test doubles for the message bus, the fallback router, and the handler
//! seams, all recording their invocations for assertions.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use cerulean_peer::{
    AppHandler, AppSender, GossipHandler, HandlerError, NetworkError, RequestHandler,
    ResponseHandler, SenderError,
};
use cerulean_types::{
    message::{BlockRequest, CodeRequest, SignatureRequest, TxGossip},
    NodeId, NodeVersion,
};
use tokio::time::Instant;

/// Records everything dispatched onto the bus; can be told to refuse
/// requests.
#[derive(Clone, Default)]
pub(crate) struct MockBus {
    pub requests: Arc<Mutex<Vec<(HashSet<NodeId>, u32, Bytes)>>>,
    pub responses: Arc<Mutex<Vec<(NodeId, u32, Bytes)>>>,
    pub gossip: Arc<Mutex<Vec<Bytes>>>,
    pub fail_requests: Arc<AtomicBool>,
}

impl MockBus {
    pub(crate) fn refuse_requests(&self) {
        self.fail_requests.store(true, Ordering::SeqCst);
    }

    pub(crate) fn sent_request_ids(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|(_, id, _)| *id).collect()
    }
}

#[async_trait]
impl AppSender for MockBus {
    async fn send_app_request(
        &self,
        node_ids: HashSet<NodeId>,
        request_id: u32,
        request: Bytes,
    ) -> Result<(), SenderError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(SenderError::new("bus refused the request"));
        }
        self.requests.lock().unwrap().push((node_ids, request_id, request));
        Ok(())
    }

    async fn send_app_response(
        &self,
        node_id: NodeId,
        request_id: u32,
        response: Bytes,
    ) -> Result<(), SenderError> {
        self.responses.lock().unwrap().push((node_id, request_id, response));
        Ok(())
    }

    async fn send_app_gossip(&self, gossip: Bytes) -> Result<(), SenderError> {
        self.gossip.lock().unwrap().push(gossip);
        Ok(())
    }
}

/// Counts traffic forwarded to the coexisting router.
#[derive(Clone, Default)]
pub(crate) struct MockRouter {
    pub requests: Arc<AtomicUsize>,
    pub responses: Arc<AtomicUsize>,
    pub failures: Arc<AtomicUsize>,
    pub gossip: Arc<AtomicUsize>,
    pub connects: Arc<AtomicUsize>,
    pub disconnects: Arc<AtomicUsize>,
}

#[async_trait]
impl AppHandler for MockRouter {
    async fn app_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _deadline: Instant,
        _request: Bytes,
    ) -> Result<(), NetworkError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn app_response(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _response: Bytes,
    ) -> Result<(), NetworkError> {
        self.responses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn app_request_failed(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _app_err: SenderError,
    ) -> Result<(), NetworkError> {
        self.failures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn app_gossip(&self, _node_id: NodeId, _gossip: Bytes) -> Result<(), NetworkError> {
        self.gossip.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn connected(
        &self,
        _node_id: NodeId,
        _version: NodeVersion,
    ) -> Result<(), NetworkError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnected(&self, _node_id: NodeId) -> Result<(), NetworkError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct ResponseRecord {
    responses: Mutex<Vec<Bytes>>,
    failures: AtomicUsize,
    fail_on_response: AtomicBool,
}

/// Response-side callback that records deliveries.
#[derive(Clone, Default)]
pub(crate) struct RecordingResponseHandler(Arc<ResponseRecord>);

impl RecordingResponseHandler {
    pub(crate) fn failing_on_response() -> Self {
        let handler = Self::default();
        handler.0.fail_on_response.store(true, Ordering::SeqCst);
        handler
    }

    pub(crate) fn responses(&self) -> Vec<Bytes> {
        self.0.responses.lock().unwrap().clone()
    }

    pub(crate) fn failure_count(&self) -> usize {
        self.0.failures.load(Ordering::SeqCst)
    }
}

impl ResponseHandler for RecordingResponseHandler {
    fn on_response(&self, response: Bytes) -> Result<(), HandlerError> {
        self.0.responses.lock().unwrap().push(response);
        if self.0.fail_on_response.load(Ordering::SeqCst) {
            return Err(HandlerError::new("waiter rejected the response"));
        }
        Ok(())
    }

    fn on_failure(&self) -> Result<(), HandlerError> {
        self.0.failures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Inbound request handler answering block requests with a fixed payload.
#[derive(Clone)]
pub(crate) struct CannedRequestHandler {
    pub response: Bytes,
    pub calls: Arc<AtomicUsize>,
}

impl CannedRequestHandler {
    pub(crate) fn new(response: Bytes) -> Self {
        Self { response, calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl RequestHandler for CannedRequestHandler {
    async fn handle_block_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _request: BlockRequest,
    ) -> Result<Bytes, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
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

/// Sleeps past any buffered deadline before answering.
#[derive(Clone, Copy)]
pub(crate) struct SlowRequestHandler;

#[async_trait]
impl RequestHandler for SlowRequestHandler {
    async fn handle_block_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _request: BlockRequest,
    ) -> Result<Bytes, HandlerError> {
        tokio::time::sleep(std::time::Duration::from_secs(600)).await;
        Ok(Bytes::from_static(b"too late"))
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

/// Fails every request; the network must treat this as fatal.
#[derive(Clone, Copy)]
pub(crate) struct FailingRequestHandler;

#[async_trait]
impl RequestHandler for FailingRequestHandler {
    async fn handle_block_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _request: BlockRequest,
    ) -> Result<Bytes, HandlerError> {
        Err(HandlerError::new("backend unavailable"))
    }

    async fn handle_code_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _request: CodeRequest,
    ) -> Result<Bytes, HandlerError> {
        Err(HandlerError::new("backend unavailable"))
    }

    async fn handle_signature_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _request: SignatureRequest,
    ) -> Result<Bytes, HandlerError> {
        Err(HandlerError::new("backend unavailable"))
    }
}

/// Records gossip deliveries.
#[derive(Clone, Default)]
pub(crate) struct RecordingGossipHandler {
    pub deliveries: Arc<Mutex<Vec<TxGossip>>>,
}

#[async_trait]
impl GossipHandler for RecordingGossipHandler {
    async fn handle_tx_gossip(
        &self,
        _node_id: NodeId,
        gossip: TxGossip,
    ) -> Result<(), HandlerError> {
        self.deliveries.lock().unwrap().push(gossip);
        Ok(())
    }
}
