//! The request/response network.
//!
//! Outbound: every request holds one permit of a weighted semaphore for its
//! whole lifetime. The permit lives inside the outstanding-request entry, so
//! releasing it exactly once is structural: removing the entry (on response,
//! failure, dispatch error, or shutdown) drops the permit.
//!
//! Inbound: payloads decode through the pluggable codec; frames this
//! subsystem does not understand are forwarded verbatim to the fallback
//! router that shares the message bus (and owns the odd request-id space).

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use cerulean_types::{
    message::{Gossip, Request},
    Codec, NodeId, NodeVersion,
};
use tokio::{
    sync::{Mutex, OwnedSemaphorePermit, Semaphore},
    time::{timeout_at, Instant},
};
use tracing::{debug, error};

use crate::{
    error::{NetworkError, SenderError},
    handler::{
        dispatch_gossip, dispatch_request, GossipHandler, NoopGossipHandler, NoopRequestHandler,
        RequestHandler, ResponseHandler,
    },
    stats::RequestHandlerStats,
    tracker::PeerTracker,
};

/// Minimum amount of time we are willing to spend handling an inbound
/// request. Anything with less headroom is dropped up front.
pub const MIN_REQUEST_HANDLING_DURATION: Duration = Duration::from_millis(100);

/// The message bus the validator host exposes to this subsystem. Request
/// timeouts are enforced by the bus; a dispatched request is eventually
/// answered with exactly one of `app_response` or `app_request_failed`.
#[async_trait]
pub trait AppSender: Send + Sync {
    async fn send_app_request(
        &self,
        node_ids: HashSet<NodeId>,
        request_id: u32,
        request: Bytes,
    ) -> Result<(), SenderError>;

    async fn send_app_response(
        &self,
        node_id: NodeId,
        request_id: u32,
        response: Bytes,
    ) -> Result<(), SenderError>;

    async fn send_app_gossip(&self, gossip: Bytes) -> Result<(), SenderError>;
}

/// The inbound surface the host engine drives, also implemented by the
/// fallback router this network forwards unknown traffic to. Errors returned
/// from these methods are fatal to the engine.
#[async_trait]
pub trait AppHandler: Send + Sync {
    async fn app_request(
        &self,
        node_id: NodeId,
        request_id: u32,
        deadline: Instant,
        request: Bytes,
    ) -> Result<(), NetworkError>;

    async fn app_response(
        &self,
        node_id: NodeId,
        request_id: u32,
        response: Bytes,
    ) -> Result<(), NetworkError>;

    async fn app_request_failed(
        &self,
        node_id: NodeId,
        request_id: u32,
        app_err: SenderError,
    ) -> Result<(), NetworkError>;

    async fn app_gossip(&self, node_id: NodeId, gossip: Bytes) -> Result<(), NetworkError>;

    async fn connected(
        &self,
        node_id: NodeId,
        version: NodeVersion,
    ) -> Result<(), NetworkError>;

    async fn disconnected(&self, node_id: NodeId) -> Result<(), NetworkError>;
}

struct OutstandingRequest {
    handler: Box<dyn ResponseHandler>,
    /// Dropping the entry returns the request's slot to the semaphore.
    _permit: OwnedSemaphorePermit,
}

struct Inner {
    request_id_gen: u32,
    outstanding: HashMap<u32, OutstandingRequest>,
    request_handler: Arc<dyn RequestHandler>,
    gossip_handler: Arc<dyn GossipHandler>,
    peers: PeerTracker,
}

impl Inner {
    /// Explicitly even request ids: the generator starts at zero and advances
    /// by two, leaving the odd space to the fallback router so the two can
    /// never hand out colliding ids.
    fn next_request_id(&mut self) -> u32 {
        let next = self.request_id_gen;
        self.request_id_gen = self.request_id_gen.wrapping_add(2);
        next
    }
}

/// Concurrency-bounded request/response broker over [`AppSender`].
pub struct Network<C> {
    codec: C,
    app_sender: Arc<dyn AppSender>,
    fallback: Arc<dyn AppHandler>,
    self_id: NodeId,
    active_requests: Arc<Semaphore>,
    stats: RequestHandlerStats,
    /// One-way flag. The lock is still required when sending requests so the
    /// network cannot close between handler registration and dispatch; a
    /// registered request must always be fulfilled or cancelled.
    closed: AtomicBool,
    inner: Mutex<Inner>,
}

impl<C> Network<C>
where
    C: Codec<Request> + Codec<Gossip> + Send + Sync,
{
    pub fn new(
        app_sender: Arc<dyn AppSender>,
        fallback: Arc<dyn AppHandler>,
        codec: C,
        self_id: NodeId,
        max_active_requests: usize,
        stats: RequestHandlerStats,
    ) -> Self {
        Self {
            codec,
            app_sender,
            fallback,
            self_id,
            active_requests: Arc::new(Semaphore::new(max_active_requests)),
            stats,
            closed: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                request_id_gen: 0,
                outstanding: HashMap::new(),
                request_handler: Arc::new(NoopRequestHandler),
                gossip_handler: Arc::new(NoopGossipHandler),
                peers: PeerTracker::new(),
            }),
        }
    }

    /// Send `request` to `node_id`, notifying `handler` on response or
    /// failure.
    pub async fn send_app_request(
        &self,
        node_id: NodeId,
        request: Bytes,
        handler: Box<dyn ResponseHandler>,
    ) -> Result<(), NetworkError> {
        if node_id.is_empty() {
            return Err(NetworkError::EmptyNodeId);
        }
        // Take a slot from the active-request budget; blocks until one frees
        // up. Callers cancel by dropping the future.
        let permit = self.acquire_slot().await?;
        let mut inner = self.inner.lock().await;
        self.dispatch(&mut inner, permit, node_id, request, handler).await
    }

    /// Send `request` to an arbitrary connected peer with a version of at
    /// least `min_version` (any peer when `None`). Returns the chosen peer.
    pub async fn send_app_request_any(
        &self,
        min_version: Option<NodeVersion>,
        request: Bytes,
        handler: Box<dyn ResponseHandler>,
    ) -> Result<NodeId, NetworkError> {
        let permit = self.acquire_slot().await?;
        let mut inner = self.inner.lock().await;
        if let Some(node_id) = inner.peers.get_any_peer(min_version.as_ref()) {
            self.dispatch(&mut inner, permit, node_id, request, handler).await?;
            return Ok(node_id);
        }
        let peer_count = inner.peers.size();
        drop(permit);
        Err(NetworkError::NoPeersMatchingVersion { min_version, peer_count })
    }

    /// Broadcast pre-encoded gossip bytes.
    pub async fn gossip(&self, gossip: Bytes) -> Result<(), NetworkError> {
        self.app_sender.send_app_gossip(gossip).await.map_err(NetworkError::Send)
    }

    async fn acquire_slot(&self) -> Result<OwnedSemaphorePermit, NetworkError> {
        self.active_requests
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| NetworkError::AcquiringSemaphore)
    }

    /// Register the handler under a fresh request id and hand the request to
    /// the bus. Runs under the write lock; on dispatch failure the entry is
    /// removed again, releasing its slot.
    async fn dispatch(
        &self,
        inner: &mut Inner,
        permit: OwnedSemaphorePermit,
        node_id: NodeId,
        request: Bytes,
        handler: Box<dyn ResponseHandler>,
    ) -> Result<(), NetworkError> {
        if self.closed.load(Ordering::Acquire) {
            drop(permit);
            return Ok(());
        }
        debug!(%node_id, request_len = request.len(), "sending request to peer");
        inner.peers.track_peer(node_id);

        let request_id = inner.next_request_id();
        let request_len = request.len();
        inner.outstanding.insert(request_id, OutstandingRequest { handler, _permit: permit });

        // Once the bus accepts the request, cancellation of the caller no
        // longer reaches it; the bus guarantees a response or a failure for
        // everything it accepted.
        if let Err(err) = self
            .app_sender
            .send_app_request(HashSet::from([node_id]), request_id, request)
            .await
        {
            error!(%node_id, request_id, request_len, %err, "request to peer failed");
            inner.outstanding.remove(&request_id);
            return Err(NetworkError::Send(err));
        }
        debug!(%node_id, request_id, "sent request message to peer");
        Ok(())
    }

    /// Take the handler for `request_id`, marking the request fulfilled.
    async fn mark_request_fulfilled(&self, request_id: u32) -> Option<OutstandingRequest> {
        self.inner.lock().await.outstanding.remove(&request_id)
    }

    /// Half the remaining time, so a response still has a reasonable chance
    /// of reaching the peer before its actual deadline. `None` when not even
    /// the minimum handling duration is left.
    fn buffered_deadline(&self, deadline: Instant) -> Option<Instant> {
        let now = Instant::now();
        let time_until_deadline = deadline.saturating_duration_since(now);
        self.stats.observe_time_until_deadline(time_until_deadline);

        let headroom = time_until_deadline / 2;
        if headroom < MIN_REQUEST_HANDLING_DURATION {
            self.stats.inc_deadline_dropped();
            return None;
        }
        Some(now + headroom)
    }

    /// Register the handler for inbound requests.
    pub async fn set_request_handler(&self, handler: Arc<dyn RequestHandler>) {
        self.inner.lock().await.request_handler = handler;
    }

    /// Register the handler for inbound gossip.
    pub async fn set_gossip_handler(&self, handler: Arc<dyn GossipHandler>) {
        self.inner.lock().await.gossip_handler = handler;
    }

    /// Number of connected peers.
    pub async fn size(&self) -> usize {
        self.inner.lock().await.peers.size()
    }

    /// Record a bandwidth observation for `node_id`: response bytes over
    /// elapsed time, or zero for an invalid response.
    pub async fn track_bandwidth(&self, node_id: NodeId, bandwidth: f64) {
        self.inner.lock().await.peers.track_bandwidth(node_id, bandwidth);
    }

    /// Remaining outbound request slots; observability and tests.
    pub fn available_request_capacity(&self) -> usize {
        self.active_requests.available_permits()
    }

    /// Fail every outstanding request, reset the peer set, and mark the
    /// network closed. All further operations are no-ops that release their
    /// resources.
    pub async fn shutdown(&self) {
        let drained: Vec<OutstandingRequest> = {
            let mut inner = self.inner.lock().await;
            self.closed.store(true, Ordering::Release);
            inner.peers = PeerTracker::new();
            inner.outstanding.drain().map(|(_, outstanding)| outstanding).collect()
        };
        // Refuse new slots and unblock anyone waiting to acquire one.
        self.active_requests.close();
        // Exactly one failure delivery per outstanding handler, off-lock;
        // dropping each entry returns its slot.
        for outstanding in drained {
            let _ = outstanding.handler.on_failure();
        }
    }
}

#[async_trait]
impl<C> AppHandler for Network<C>
where
    C: Codec<Request> + Codec<Gossip> + Send + Sync,
{
    /// Inbound request from the bus. Fatal errors returned from here tear the
    /// engine down; running out of handling time is not fatal.
    async fn app_request(
        &self,
        node_id: NodeId,
        request_id: u32,
        deadline: Instant,
        request: Bytes,
    ) -> Result<(), NetworkError> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        debug!(%node_id, request_id, request_len = request.len(), "received AppRequest from peer");

        let decoded = match <C as Codec<Request>>::decode(&self.codec, &request) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(%node_id, request_id, %err, "forwarding AppRequest to fallback router");
                return self.fallback.app_request(node_id, request_id, deadline, request).await;
            }
        };
        let Some(buffered_deadline) = self.buffered_deadline(deadline) else {
            debug!(%node_id, request_id, "deadline to process AppRequest has expired, skipping");
            return Ok(());
        };

        debug!(%node_id, request_id, "processing incoming request");
        let handler = self.inner.lock().await.request_handler.clone();
        let handled = timeout_at(
            buffered_deadline,
            dispatch_request(decoded, node_id, request_id, handler.as_ref()),
        )
        .await;
        match handled {
            // The handler overran its deadline; the peer gave up on us
            // already, nothing else is wrong.
            Err(_elapsed) => Ok(()),
            Ok(Err(err)) => Err(NetworkError::Handler(err)),
            Ok(Ok(response)) if !response.is_empty() => self
                .app_sender
                .send_app_response(node_id, request_id, response)
                .await
                .map_err(NetworkError::Send),
            Ok(Ok(_)) => Ok(()),
        }
    }

    /// Response from a peer for one of our outstanding requests. Unknown ids
    /// belong to the fallback router.
    async fn app_response(
        &self,
        node_id: NodeId,
        request_id: u32,
        response: Bytes,
    ) -> Result<(), NetworkError> {
        debug!(%node_id, request_id, "received AppResponse from peer");

        let Some(outstanding) = self.mark_request_fulfilled(request_id).await else {
            debug!(%node_id, request_id, response_len = response.len(), "forwarding AppResponse to fallback router");
            return self.fallback.app_response(node_id, request_id, response).await;
        };
        // Delivered outside the lock; dropping the entry afterwards releases
        // its slot.
        outstanding.handler.on_response(response).map_err(NetworkError::Handler)
    }

    /// The bus gave up on one of our requests: the peer is unreachable,
    /// benched, or timed out.
    async fn app_request_failed(
        &self,
        node_id: NodeId,
        request_id: u32,
        app_err: SenderError,
    ) -> Result<(), NetworkError> {
        debug!(%node_id, request_id, %app_err, "received AppRequestFailed from peer");

        let Some(outstanding) = self.mark_request_fulfilled(request_id).await else {
            debug!(%node_id, request_id, "forwarding AppRequestFailed to fallback router");
            return self.fallback.app_request_failed(node_id, request_id, app_err).await;
        };
        outstanding.handler.on_failure().map_err(NetworkError::Handler)
    }

    async fn app_gossip(&self, node_id: NodeId, gossip: Bytes) -> Result<(), NetworkError> {
        let decoded = match <C as Codec<Gossip>>::decode(&self.codec, &gossip) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(%node_id, gossip_len = gossip.len(), %err, "forwarding AppGossip to fallback router");
                return self.fallback.app_gossip(node_id, gossip).await;
            }
        };
        debug!(%node_id, "processing AppGossip from peer");
        let handler = self.inner.lock().await.gossip_handler.clone();
        dispatch_gossip(decoded, node_id, handler.as_ref()).await.map_err(NetworkError::Handler)
    }

    async fn connected(
        &self,
        node_id: NodeId,
        version: NodeVersion,
    ) -> Result<(), NetworkError> {
        debug!(%node_id, %version, "adding new peer");
        let mut inner = self.inner.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        if node_id != self.self_id {
            // The tracker never contains this node itself.
            inner.peers.connected(node_id, version);
        }
        self.fallback.connected(node_id, version).await
    }

    async fn disconnected(&self, node_id: NodeId) -> Result<(), NetworkError> {
        debug!(%node_id, "disconnecting peer");
        let mut inner = self.inner.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }
        if node_id != self.self_id {
            inner.peers.disconnected(&node_id);
        }
        self.fallback.disconnected(node_id).await
    }
}
