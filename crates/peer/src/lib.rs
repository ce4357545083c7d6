#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]

//! Peer request/response networking for Cerulean.
//!
//! [`Network`] brokers application-level requests across the validator
//! network: outbound requests take a slot in a bounded semaphore and register
//! a response handler under a fresh (even) request id; inbound traffic is
//! decoded through a pluggable codec and routed to the registered request and
//! gossip handlers, with anything undecodable forwarded to a coexisting
//! fallback router. Request timeouts are enforced by the message bus itself;
//! this layer only bounds its own handling time.

pub mod error;
pub mod handler;
pub mod network;
pub mod stats;
pub mod tracker;

pub use error::{HandlerError, NetworkError, SenderError};
pub use handler::{
    GossipHandler, NoopGossipHandler, NoopRequestHandler, RequestHandler, ResponseHandler,
};
pub use network::{AppHandler, AppSender, Network, MIN_REQUEST_HANDLING_DURATION};
pub use stats::RequestHandlerStats;
pub use tracker::PeerTracker;
