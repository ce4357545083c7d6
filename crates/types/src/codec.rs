//! Pluggable wire codec.
//!
//! The peer network frames every request and gossip payload through a codec so
//! that the envelope format can evolve independently of the transport. A
//! message that fails to decode is not an error at the network layer: it is
//! forwarded to the fallback router, which may understand a newer (or older)
//! framing.

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(#[source] bincode::Error),
    #[error("decode failed: {0}")]
    Decode(#[source] bincode::Error),
}

/// Encode/decode one message type to and from wire bytes.
pub trait Codec<T>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn encode(&self, msg: &T) -> Result<Bytes, Self::Error>;
    fn decode(&self, bytes: &[u8]) -> Result<T, Self::Error>;
}

/// The default codec: compact serde framing via bincode.
#[derive(Copy, Clone, Debug, Default)]
pub struct BincodeCodec;

impl<T> Codec<T> for BincodeCodec
where
    T: Serialize + DeserializeOwned,
{
    type Error = CodecError;

    fn encode(&self, msg: &T) -> Result<Bytes, Self::Error> {
        bincode::serialize(msg).map(Bytes::from).map_err(CodecError::Encode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, Self::Error> {
        bincode::deserialize(bytes).map_err(CodecError::Decode)
    }
}
