use thiserror::Error;

use crate::protocol::CommandId;

/// Problems found while pulling a frame out of received bytes.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameError {
    /// Bad marker, length or checksum. The bytes should be thrown away.
    #[error("corrupt frame")]
    Corrupt,
    /// The frame looks fine so far but its declared length hasn't arrived yet.
    #[error("incomplete frame")]
    Incomplete,
}

/// A response arrived that doesn't answer the command we're waiting on.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProtocolError {
    #[error("expected response {expected}, received {received}")]
    UnexpectedResponse {
        expected: CommandId,
        received: CommandId,
    },
}

/// The unit never finished the handshake. Terminal for the session.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
pub enum InitializationError {
    #[error("initialization did not complete in time")]
    Timeout,
}

/// The set queue already holds the maximum number of distinct keys.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
#[error("set command queue is full")]
pub struct CommandQueueFull;

/// A payload didn't fit in the output buffer.
#[derive(Error, Clone, Copy, Debug, Eq, PartialEq)]
#[error("payload does not fit in the output buffer")]
pub struct EncodingError;
