use shared::error::{ApiError, ProtocolError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("engine rejected request: {0}")]
    Rejected(ApiError),
    #[error("connection lost before the engine acknowledged the request")]
    ConnectionLost,
    #[error("invalid engine url: {0}")]
    InvalidUrl(String),
    #[error("failed to connect websocket: {0}")]
    Connect(String),
    #[error("failed to encode request: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
