use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Codec(#[from] Box<bincode::ErrorKind>),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("protocol version {client} is not compatible with server version {server}")]
    VersionMismatch { client: u32, server: u32 },

    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    #[error("remote returned an error: {0}")]
    Remote(String),

    #[error("request {0} was cancelled")]
    Cancelled(u64),
}
