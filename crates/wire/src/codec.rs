//! Frames a raw TCP stream into length-prefixed [`Envelope`]s. Wraps
//! `tokio_util::codec::LengthDelimitedCodec` (4-byte big-endian length
//! prefix) around `bincode`-encoded envelopes, matching the corpus's
//! `bincode` on-disk/wire framing convention (`dolos_core`'s journal
//! records use the same codec for persistence; here it carries messages
//! instead of log entries).

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::WireError;
use crate::message::Envelope;

pub fn framed<T>(io: T) -> Framed<T, LengthDelimitedCodec>
where
    T: AsyncRead + AsyncWrite,
{
    Framed::new(io, LengthDelimitedCodec::new())
}

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, WireError> {
    bincode::serialize(envelope).map_err(WireError::Codec)
}

pub fn decode(bytes: &[u8]) -> Result<Envelope, WireError> {
    bincode::deserialize(bytes).map_err(WireError::Codec)
}
