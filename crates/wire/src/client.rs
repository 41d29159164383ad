//! Client half: one TCP connection per [`WireClient`], control messages
//! sent and awaited one at a time (serialized behind an internal mutex --
//! this workspace has no concurrent multi-request pipelining requirement),
//! streamed results drained until `Complete`/`Error`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use fdb_core::{FieldLocation, KeyChain, ListElement, Request};

use crate::codec;
use crate::error::WireError;
use crate::message::{Envelope, MessageBody, StartupPayload, PROTOCOL_VERSION};

pub struct WireClient {
    client_id: u64,
    next_request_id: AtomicU64,
    conn: Mutex<Framed<TcpStream, LengthDelimitedCodec>>,
}

impl WireClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, WireError> {
        let socket = TcpStream::connect(addr).await?;
        let mut framed = codec::framed(socket);

        let client_id = uuid::Uuid::new_v4().as_u128() as u64;
        let hello = Envelope::new(
            client_id,
            0,
            true,
            MessageBody::Startup(StartupPayload {
                client_session: client_id,
                server_session: None,
                control_endpoint: None,
                data_endpoint: None,
                protocol_version: PROTOCOL_VERSION,
                capabilities: Vec::new(),
            }),
        );
        framed.send(codec::encode(&hello)?.into()).await?;

        let reply = framed.next().await.ok_or(WireError::ConnectionClosed)??;
        let reply = codec::decode(&reply)?;
        match reply.body {
            MessageBody::Startup(ack) if ack.protocol_version == PROTOCOL_VERSION => {}
            MessageBody::Startup(ack) => {
                return Err(WireError::VersionMismatch { client: PROTOCOL_VERSION, server: ack.protocol_version });
            }
            MessageBody::Error(e) => return Err(WireError::Handshake(e)),
            _ => return Err(WireError::Handshake("unexpected reply to Startup".into())),
        }

        Ok(Self { client_id, next_request_id: AtomicU64::new(1), conn: Mutex::new(framed) })
    }

    fn request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn roundtrip(&self, body: MessageBody) -> Result<MessageBody, WireError> {
        let request_id = self.request_id();
        let envelope = Envelope::new(self.client_id, request_id, true, body);
        let mut conn = self.conn.lock().await;
        conn.send(codec::encode(&envelope)?.into()).await?;

        loop {
            let frame = conn.next().await.ok_or(WireError::ConnectionClosed)??;
            let reply = codec::decode(&frame)?;
            if reply.request_id != request_id {
                continue;
            }
            match reply.body {
                MessageBody::Error(e) => return Err(WireError::Remote(e)),
                other => return Ok(other),
            }
        }
    }

    /// Drains a streamed result (one or more `MultiBlob`s followed by
    /// `Complete`) for `request_id`, decoding each blob with `decode_one`.
    async fn collect_stream<T>(&self, request_id: u64, mut decode_one: impl FnMut(&[u8]) -> Result<T, WireError>) -> Result<Vec<T>, WireError> {
        let mut conn = self.conn.lock().await;
        let mut out = Vec::new();
        loop {
            let frame = conn.next().await.ok_or(WireError::ConnectionClosed)??;
            let reply = codec::decode(&frame)?;
            if reply.request_id != request_id {
                continue;
            }
            match reply.body {
                MessageBody::MultiBlob(blobs) => {
                    for blob in blobs {
                        out.push(decode_one(&blob)?);
                    }
                }
                MessageBody::Blob(blob) => out.push(decode_one(&blob)?),
                MessageBody::Complete => return Ok(out),
                MessageBody::Error(e) => return Err(WireError::Remote(e)),
                _ => continue,
            }
        }
    }

    pub async fn archive(&self, chain: KeyChain, data: Vec<u8>) -> Result<(), WireError> {
        match self.roundtrip(MessageBody::Archive { chain, data }).await? {
            MessageBody::Received => Ok(()),
            _ => Err(WireError::Remote("unexpected response to Archive".into())),
        }
    }

    pub async fn flush(&self) -> Result<(), WireError> {
        match self.roundtrip(MessageBody::Flush).await? {
            MessageBody::Received => Ok(()),
            _ => Err(WireError::Remote("unexpected response to Flush".into())),
        }
    }

    pub async fn list(&self, request: Request, deduplicate: bool) -> Result<Vec<ListElement>, WireError> {
        let request_id = self.request_id();
        let envelope = Envelope::new(self.client_id, request_id, true, MessageBody::List { request, deduplicate });
        {
            let mut conn = self.conn.lock().await;
            conn.send(codec::encode(&envelope)?.into()).await?;
        }
        self.collect_stream(request_id, |bytes| bincode::deserialize(bytes).map_err(WireError::Codec)).await
    }

    pub async fn inspect(&self, chain: KeyChain) -> Result<Option<FieldLocation>, WireError> {
        match self.roundtrip(MessageBody::Inspect { chain }).await? {
            MessageBody::Blob(bytes) => bincode::deserialize(&bytes).map_err(WireError::Codec),
            _ => Err(WireError::Remote("unexpected response to Inspect".into())),
        }
    }

    pub async fn read(&self, chain: KeyChain) -> Result<Option<Vec<u8>>, WireError> {
        match self.roundtrip(MessageBody::Read { chain }).await? {
            MessageBody::Blob(bytes) => bincode::deserialize(&bytes).map_err(WireError::Codec),
            _ => Err(WireError::Remote("unexpected response to Read".into())),
        }
    }

    pub async fn wipe(&self, request: Request, dry_run: bool) -> Result<Vec<String>, WireError> {
        match self.roundtrip(MessageBody::Wipe { request, dry_run }).await? {
            MessageBody::Blob(bytes) => bincode::deserialize(&bytes).map_err(WireError::Codec),
            _ => Err(WireError::Remote("unexpected response to Wipe".into())),
        }
    }

    pub async fn purge(&self, request: Request, dry_run: bool) -> Result<Vec<String>, WireError> {
        match self.roundtrip(MessageBody::Purge { request, dry_run }).await? {
            MessageBody::Blob(bytes) => bincode::deserialize(&bytes).map_err(WireError::Codec),
            _ => Err(WireError::Remote("unexpected response to Purge".into())),
        }
    }

    pub async fn control(&self, action: String, request: Request, enabled: bool) -> Result<(), WireError> {
        match self.roundtrip(MessageBody::Control { action, request, enabled }).await? {
            MessageBody::Received => Ok(()),
            _ => Err(WireError::Remote("unexpected response to Control".into())),
        }
    }

    pub async fn status(&self) -> Result<String, WireError> {
        match self.roundtrip(MessageBody::Status).await? {
            MessageBody::Blob(bytes) => bincode::deserialize(&bytes).map_err(WireError::Codec),
            _ => Err(WireError::Remote("unexpected response to Status".into())),
        }
    }

    pub async fn exit(&self) -> Result<(), WireError> {
        let envelope = Envelope::new(self.client_id, self.request_id(), true, MessageBody::Exit);
        let mut conn = self.conn.lock().await;
        conn.send(codec::encode(&envelope)?.into()).await?;
        Ok(())
    }
}
