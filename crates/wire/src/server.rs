//! Server half: accepts connections, performs the `Startup` handshake, then
//! services control messages one at a time per connection while streaming
//! worker results back as `Blob`/`MultiBlob` frames. One Tokio task per
//! connection, plus one dedicated writer task per connection that owns the
//! socket's write half; `List` requests run on their own spawned task too,
//! so the connection's read loop never blocks on one and stays free to read
//! (and act on) a `Stop` frame while a listing is still streaming.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use fdb_core::ListElement;

use crate::codec;
use crate::error::WireError;
use crate::handler::RemoteHandler;
use crate::message::{Envelope, MessageBody, StartupPayload, PROTOCOL_VERSION};

/// The streamed-result batch size inside one `MultiBlob` frame, trading
/// per-frame overhead against responsiveness for the client's iterator.
const BATCH_SIZE: usize = 256;

pub struct WireServer<H> {
    handler: Arc<H>,
}

impl<H: RemoteHandler> WireServer<H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    pub async fn bind(&self, addr: SocketAddr) -> Result<(), WireError> {
        let listener = TcpListener::bind(addr).await?;
        loop {
            let (socket, peer) = listener.accept().await?;
            tracing::info!(%peer, "accepted wire connection");
            let handler = self.handler.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(socket, handler).await {
                    tracing::warn!(%peer, error = %e, "wire connection closed with an error");
                }
            });
        }
    }
}

type Writer = SplitSink<Framed<TcpStream, LengthDelimitedCodec>, Bytes>;

async fn serve_connection<H: RemoteHandler>(socket: TcpStream, handler: Arc<H>) -> Result<(), WireError> {
    let (sink, mut stream) = codec::framed(socket).split();
    let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(64);
    let writer = tokio::spawn(drive_writer(sink, out_rx));

    let hello = stream.next().await.ok_or(WireError::ConnectionClosed)??;
    let hello = codec::decode(&hello)?;
    let client_session = match &hello.body {
        MessageBody::Startup(p) => p.client_session,
        _ => return Err(WireError::Handshake("first frame was not Startup".into())),
    };

    let ack = Envelope::new(
        hello.client_id,
        hello.request_id,
        true,
        MessageBody::Startup(StartupPayload {
            client_session,
            server_session: Some(rand_session_id()),
            control_endpoint: None,
            data_endpoint: None,
            protocol_version: PROTOCOL_VERSION,
            capabilities: Vec::new(),
        }),
    );
    send_frame(&out_tx, &ack).await?;

    let mut workers: HashMap<u64, tokio::task::JoinHandle<()>> = HashMap::new();

    while let Some(frame) = stream.next().await {
        let envelope = codec::decode(&frame?)?;
        match envelope.body {
            MessageBody::Exit => break,
            MessageBody::Stop => {
                if let Some(handle) = workers.remove(&envelope.request_id) {
                    handle.abort();
                }
                let done = Envelope::new(envelope.client_id, envelope.request_id, true, MessageBody::Complete);
                send_frame(&out_tx, &done).await?;
            }
            MessageBody::List { request, deduplicate } => {
                workers.retain(|_, handle| !handle.is_finished());
                let h = handler.clone();
                let out = out_tx.clone();
                let client_id = envelope.client_id;
                let request_id = envelope.request_id;
                let join = tokio::spawn(async move {
                    let result = h.list(request, deduplicate).await;
                    let _ = stream_list_result(&out, client_id, request_id, result).await;
                });
                workers.insert(envelope.request_id, join);
            }
            MessageBody::Inspect { chain } => {
                let result = handler.inspect(chain).await;
                respond_single(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Read { chain } => {
                let result = handler.read(chain).await;
                respond_single(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Archive { chain, data } => {
                let result = handler.archive(chain, data).await;
                respond_unit(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Flush => {
                let result = handler.flush().await;
                respond_unit(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Wipe { request, dry_run } => {
                let result = handler.wipe(request, dry_run).await;
                respond_single(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Purge { request, dry_run } => {
                let result = handler.purge(request, dry_run).await;
                respond_single(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Control { action, request, enabled } => {
                let result = handler.control(action, request, enabled).await;
                respond_unit(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Dump { request } => {
                let result = handler.list(request, false).await;
                respond_single(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Status => {
                let result = handler.status().await;
                respond_single(&out_tx, envelope.client_id, envelope.request_id, result).await?;
            }
            MessageBody::Startup(_) | MessageBody::Blob(_) | MessageBody::MultiBlob(_) | MessageBody::Complete | MessageBody::Received | MessageBody::Error(_) => {
                let err = Envelope::new(envelope.client_id, envelope.request_id, true, MessageBody::Error("unexpected message kind from client".into()));
                send_frame(&out_tx, &err).await?;
            }
        }
    }

    for (_, handle) in workers {
        handle.abort();
    }
    drop(out_tx);
    let _ = writer.await;

    Ok(())
}

/// Owns the connection's write half for its whole lifetime, serializing
/// every outgoing frame -- from the read loop and from spawned `List`
/// workers alike -- onto the one socket, since `Framed`'s sink half can't
/// be written to concurrently from two tasks.
async fn drive_writer(mut sink: Writer, mut out_rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(frame_bytes) = out_rx.recv().await {
        if sink.send(frame_bytes.into()).await.is_err() {
            break;
        }
    }
}

async fn send_frame(out: &mpsc::Sender<Vec<u8>>, envelope: &Envelope) -> Result<(), WireError> {
    let bytes = codec::encode(envelope)?;
    out.send(bytes).await.map_err(|_| WireError::ConnectionClosed)
}

async fn stream_list_result(out: &mpsc::Sender<Vec<u8>>, client_id: u64, request_id: u64, result: Result<Vec<ListElement>, String>) -> Result<(), WireError> {
    match result {
        Ok(elements) => {
            for chunk in elements.chunks(BATCH_SIZE) {
                let encoded: Result<Vec<Vec<u8>>, _> = chunk.iter().map(bincode::serialize).collect();
                let encoded = encoded.map_err(WireError::Codec)?;
                let frame = Envelope::new(client_id, request_id, false, MessageBody::MultiBlob(encoded));
                send_frame(out, &frame).await?;
            }
            let done = Envelope::new(client_id, request_id, true, MessageBody::Complete);
            send_frame(out, &done).await?;
        }
        Err(e) => {
            let err = Envelope::new(client_id, request_id, true, MessageBody::Error(e));
            send_frame(out, &err).await?;
        }
    }
    Ok(())
}

async fn respond_single<R>(out: &mpsc::Sender<Vec<u8>>, client_id: u64, request_id: u64, result: Result<R, String>) -> Result<(), WireError>
where
    R: serde::Serialize,
{
    let body = match result {
        Ok(value) => {
            let bytes = bincode::serialize(&value).map_err(WireError::Codec)?;
            MessageBody::Blob(bytes)
        }
        Err(e) => MessageBody::Error(e),
    };
    let frame = Envelope::new(client_id, request_id, true, body);
    send_frame(out, &frame).await?;
    let done = Envelope::new(client_id, request_id, true, MessageBody::Complete);
    send_frame(out, &done).await?;
    Ok(())
}

async fn respond_unit(out: &mpsc::Sender<Vec<u8>>, client_id: u64, request_id: u64, result: Result<(), String>) -> Result<(), WireError> {
    let body = match result {
        Ok(()) => MessageBody::Received,
        Err(e) => MessageBody::Error(e),
    };
    let frame = Envelope::new(client_id, request_id, true, body);
    send_frame(out, &frame).await?;
    Ok(())
}

fn rand_session_id() -> u64 {
    uuid::Uuid::new_v4().as_u128() as u64
}
