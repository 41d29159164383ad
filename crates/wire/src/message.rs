//! Wire message shapes, matching the protocol's literal message-kind set.
//! Every frame on the connection is one [`Envelope`]; `control` messages
//! (handshake, `List`/`Wipe`/`Purge`/...) are blocking request/response,
//! `data` messages (`Blob`/`MultiBlob`) stream without waiting for a
//! reply -- the client merges them into a local queue feeding its
//! iterator, per §4.5.
//!
//! A streamed result (`list`, `retrieve`) is not given its own message
//! kind: each item is `bincode`-encoded by the caller and carried inside a
//! `Blob`/`MultiBlob` payload, since the client already knows which result
//! type a given request implies.

use serde::{Deserialize, Serialize};

use fdb_core::{KeyChain, Request};

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub client_id: u64,
    pub request_id: u64,
    pub control: bool,
    pub body: MessageBody,
}

impl Envelope {
    pub fn new(client_id: u64, request_id: u64, control: bool, body: MessageBody) -> Self {
        Self { client_id, request_id, control, body }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupPayload {
    pub client_session: u64,
    pub server_session: Option<u64>,
    pub control_endpoint: Option<String>,
    pub data_endpoint: Option<String>,
    pub protocol_version: u32,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessageBody {
    Startup(StartupPayload),
    Exit,
    Stop,
    List { request: Request, deduplicate: bool },
    Inspect { chain: KeyChain },
    Dump { request: Request },
    Status,
    Wipe { request: Request, dry_run: bool },
    Purge { request: Request, dry_run: bool },
    Control { action: String, request: Request, enabled: bool },
    Archive { chain: KeyChain, data: Vec<u8> },
    Flush,
    Read { chain: KeyChain },
    Blob(Vec<u8>),
    MultiBlob(Vec<Vec<u8>>),
    Complete,
    Received,
    Error(String),
}
