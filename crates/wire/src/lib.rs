//! Remote dispatch transport: a bespoke framed control+data protocol (not
//! gRPC/tonic -- see `DESIGN.md`) carrying the operations a `Remote`
//! dispatch lane forwards to a remote `fdb-server` process.

pub mod client;
pub mod codec;
pub mod error;
pub mod handler;
pub mod message;
pub mod server;

pub use client::WireClient;
pub use error::WireError;
pub use handler::RemoteHandler;
pub use message::{Envelope, MessageBody, PROTOCOL_VERSION};
pub use server::WireServer;

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use fdb_core::{Axes, FieldLocation, Key, KeyChain, ListElement, Request};

    use super::*;

    struct EchoHandler;

    impl RemoteHandler for EchoHandler {
        async fn archive(&self, _chain: KeyChain, _data: Vec<u8>) -> Result<(), String> {
            Ok(())
        }

        async fn flush(&self) -> Result<(), String> {
            Ok(())
        }

        async fn list(&self, _request: Request, _deduplicate: bool) -> Result<Vec<ListElement>, String> {
            let mut key = Key::new();
            key.set_raw("class", "od");
            let chain = KeyChain::new(key, Key::new(), Key::new()).unwrap();
            Ok(vec![ListElement::new(&chain, Some(FieldLocation::new("file:///x", 0, 4)))])
        }

        async fn inspect(&self, _chain: KeyChain) -> Result<Option<FieldLocation>, String> {
            Ok(Some(FieldLocation::new("file:///x", 0, 4)))
        }

        async fn read(&self, _chain: KeyChain) -> Result<Option<Vec<u8>>, String> {
            Ok(Some(b"data".to_vec()))
        }

        async fn wipe(&self, _request: Request, _dry_run: bool) -> Result<Vec<String>, String> {
            Ok(vec!["file:///x".to_string()])
        }

        async fn purge(&self, _request: Request, _dry_run: bool) -> Result<Vec<String>, String> {
            Ok(Vec::new())
        }

        async fn control(&self, _action: String, _request: Request, _enabled: bool) -> Result<(), String> {
            Ok(())
        }

        async fn axes(&self, _request: Request) -> Result<Axes, String> {
            Ok(Axes::new())
        }

        async fn status(&self) -> Result<String, String> {
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn handshake_then_archive_and_list_round_trip() {
        let handler = Arc::new(EchoHandler);
        let server = WireServer::new(handler);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let bound = listener.local_addr().unwrap();
        drop(listener);

        tokio::spawn(async move {
            server.bind(bound).await.ok();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let client = WireClient::connect(bound).await.unwrap();
        client.archive(sample_chain(), b"hello".to_vec()).await.unwrap();
        let elems = client.list(Request::new(), true).await.unwrap();
        assert_eq!(elems.len(), 1);
    }

    fn sample_chain() -> KeyChain {
        let mut db = Key::new();
        db.set_raw("class", "od");
        KeyChain::new(db, Key::new(), Key::new()).unwrap()
    }
}
