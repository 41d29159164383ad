//! [`RemoteDispatch`]: forwards every operation to a remote `fdb-server`
//! over [`fdb_wire::WireClient`]. The dispatch layer's public surface is
//! synchronous (it is called from the same blocking-call model as the
//! rest of the system), so each method borrows the ambient tokio runtime
//! and blocks on the client's async call, the same bridge an async
//! connection pool wrapped in a sync-facing facade uses elsewhere in this
//! workspace.

use std::net::SocketAddr;

use fdb_core::config::RemoteDispatchConfig;
use fdb_core::{FieldLocation, KeyChain, ListElement, Request};
use fdb_wire::WireClient;

use crate::error::FdbError;

pub struct RemoteDispatch {
    client: WireClient,
}

impl RemoteDispatch {
    pub fn connect(config: &RemoteDispatchConfig) -> Result<Self, FdbError> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| FdbError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        let rt = tokio::runtime::Handle::try_current().map_err(|e| FdbError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        let client = rt.block_on(WireClient::connect(addr))?;
        Ok(Self { client })
    }

    fn block_on<F: std::future::Future>(&self, fut: F) -> Result<F::Output, FdbError> {
        let rt = tokio::runtime::Handle::try_current().map_err(|e| FdbError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(rt.block_on(fut))
    }

    pub fn archive(&self, chain: &KeyChain, data: &[u8]) -> Result<(), FdbError> {
        self.block_on(self.client.archive(chain.clone(), data.to_vec()))??;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), FdbError> {
        self.block_on(self.client.flush())??;
        Ok(())
    }

    pub fn list(&self, request: &Request, deduplicate: bool) -> Result<Vec<ListElement>, FdbError> {
        Ok(self.block_on(self.client.list(request.clone(), deduplicate))??)
    }

    pub fn inspect(&self, chain: &KeyChain) -> Result<Option<FieldLocation>, FdbError> {
        Ok(self.block_on(self.client.inspect(chain.clone()))??)
    }

    pub fn read(&self, chain: &KeyChain) -> Result<Option<Vec<u8>>, FdbError> {
        Ok(self.block_on(self.client.read(chain.clone()))??)
    }

    pub fn wipe(&self, request: &Request, dry_run: bool) -> Result<Vec<String>, FdbError> {
        Ok(self.block_on(self.client.wipe(request.clone(), dry_run))??)
    }

    pub fn purge(&self, request: &Request, dry_run: bool) -> Result<Vec<String>, FdbError> {
        Ok(self.block_on(self.client.purge(request.clone(), dry_run))??)
    }

    pub fn control(&self, action: String, request: &Request, enabled: bool) -> Result<(), FdbError> {
        self.block_on(self.client.control(action, request.clone(), enabled))??;
        Ok(())
    }

    /// Axes summaries are computed locally by whichever lane owns a
    /// database; there is no wire message kind for them, so a remote lane
    /// cannot answer this directly.
    pub fn axes(&self, _request: &Request) -> Result<fdb_core::Axes, FdbError> {
        Err(crate::error::DispatchError::LaneFailure("axes is not exposed over the remote dispatch protocol".into()).into())
    }
}
