//! Fault-injecting wrapper around [`fdb_core::traits::ContentStore`],
//! grounded on a `FaultyToyDomain`/`FaultyStateStore` wrap-inner-plus-
//! fault-check pattern -- generalized from per-subsystem ledger stores
//! (state/archive/index/wal) to the single store trait this workspace's
//! backends implement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use thiserror::Error;

use fdb_core::traits::ContentStore;
use fdb_core::{FieldLocation, Key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFault {
    None,
    StoreWriteError,
    StoreReadError,
}

#[derive(Debug, Error)]
pub enum FaultError {
    #[error("injected fault")]
    Injected,
    #[error("{0}")]
    Inner(String),
}

/// Wraps a [`ContentStore`] so a test can turn on a fault after setup and
/// observe how the dispatch layer above it reacts to a mid-flight store
/// failure, without needing a real broken filesystem.
pub struct FaultyStore<S> {
    inner: S,
    active: AtomicBool,
    kind: Mutex<TestFault>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, active: AtomicBool::new(false), kind: Mutex::new(TestFault::None) }
    }

    pub fn inject(&self, kind: TestFault) {
        *self.kind.lock().unwrap() = kind;
        self.active.store(kind != TestFault::None, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.inject(TestFault::None);
    }

    fn active_fault(&self) -> TestFault {
        if self.active.load(Ordering::SeqCst) {
            *self.kind.lock().unwrap()
        } else {
            TestFault::None
        }
    }
}

impl<S: ContentStore> ContentStore for FaultyStore<S> {
    type Error = FaultError;

    async fn archive(&self, hint: &Key, data: &[u8]) -> Result<FieldLocation, Self::Error> {
        if self.active_fault() == TestFault::StoreWriteError {
            return Err(FaultError::Injected);
        }
        self.inner.archive(hint, data).await.map_err(|e| FaultError::Inner(e.to_string()))
    }

    async fn retrieve(&self, location: &FieldLocation) -> Result<Vec<u8>, Self::Error> {
        if self.active_fault() == TestFault::StoreReadError {
            return Err(FaultError::Injected);
        }
        self.inner.retrieve(location).await.map_err(|e| FaultError::Inner(e.to_string()))
    }

    async fn flush(&self) -> Result<(), Self::Error> {
        self.inner.flush().await.map_err(|e| FaultError::Inner(e.to_string()))
    }

    async fn remove(&self, uri: &str) -> Result<(), Self::Error> {
        self.inner.remove(uri).await.map_err(|e| FaultError::Inner(e.to_string()))
    }

    fn store_unit_uris(&self) -> Vec<String> {
        self.inner.store_unit_uris()
    }
}
