mod sql;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{NoFlakeError, Result};

pub use sql::SqlKv;

/// Each repository keeps its collection as one JSON document under a fixed key.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local backend for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
    failing: AtomicBool,
    failing_reads: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, simulating unavailable storage.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only `get`, leaving `put` working.
    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NoFlakeError::Storage("storage unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(NoFlakeError::Storage("read failed".into()));
        }
        let guard = self
            .entries
            .read()
            .map_err(|_| NoFlakeError::Storage("memory store lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        let mut guard = self
            .entries
            .write()
            .map_err(|_| NoFlakeError::Storage("memory store lock poisoned".into()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
