//! In-memory snapshot source for integration testing.
//!
//! Serves a fixed snapshot, counts loads, and can be told to fail, so the
//! HTTP layer can be exercised with no files on disk.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use oddsiq::data::{Snapshot, SnapshotSource};

pub struct StaticSnapshotSource {
    snapshot: Snapshot,
    loads: Arc<Mutex<usize>>,
    /// If set, every load returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl StaticSnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            loads: Arc::new(Mutex::new(0)),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn load_count(&self) -> usize {
        *self.loads.lock().unwrap()
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn load(&self) -> Result<Snapshot> {
        *self.loads.lock().unwrap() += 1;
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.snapshot.clone())
    }
}
