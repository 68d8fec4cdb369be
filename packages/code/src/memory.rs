//! In-memory collaborators that record what they are given.
//!
//! Used by the `trellis` binary to replay scripts without touching disk, and
//! by tests to observe the write queue.

use crate::error::{CodeError, Result};
use crate::services::{CodeDiffService, WriteService};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use trellis_models::{CodeDiff, CodeDiffRequest};

/// Echoes each request back as a diff whose generated text is the request
/// serialized as JSON, keyed by the request's source id.
#[derive(Debug, Default)]
pub struct RecordingDiffService {
    batches: Mutex<Vec<Vec<CodeDiffRequest>>>,
    fail: bool,
}

impl RecordingDiffService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that records requests but always reports failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every batch received, in call order.
    pub async fn batches(&self) -> Vec<Vec<CodeDiffRequest>> {
        self.batches.lock().await.clone()
    }

    /// All requests received, flattened.
    pub async fn requests(&self) -> Vec<CodeDiffRequest> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl CodeDiffService for RecordingDiffService {
    async fn compute_diffs(&self, requests: &[CodeDiffRequest]) -> Result<Vec<CodeDiff>> {
        self.batches.lock().await.push(requests.to_vec());
        if self.fail {
            return Err(CodeError::DiffService("diff service unavailable".into()));
        }

        requests
            .iter()
            .map(|request| {
                let generated = serde_json::to_string_pretty(request)
                    .map_err(|e| CodeError::DiffService(e.to_string()))?;
                Ok(CodeDiff {
                    path: request.oid.clone(),
                    original: String::new(),
                    generated,
                })
            })
            .collect()
    }
}

/// Records every batch of diffs. Can be made slow, to hold a write in
/// flight, or made to reject writes.
#[derive(Debug)]
pub struct RecordingWriteService {
    writes: Mutex<Vec<Vec<CodeDiff>>>,
    accept: bool,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for RecordingWriteService {
    fn default() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            accept: true,
            latency: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl RecordingWriteService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn writes(&self) -> Vec<Vec<CodeDiff>> {
        self.writes.lock().await.clone()
    }

    /// Highest number of writes observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WriteService for RecordingWriteService {
    async fn write_files(&self, diffs: &[CodeDiff]) -> bool {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.writes.lock().await.push(diffs.to_vec());
        debug!(files = diffs.len(), accepted = self.accept, "recorded write");

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.accept
    }
}
