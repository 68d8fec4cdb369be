//! External collaborators of the write queue.

use crate::error::Result;
use async_trait::async_trait;
use trellis_models::{CodeDiff, CodeDiffRequest};

/// Turns diff requests into file diffs. Must be free of side effects:
/// calling it twice with the same requests gives the same diffs.
#[async_trait]
pub trait CodeDiffService: Send + Sync {
    async fn compute_diffs(&self, requests: &[CodeDiffRequest]) -> Result<Vec<CodeDiff>>;
}

/// Applies diffs to disk. Returns whether every file was written.
#[async_trait]
pub trait WriteService: Send + Sync {
    async fn write_files(&self, diffs: &[CodeDiff]) -> bool;
}

/// Told after each successful write so transient preview state can be
/// dropped and the layer tree resynchronized.
#[async_trait]
pub trait WriteListener: Send + Sync {
    async fn clean_after_write(&self);
}
