//! # Trellis Code
//!
//! Turns committed editor actions into source edits.
//!
//! ## Pipeline
//!
//! ```text
//! Action ──→ FIFO queue (one in flight, settle window between items)
//!                ↓
//!   resolve source ids (action's own, else the template node map)
//!                ↓
//!   RequestSet: one CodeDiffRequest per source id,
//!   styles folded into utility classes
//!                ↓
//!   CodeDiffService::compute_diffs → WriteService::write_files
//!                ↓
//!   WriteListener::clean_after_write on every registered surface
//! ```
//!
//! Elements that cannot be resolved are dropped from the write and logged;
//! the preview keeps whatever was already applied to it.

pub mod error;
pub mod manager;
pub mod memory;
pub mod request;
pub mod services;
pub mod tailwind;

pub use error::{CodeError, Result};
pub use manager::{CodeManager, CodeManagerOptions, StyleMode, DEFAULT_SETTLE_INTERVAL};
pub use memory::{RecordingDiffService, RecordingWriteService};
pub use request::{to_code_element, RequestSet};
pub use services::{CodeDiffService, WriteListener, WriteService};
