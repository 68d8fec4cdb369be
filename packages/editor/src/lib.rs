//! # Trellis Editor
//!
//! Synchronization core of the visual editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ gesture → Action                            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: ActionManager                       │
//! │  - HistoryManager (undo/redo, transactions) │
//! │  - dispatch to preview surfaces             │
//! │  - resync template nodes after structure    │
//! └─────────────────────────────────────────────┘
//!          ↓                            ↓
//! ┌──────────────────────┐ ┌────────────────────┐
//! │ livetree: preview    │ │ code: write queue  │
//! └──────────────────────┘ └────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Preview first**: the preview changes immediately; source follows
//!    through the write queue
//! 2. **One undo step per gesture**: transactions merge continuous edits
//! 3. **Failures stay local**: unresolved elements and failed writes are
//!    logged, never propagated into dispatch
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trellis_editor::{Collaborators, EditorConfig, EditorEngine};
//!
//! let engine = EditorEngine::new(EditorConfig::default(), collaborators).await;
//! engine.create_surface("frame-1", &page).await?;
//!
//! engine.run(action).await;
//! engine.undo().await;
//! engine.wait_idle().await;
//! ```

pub mod actions;
pub mod config;
pub mod engine;
pub mod errors;
pub mod history;
pub mod surface;

pub use actions::ActionManager;
pub use config::{EditorConfig, CONFIG_FILE_NAME};
pub use engine::{Collaborators, EditorEngine};
pub use errors::{ConfigError, EditorError, Result};
pub use history::{HistoryManager, TransactionState, WriteSink};
pub use surface::{PreviewChannel, SharedPreview, SurfaceRegistry};
