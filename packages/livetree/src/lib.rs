//! # Trellis Live Tree
//!
//! The editor's view of a rendered preview surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ LivePreview: surface requests over the      │
//! │ message channel + PreviewEvent notifications│
//! └─────────────────────────────────────────────┘
//!          ↓                         ↓
//! ┌──────────────────────┐ ┌────────────────────┐
//! │ LiveTree             │ │ StylesheetManager  │
//! │  - layer map builder │ │  (override rules)  │
//! │  - mutation batching │ └────────────────────┘
//! │  - IdRegistry        │
//! └──────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────────┐
//! │ LiveDocument: arena of elements/text nodes  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Addresses are dom ids handed out by [`ids::IdGenerator`] and resolved
//! through [`ids::IdRegistry`]. Nothing outside this crate holds a
//! [`document::NodeId`] across an edit; callers pass dom ids and the surface
//! re-resolves them every time.

pub mod document;
pub mod error;
pub mod ids;
pub mod preview;
pub mod tree;

pub use document::{ElementData, LiveDocument, MutationRecord, NodeData, NodeId};
pub use error::{LiveTreeError, Result};
pub use ids::{IdGenerator, IdRegistry};
pub use preview::{DomUpdate, LivePreview, PreviewEvent};
pub use tree::{LiveTree, WindowMutation, DEFAULT_TEXT_PREVIEW_LENGTH};
