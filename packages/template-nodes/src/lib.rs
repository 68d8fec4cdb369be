//! # Trellis Template Nodes
//!
//! Maps a rendered element's address to the template node that must be edited
//! to change it in source.
//!
//! Every element carrying a source id marker gets a **root** mapping: the
//! declaration inside the component that authored it. Elements produced by a
//! reused component also get an **instance** mapping: the call site that
//! produced this particular copy. [`TemplateNodeMap::get_any`] prefers the
//! instance.
//!
//! ```text
//! body
//! └─ main            (Page)
//!    ├─ div.card     (Card root)  ── instance: <Card/> #0 in Page
//!    └─ div.card     (Card root)  ── instance: <Card/> #1 in Page
//! ```

pub mod error;
pub mod map;
pub mod source;

pub use error::{Result, TemplateNodeError};
pub use map::TemplateNodeMap;
pub use source::{
    InMemoryInstanceResolver, InMemoryTemplateSource, InstanceResolver, TemplateNodeSource,
};
