//! # Trellis Models
//!
//! Shared data model for the visual editor's synchronization core.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ gesture → Action (this crate)               │
//! └─────────────────────────────────────────────┘
//!          ↓                      ↓
//! ┌──────────────────────┐ ┌───────────────────┐
//! │ preview: live tree   │ │ history: undo/redo│
//! └──────────────────────┘ └───────────────────┘
//!                                 ↓
//! ┌─────────────────────────────────────────────┐
//! │ code: CodeDiffRequest per source id         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything here is plain data plus pure helpers: reversing an action for
//! undo and merging actions buffered inside a history transaction.

pub mod actions;
pub mod code;
pub mod element;
pub mod reverse;
pub mod style;

pub use actions::{
    Action, ActionKind, ActionLocation, ActionTarget, Change, EditTextAction,
    GroupElementsAction, ImageAction, ImageContent, InsertElementAction, InsertPosition,
    MoveElementAction, MoveLocation, PasteParams, RemoveElementAction, StyleActionTarget,
    UngroupElementsAction, UpdateStyleAction, WriteCodeAction,
};
pub use code::{
    CodeDiff, CodeDiffRequest, CodeElement, CodeInsert, StructureChange, CLASS_NAME_ATTRIBUTE,
};
pub use element::{
    ActionElement, CoreElementType, DomElement, DynamicType, LayerMap, LayerNode,
    SourcePosition, SourceRange, TemplateNode, TextDomElement,
};
pub use reverse::{merge_transaction_actions, reverse_action};
pub use style::{css_to_style_key, style_key_to_css, StyleMap};

/// Attribute carrying the persistent dom id assigned by the live tree.
pub const DOM_ID_ATTRIBUTE: &str = "data-trellis-dom-id";

/// Attribute carrying the authoring-time source id (template-node marker).
pub const SOURCE_ID_ATTRIBUTE: &str = "data-trellis-id";

/// Attribute carrying the resolved component-instance source id.
pub const INSTANCE_ID_ATTRIBUTE: &str = "data-trellis-instance-id";

/// Attribute left on elements inserted by the editor until source catches up.
pub const TEMP_ID_ATTRIBUTE: &str = "data-trellis-temp-id";

/// Marker for editor-internal helper elements that never appear in layers.
pub const IGNORE_ATTRIBUTE: &str = "data-trellis-ignore";
