//! # Trellis Stylesheet
//!
//! In-memory CSS AST for the synthetic stylesheet injected into each preview
//! surface. Style edits that have not reached source yet are written here as
//! per-element override rules so the preview updates immediately.
//!
//! ```text
//! text ──lexer──▶ tokens ──parser──▶ Stylesheet ──Display──▶ compact text
//!                                        ▲
//!                         StylesheetManager::update_style
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod manager;
pub mod parser;

pub use ast::{AtBlock, AtRule, Declaration, Rule, StyleRule, Stylesheet};
pub use error::{Result, StylesheetError};
pub use manager::StylesheetManager;
pub use parser::parse;
