use crate::document::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LiveTreeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiveTreeError {
    #[error("Node {0:?} does not exist")]
    UnknownNode(NodeId),

    #[error("No element with dom id '{0}'")]
    UnknownAddress(String),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Inserting {child:?} under {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("Element '{child}' is not a child of '{parent}'")]
    NotAChild { parent: String, child: String },

    #[error("No child at {index} under '{parent}'")]
    InvalidLocation { parent: String, index: usize },
}
