use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("No source id for '{address}' in surface '{surface_id}'")]
    Unresolved { surface_id: String, address: String },

    #[error("Code diff service failed: {0}")]
    DiffService(String),

    #[error("Code diff service returned no diffs for {0} request(s)")]
    NoDiffs(usize),

    #[error("Write service rejected {0} diff(s)")]
    WriteRejected(usize),
}
