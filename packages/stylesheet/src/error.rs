use thiserror::Error;

pub type Result<T> = std::result::Result<T, StylesheetError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StylesheetError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of stylesheet at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Unrecognized input at {pos}")]
    LexerError { pos: usize },
}

impl StylesheetError {
    pub fn unexpected_token(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }
}
