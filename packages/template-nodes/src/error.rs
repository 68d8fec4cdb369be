use thiserror::Error;

pub type Result<T> = std::result::Result<T, TemplateNodeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateNodeError {
    #[error("Surface '{0}' has no layer map")]
    UnknownSurface(String),

    #[error("Address '{address}' is not in the layer map of '{surface_id}'")]
    UnknownAddress { surface_id: String, address: String },

    #[error("No template node for source id '{0}'")]
    UnknownSourceId(String),
}
