use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Document has no XFA form")]
    NoXfa,

    #[error("XFA error: {0}")]
    Xfa(String),
}
