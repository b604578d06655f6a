use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("Text extraction failed: {0}")]
    Extract(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
