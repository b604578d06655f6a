use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to build PDF: {0}")]
    Pdf(String),

    #[error("Page {0} does not exist")]
    PageNotFound(u32),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
