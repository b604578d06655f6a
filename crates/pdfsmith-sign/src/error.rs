use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Signature assembly error: {0}")]
    Cms(String),

    #[error("Timestamp error: {0}")]
    Tsa(String),
}
