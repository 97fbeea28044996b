use std::time::Duration;

/// Errors from calling a risk classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Transport(String),

    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("classifier response could not be decoded: {0}")]
    Decode(String),

    #[error("classifier did not answer within {0:?}")]
    Timeout(Duration),

    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier configuration error: {0}")]
    Config(String),
}
