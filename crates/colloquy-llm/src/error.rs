use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Transcript is empty, nothing to send")]
    EmptyTranscript,

    #[error("Invalid transcript state: {0}")]
    InvalidTranscriptState(String),

    #[error("Remote service error ({status}): {body}")]
    RemoteError { status: u16, body: String },

    #[error("Transport interrupted: {0}")]
    TransportInterrupted(String),

    #[error("Exchange cancelled")]
    Cancelled,

    #[error("API key is missing or blank")]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
