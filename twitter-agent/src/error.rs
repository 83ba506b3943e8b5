use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Twitter API error ({status}): {body}")]
    Platform { status: u16, body: String },

    #[error("Agent error: {0}")]
    Agent(#[from] agent::Error),

    #[error("Research error: {0}")]
    Thesis(#[from] thesis::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
