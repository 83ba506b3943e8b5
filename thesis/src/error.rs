use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("API Error: {status} - {body}")]
    Remote { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no conversation id returned by the research service")]
    NoJobCreated,

    #[error("Invalid poll budget: {0}")]
    InvalidBudget(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Configuration error: {0}")]
    Config(String),
}
