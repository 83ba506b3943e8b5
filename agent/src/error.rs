use async_openai::error::OpenAIError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Openai error: {0}")]
    OpenaiError(#[from] OpenAIError),

    #[error("No response from llm: {0}")]
    LLMResponseError(String),

    #[error("Tool {0} does not exist")]
    ToolDoesNotExist(String),

    #[error("Alias {alias} points at unregistered tool {tool}")]
    UnknownAlias { alias: String, tool: String },

    #[error("Missing arg: {0}")]
    MissingArg(String),

    #[error("Step limit of {0} reached before the task completed")]
    StepLimit(usize),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}
