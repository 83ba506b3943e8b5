//! Deep research through the Thesis conversation API.
//!
//! A research call creates a conversation (the job), polls its
//! `final_result` resource until it completes or the [`PollBudget`] runs out,
//! then falls back to one direct fetch of the conversation. [`ThesisResearcher`]
//! composes these steps and always produces text.

mod client;
mod config;
mod error;
pub mod extract;
mod fallback;
pub mod payload;
mod poller;
mod researcher;
pub mod transport;

pub use client::{ConversationClient, CreateConversation, JobCreation};
pub use config::{DEFAULT_BASE_URL, DEFAULT_RESEARCH_MODE, DEFAULT_SPACE_ID, PollBudget, ThesisConfig};
pub use error::Error;
pub use fallback::FallbackResolver;
pub use payload::Payload;
pub use poller::{CompletionPoller, PollOutcome, SUBSTANTIAL_CONTENT_LEN, TickOutcome};
pub use researcher::{OutcomeKind, ResearchOutcome, ThesisResearcher};
pub use transport::{ApiRequest, ApiResponse, Connector, HttpConnector, Transport};

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
pub(crate) mod testing;
