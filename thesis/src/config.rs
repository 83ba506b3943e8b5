use crate::{Error, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://backend-beta.thesis.io/api";
pub const DEFAULT_SPACE_ID: &str = "402";
pub const DEFAULT_RESEARCH_MODE: &str = "deep_research";

const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(120);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Bounds one poll session: how long to keep polling, and how long to sleep
/// between ticks. The interval is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    max_wait: Duration,
    poll_interval: Duration,
}

impl PollBudget {
    pub fn new(max_wait: Duration, poll_interval: Duration) -> Result<Self> {
        if poll_interval.is_zero() {
            return Err(Error::InvalidBudget(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            max_wait,
            poll_interval,
        })
    }

    pub fn from_secs(max_wait_secs: u64, poll_interval_secs: u64) -> Result<Self> {
        Self::new(
            Duration::from_secs(max_wait_secs),
            Duration::from_secs(poll_interval_secs),
        )
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Everything needed to talk to the research service. Passed into the
/// researcher at construction; nothing here is read from global state.
#[derive(Clone)]
pub struct ThesisConfig {
    pub base_url: String,
    pub auth_token: String,
    pub device_id: String,
    pub space_id: String,
    pub research_mode: String,
    pub budget: PollBudget,
    pub request_timeout: Duration,
}

impl ThesisConfig {
    pub fn new(auth_token: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_token: auth_token.into(),
            device_id: device_id.into(),
            space_id: DEFAULT_SPACE_ID.to_string(),
            research_mode: DEFAULT_RESEARCH_MODE.to_string(),
            budget: PollBudget::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_space_id(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = space_id.into();
        self
    }

    pub fn with_research_mode(mut self, research_mode: impl Into<String>) -> Self {
        self.research_mode = research_mode.into();
        self
    }

    pub fn with_budget(mut self, budget: PollBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Base url without a trailing slash, ready for path concatenation.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl std::fmt::Debug for ThesisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThesisConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &"<redacted>")
            .field("device_id", &"<redacted>")
            .field("space_id", &self.space_id)
            .field("research_mode", &self.research_mode)
            .field("budget", &self.budget)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
