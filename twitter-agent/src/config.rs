//! Settings loaded from the environment (and `.env`, loaded in `main`).

use crate::error::{Error, Result};
use std::str::FromStr;
use std::time::Duration;
use thesis::{PollBudget, ThesisConfig};

pub const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com/2";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Clone, Default)]
pub struct TwitterConfig {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    /// OAuth 2.0 token sent as `Authorization: Bearer`. Posting needs a
    /// user-context token; search and timelines also work app-only.
    pub bearer_token: Option<String>,
    pub api_base: String,
}

#[derive(Clone)]
pub struct AgentConfig {
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_steps: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_api_base: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            max_steps: 8,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub twitter: TwitterConfig,
    pub thesis: ThesisConfig,
    pub agent: AgentConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let twitter = TwitterConfig {
            api_key: get("TWITTER_API_KEY").unwrap_or_default(),
            api_secret: get("TWITTER_API_SECRET").unwrap_or_default(),
            access_token: get("TWITTER_ACCESS_TOKEN").unwrap_or_default(),
            access_token_secret: get("TWITTER_ACCESS_TOKEN_SECRET").unwrap_or_default(),
            bearer_token: get("TWITTER_BEARER_TOKEN"),
            api_base: get("TWITTER_API_BASE").unwrap_or(DEFAULT_TWITTER_API_BASE.to_string()),
        };

        let budget = PollBudget::new(
            Duration::from_secs(parse_var(&get, "THESIS_MAX_WAIT_SECS", 120u64)?),
            Duration::from_secs(parse_var(&get, "THESIS_POLL_INTERVAL_SECS", 3u64)?),
        )?;

        let mut thesis = ThesisConfig::new(
            get("THESIS_AUTH_TOKEN").unwrap_or_default(),
            get("THESIS_DEVICE_ID").unwrap_or_default(),
        )
        .with_budget(budget);
        if let Some(base_url) = get("THESIS_BASE_URL") {
            thesis = thesis.with_base_url(base_url);
        }
        if let Some(space_id) = get("THESIS_SPACE_ID") {
            thesis = thesis.with_space_id(space_id);
        }
        if let Some(mode) = get("THESIS_RESEARCH_MODE") {
            thesis = thesis.with_research_mode(mode);
        }

        let defaults = AgentConfig::default();
        let agent = AgentConfig {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_api_base: get("OPENAI_API_BASE"),
            model: get("AGENT_MODEL").unwrap_or(defaults.model),
            max_tokens: parse_var(&get, "AGENT_MAX_TOKENS", defaults.max_tokens)?,
            temperature: parse_var(&get, "AGENT_TEMPERATURE", defaults.temperature)?,
            max_steps: parse_var(&get, "AGENT_MAX_STEPS", defaults.max_steps)?,
        };

        Ok(Self {
            twitter,
            thesis,
            agent,
        })
    }
}

fn parse_var<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn redact<T>(value: &Option<T>) -> &'static str {
    if value.is_some() { "<redacted>" } else { "<unset>" }
}

impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("access_token_secret", &"<redacted>")
            .field("bearer_token", &redact(&self.bearer_token))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_api_base", &self.openai_api_base)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}
