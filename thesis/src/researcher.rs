use crate::client::{ConversationClient, preview};
use crate::config::ThesisConfig;
use crate::extract;
use crate::fallback::FallbackResolver;
use crate::poller::{CompletionPoller, PollOutcome};
use crate::transport::{Connector, HttpConnector};
use crate::{Error, Result};
use futures::future::join_all;
use tracing::{error, info, warn};

/// How the research text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// The job reported completion while polling.
    Completed,
    /// Polling timed out and the direct fetch found content.
    Fallback,
    /// No research content; the text only describes what went wrong.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchOutcome {
    pub text: String,
    pub kind: OutcomeKind,
}

impl ResearchOutcome {
    pub fn new(text: String, kind: OutcomeKind) -> Self {
        Self { text, kind }
    }

    pub fn placeholder(text: String) -> Self {
        Self::new(text, OutcomeKind::Placeholder)
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == OutcomeKind::Placeholder
    }
}

/// Runs research jobs end to end.
///
/// Every call opens its own session through the connector, so concurrent
/// calls share nothing. Dropping a call's future mid-poll drops its session.
pub struct ThesisResearcher<C = HttpConnector> {
    connector: C,
    space_id: String,
    research_mode: String,
    poller: CompletionPoller,
    fallback: FallbackResolver,
}

impl ThesisResearcher<HttpConnector> {
    pub fn new(config: ThesisConfig) -> Self {
        let researcher = Self::with_connector(HttpConnector::new(config.clone()), &config);
        info!(config = ?config, "thesis researcher configured");
        researcher
    }
}

impl<C: Connector> ThesisResearcher<C> {
    pub fn with_connector(connector: C, config: &ThesisConfig) -> Self {
        Self {
            connector,
            space_id: config.space_id.clone(),
            research_mode: config.research_mode.clone(),
            poller: CompletionPoller::new(config.budget),
            fallback: FallbackResolver,
        }
    }

    pub fn with_poller(mut self, poller: CompletionPoller) -> Self {
        self.poller = poller;
        self
    }

    /// Researches `topic` and returns the best text available. Never fails:
    /// every error becomes a placeholder that names the topic.
    pub async fn research(
        &self,
        topic: &str,
        mode: Option<&str>,
        system_prompt: Option<&str>,
    ) -> String {
        self.research_outcome(topic, mode, system_prompt).await.text
    }

    pub async fn research_outcome(
        &self,
        topic: &str,
        mode: Option<&str>,
        system_prompt: Option<&str>,
    ) -> ResearchOutcome {
        match self.try_research(topic, mode, system_prompt).await {
            Ok(outcome) => outcome,
            Err(Error::NoJobCreated) => {
                warn!("No conversation ID returned from Thesis API");
                ResearchOutcome::placeholder(format!(
                    "Research query: {}\nNo detailed research available.",
                    topic
                ))
            }
            Err(err) => {
                error!("Error during research: {}", err);
                ResearchOutcome::placeholder(format!(
                    "Research query: {}\nError during research: {}",
                    topic, err
                ))
            }
        }
    }

    /// Researches every topic concurrently. Results keep the input order.
    pub async fn research_batch(&self, topics: &[String]) -> Vec<String> {
        join_all(topics.iter().map(|topic| self.research(topic, None, None))).await
    }

    async fn try_research(
        &self,
        topic: &str,
        mode: Option<&str>,
        system_prompt: Option<&str>,
    ) -> Result<ResearchOutcome> {
        let client = ConversationClient::new(self.connector.connect()?, self.space_id.as_str());
        let mode = mode.unwrap_or(&self.research_mode);

        let job = client.create(topic, mode, system_prompt).await?;
        let job_id = job.job_id().ok_or(Error::NoJobCreated)?;
        info!(job_id = %job_id, "Created conversation for research: {}", preview(topic));

        let outcome = match self.poller.poll(&client, &job_id, topic).await {
            PollOutcome::Completed(text) if text == extract::placeholder(topic) => {
                ResearchOutcome::placeholder(text)
            }
            PollOutcome::Completed(text) => ResearchOutcome::new(text, OutcomeKind::Completed),
            PollOutcome::TimedOut => self.fallback.resolve_outcome(&client, &job_id, topic).await,
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollBudget;
    use crate::testing::ScriptedTransport;
    use crate::transport::ApiResponse;
    use std::time::Duration;

    const CREATE: &str = "/conversations";
    const FINAL: &str = "/conversations/job-1/final_result";
    const CONVERSATION: &str = "/conversations/job-1";

    fn researcher(transport: &ScriptedTransport, budget: PollBudget) -> ThesisResearcher<ScriptedTransport> {
        let config = ThesisConfig::new("token", "device").with_budget(budget);
        ThesisResearcher::with_connector(transport.clone(), &config)
    }

    fn created() -> ApiResponse {
        ApiResponse::new(200, r#"{"id":"job-1"}"#)
    }

    #[tokio::test(start_paused = true)]
    async fn test_research_returns_polled_result() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, created());
        transport.respond(FINAL, ApiResponse::new(200, r#"{"status":"processing"}"#));
        transport.respond(FINAL, ApiResponse::new(200, r#"{"status":"completed","final_result":"findings"}"#));

        let outcome = researcher(&transport, PollBudget::default())
            .research_outcome("ai trends", None, None)
            .await;

        assert_eq!(outcome, ResearchOutcome::new("findings".to_string(), OutcomeKind::Completed));
        assert_eq!(transport.count(CONVERSATION), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_invokes_fallback_once() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, created());
        transport.respond(FINAL, ApiResponse::new(200, r#"{"status":"processing"}"#));
        transport.respond(
            CONVERSATION,
            ApiResponse::new(200, r#"{"messages":[{"role":"assistant","content":"partial"}]}"#),
        );

        let outcome = researcher(&transport, PollBudget::from_secs(2, 3).unwrap())
            .research_outcome("ai trends", None, None)
            .await;

        assert_eq!(outcome, ResearchOutcome::new("partial".to_string(), OutcomeKind::Fallback));
        assert_eq!(transport.count(FINAL), 1);
        assert_eq!(transport.count(CONVERSATION), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_status_is_placeholder_without_fallback() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, created());
        transport.respond(FINAL, ApiResponse::new(200, r#"{"status":"queued"}"#));

        let outcome = researcher(&transport, PollBudget::from_secs(30, 3).unwrap())
            .research_outcome("solar storms", None, None)
            .await;

        assert!(outcome.is_placeholder());
        assert_eq!(outcome.text, extract::placeholder("solar storms"));
        assert_eq!(transport.count(FINAL), 1);
        assert_eq!(transport.count(CONVERSATION), 0);
    }

    #[tokio::test]
    async fn test_missing_job_id_is_placeholder() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, ApiResponse::new(200, r#"{"status":"queued"}"#));

        let outcome = researcher(&transport, PollBudget::default())
            .research_outcome("ai trends", None, None)
            .await;

        assert!(outcome.is_placeholder());
        assert_eq!(outcome.text, "Research query: ai trends\nNo detailed research available.");
        assert_eq!(transport.count(FINAL), 0);
    }

    #[tokio::test]
    async fn test_create_failure_is_placeholder() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, ApiResponse::new(500, "internal"));

        let text = researcher(&transport, PollBudget::default())
            .research("ai trends", None, None)
            .await;

        assert_eq!(
            text,
            "Research query: ai trends\nError during research: API Error: 500 - internal"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_placeholder() {
        let transport = ScriptedTransport::new();
        transport.fail(CREATE);

        let text = researcher(&transport, PollBudget::default())
            .research("ai trends", None, None)
            .await;

        assert!(text.starts_with("Research query: ai trends\nError during research:"));
    }

    #[tokio::test]
    async fn test_mode_override_and_default() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, ApiResponse::new(200, "{}"));
        let researcher = researcher(&transport, PollBudget::default());

        researcher.research("a", None, None).await;
        researcher.research("b", Some("quick"), Some("prompt")).await;

        let modes = transport
            .requests()
            .into_iter()
            .filter_map(|r| r.body)
            .map(|body| body["research_mode"].clone())
            .collect::<Vec<_>>();
        assert_eq!(modes, vec!["deep_research", "quick"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_without_content_is_placeholder() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, created());
        transport.respond(FINAL, ApiResponse::new(200, r#"{"status":"completed"}"#));

        let outcome = researcher(&transport, PollBudget::default())
            .research_outcome("ai trends", None, None)
            .await;

        assert!(outcome.is_placeholder());
        assert_eq!(outcome.text, extract::placeholder("ai trends"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_keeps_order() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, created());
        transport.respond(FINAL, ApiResponse::new(200, r#"{"final_result":"shared"}"#));

        let topics = vec!["one".to_string(), "two".to_string()];
        let results = researcher(&transport, PollBudget::default())
            .research_batch(&topics)
            .await;

        assert_eq!(results, vec!["shared".to_string(), "shared".to_string()]);
        assert_eq!(transport.count(CREATE), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_releases_session() {
        let transport = ScriptedTransport::new();
        transport.respond(CREATE, created());
        transport.respond(FINAL, ApiResponse::new(200, r#"{"status":"processing"}"#));
        let researcher = researcher(&transport, PollBudget::default());
        let handles = transport.handles();

        let res = tokio::time::timeout(
            Duration::from_secs(10),
            researcher.research("ai trends", None, None),
        )
        .await;

        assert!(res.is_err());
        assert!(transport.count(FINAL) >= 3);
        assert_eq!(transport.handles(), handles);
    }
}
