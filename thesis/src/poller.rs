use crate::client::ConversationClient;
use crate::config::PollBudget;
use crate::extract;
use crate::payload::Payload;
use crate::transport::ApiResponse;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Responses without a recognized completion status count as finished only
/// when they carry more than this many characters of content.
pub const SUBSTANTIAL_CONTENT_LEN: usize = 30;

/// What a single poll tick concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(String),
    Pending,
}

/// How a poll session ended. A timeout is an outcome, not an error: the
/// caller decides what to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(String),
    TimedOut,
}

/// Polls `/conversations/{id}/final_result` until the research completes or
/// the budget is spent.
///
/// Every tick failure (transport error, 404, unexpected status, unparseable
/// body) leaves the session polling. The budget is checked against elapsed
/// time before every tick, so a tick never starts once `max_wait` has passed.
#[derive(Debug, Clone)]
pub struct CompletionPoller {
    budget: PollBudget,
    threshold: usize,
}

impl CompletionPoller {
    pub fn new(budget: PollBudget) -> Self {
        Self {
            budget,
            threshold: SUBSTANTIAL_CONTENT_LEN,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn budget(&self) -> PollBudget {
        self.budget
    }

    pub async fn poll(
        &self,
        client: &ConversationClient,
        job_id: &str,
        fallback_query: &str,
    ) -> PollOutcome {
        let start = Instant::now();
        let mut ticks = 0u32;

        while start.elapsed() < self.budget.max_wait() {
            ticks += 1;

            match client.fetch_final_result(job_id).await {
                Ok(response) => {
                    if let TickOutcome::Completed(text) = self.interpret(&response, fallback_query)
                    {
                        info!(job_id, ticks, "research completed");
                        return PollOutcome::Completed(text);
                    }
                }
                Err(err) => warn!(job_id, tick = ticks, "error during polling attempt: {}", err),
            }

            debug!(job_id, tick = ticks, "research still pending, waiting {:?}", self.budget.poll_interval());
            sleep(self.budget.poll_interval()).await;
        }

        warn!(job_id, ticks, "polling timeout reached");
        PollOutcome::TimedOut
    }

    /// Reads one `final_result` response.
    pub fn interpret(&self, response: &ApiResponse, fallback_query: &str) -> TickOutcome {
        match response.status {
            200 => match Payload::from_body(&response.body) {
                Payload::Json(map) => {
                    let status = map.get("status").and_then(Value::as_str);

                    if status == Some("completed") || map.get("final_result").is_some_and(is_truthy) {
                        return TickOutcome::Completed(extract::extract(&map, fallback_query));
                    }

                    if status == Some("processing") {
                        debug!("research still processing");
                        return TickOutcome::Pending;
                    }

                    let content = extract::extract(&map, fallback_query);
                    if self.is_substantial(&content) {
                        debug!(?status, "treating substantial content as the result");
                        TickOutcome::Completed(content)
                    } else {
                        TickOutcome::Pending
                    }
                }
                Payload::Text(text) if self.is_substantial(&text) => {
                    info!("got text response, treating as final result");
                    TickOutcome::Completed(text)
                }
                _ => TickOutcome::Pending,
            },
            404 => {
                debug!("conversation not ready yet, continuing to poll");
                TickOutcome::Pending
            }
            status => {
                warn!(status, "unexpected status while polling");
                TickOutcome::Pending
            }
        }
    }

    fn is_substantial(&self, text: &str) -> bool {
        text.chars().count() > self.threshold
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use std::time::Duration;

    const FINAL: &str = "/conversations/job-1/final_result";

    fn poller() -> CompletionPoller {
        CompletionPoller::new(PollBudget::default())
    }

    fn ok(body: &str) -> ApiResponse {
        ApiResponse::new(200, body)
    }

    fn client(transport: &ScriptedTransport) -> ConversationClient {
        ConversationClient::new(Box::new(transport.clone()), "402")
    }

    #[test]
    fn test_completed_status_extracts_result() {
        let outcome = poller().interpret(&ok(r#"{"status":"completed","content":"done"}"#), "q");
        assert_eq!(outcome, TickOutcome::Completed("done".to_string()));
    }

    #[test]
    fn test_final_result_without_status_completes() {
        let outcome = poller().interpret(&ok(r#"{"final_result":"X"}"#), "q");
        assert_eq!(outcome, TickOutcome::Completed("X".to_string()));
    }

    #[test]
    fn test_empty_final_result_keeps_polling() {
        let outcome = poller().interpret(&ok(r#"{"status":"processing","final_result":""}"#), "q");
        assert_eq!(outcome, TickOutcome::Pending);
    }

    #[test]
    fn test_processing_keeps_polling() {
        let body = r#"{"status":"processing","content":"a long partial draft that is not final yet"}"#;
        assert_eq!(poller().interpret(&ok(body), "q"), TickOutcome::Pending);
    }

    #[test]
    fn test_unknown_status_with_substantial_content_completes() {
        let content = "x".repeat(31);
        let body = format!(r#"{{"status":"summarizing","result":"{}"}}"#, content);
        assert_eq!(
            poller().interpret(&ok(&body), "q"),
            TickOutcome::Completed(content)
        );
    }

    #[test]
    fn test_unknown_status_with_short_content_keeps_polling() {
        let body = format!(r#"{{"result":"{}"}}"#, "x".repeat(30));
        assert_eq!(poller().interpret(&ok(&body), "q"), TickOutcome::Pending);
    }

    #[test]
    fn test_unknown_status_without_content_yields_placeholder() {
        assert_eq!(
            poller().interpret(&ok(r#"{"status":"queued"}"#), "solar storms"),
            TickOutcome::Completed(extract::placeholder("solar storms"))
        );
    }

    #[test]
    fn test_short_placeholder_keeps_polling() {
        let poller = poller().with_threshold(500);
        assert_eq!(poller.interpret(&ok(r#"{}"#), "q"), TickOutcome::Pending);
    }

    #[test]
    fn test_text_body_threshold() {
        let long = "research findings in plain text form, no json";
        assert_eq!(
            poller().interpret(&ok(long), "q"),
            TickOutcome::Completed(long.to_string())
        );
        assert_eq!(poller().interpret(&ok("working"), "q"), TickOutcome::Pending);
    }

    #[test]
    fn test_json_string_body_completes_without_quotes() {
        let text = "research findings sent back as a bare JSON string";
        assert_eq!(
            poller().interpret(&ok(&format!("\"{}\"", text)), "q"),
            TickOutcome::Completed(text.to_string())
        );
    }

    #[test]
    fn test_threshold_is_tunable() {
        let poller = poller().with_threshold(3);
        assert_eq!(
            poller.interpret(&ok("done"), "q"),
            TickOutcome::Completed("done".to_string())
        );
    }

    #[test]
    fn test_error_statuses_keep_polling() {
        for status in [404, 500, 502, 401] {
            let response = ApiResponse::new(status, r#"{"final_result":"X"}"#);
            assert_eq!(poller().interpret(&response, "q"), TickOutcome::Pending);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_on_third_tick() {
        let transport = ScriptedTransport::new();
        transport.respond(FINAL, ok(r#"{"status":"processing"}"#));
        transport.respond(FINAL, ok(r#"{"status":"processing"}"#));
        transport.respond(FINAL, ok(r#"{"status":"completed","final_result":"X"}"#));

        let poller = CompletionPoller::new(PollBudget::from_secs(30, 1).unwrap());
        let start = Instant::now();
        let outcome = poller.poll(&client(&transport), "job-1", "q").await;
        let elapsed = start.elapsed();

        assert_eq!(outcome, PollOutcome::Completed("X".to_string()));
        assert_eq!(transport.count(FINAL), 3);
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_sleep_exceeds_budget() {
        let transport = ScriptedTransport::new();
        transport.respond(FINAL, ok(r#"{"status":"processing"}"#));

        let poller = CompletionPoller::new(PollBudget::from_secs(2, 3).unwrap());
        let outcome = poller.poll(&client(&transport), "job-1", "q").await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(transport.count(FINAL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_and_failures_do_not_end_session() {
        let transport = ScriptedTransport::new();
        transport.respond(FINAL, ApiResponse::new(404, "not found"));
        transport.fail(FINAL);
        transport.respond(FINAL, ApiResponse::new(503, "unavailable"));
        transport.respond(FINAL, ok(r#"{"final_result":"recovered"}"#));

        let poller = CompletionPoller::new(PollBudget::from_secs(60, 3).unwrap());
        let start = Instant::now();
        let outcome = poller.poll(&client(&transport), "job-1", "q").await;

        assert_eq!(outcome, PollOutcome::Completed("recovered".to_string()));
        assert_eq!(transport.count(FINAL), 4);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(9));
        assert!(elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_status_ends_session_on_first_tick() {
        let transport = ScriptedTransport::new();
        transport.respond(FINAL, ok(r#"{"status":"queued"}"#));

        let poller = CompletionPoller::new(PollBudget::from_secs(30, 3).unwrap());
        let outcome = poller.poll(&client(&transport), "job-1", "solar storms").await;

        assert_eq!(
            outcome,
            PollOutcome::Completed(
                "Research query: solar storms\nNo research content found in response.".to_string()
            )
        );
        assert_eq!(transport.count(FINAL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_never_polls() {
        let transport = ScriptedTransport::new();

        let poller = CompletionPoller::new(PollBudget::from_secs(0, 1).unwrap());
        let outcome = poller.poll(&client(&transport), "job-1", "q").await;

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(transport.count(FINAL), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_counts_every_tick() {
        let transport = ScriptedTransport::new();
        transport.respond(FINAL, ok(r#"{"status":"processing"}"#));

        let poller = CompletionPoller::new(PollBudget::from_secs(10, 3).unwrap());
        let outcome = poller.poll(&client(&transport), "job-1", "q").await;

        // ticks at 0s, 3s, 6s and 9s; the check at 12s ends the session
        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(transport.count(FINAL), 4);
    }
}
