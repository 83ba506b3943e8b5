use crate::client::ConversationClient;
use crate::extract;
use crate::payload::Payload;
use crate::researcher::{OutcomeKind, ResearchOutcome};
use tracing::{error, info};

/// Last resort after the poll budget runs out: one direct fetch of
/// `/conversations/{id}`, taking whatever content is there. Always returns
/// text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResolver;

impl FallbackResolver {
    pub async fn resolve(
        &self,
        client: &ConversationClient,
        job_id: &str,
        fallback_query: &str,
    ) -> String {
        self.resolve_outcome(client, job_id, fallback_query).await.text
    }

    pub async fn resolve_outcome(
        &self,
        client: &ConversationClient,
        job_id: &str,
        fallback_query: &str,
    ) -> ResearchOutcome {
        info!(job_id, "fetching conversation directly after poll timeout");

        let response = match client.fetch_conversation(job_id).await {
            Ok(response) => response,
            Err(err) => {
                error!(job_id, "error in fallback fetch: {}", err);
                return ResearchOutcome::placeholder(format!(
                    "Research query: {}\nError during research: {}",
                    fallback_query, err
                ));
            }
        };

        if response.status != 200 {
            error!(job_id, status = response.status, "failed to get conversation result");
            return ResearchOutcome::placeholder(format!(
                "Research query: {}\nError retrieving results.",
                fallback_query
            ));
        }

        match Payload::from_body(&response.body) {
            Payload::Json(map) => match extract::find_content(&map) {
                Some(text) => ResearchOutcome::new(text, OutcomeKind::Fallback),
                None => ResearchOutcome::placeholder(extract::placeholder(fallback_query)),
            },
            Payload::Text(text) if !text.is_empty() => {
                ResearchOutcome::new(text, OutcomeKind::Fallback)
            }
            _ => ResearchOutcome::placeholder(format!(
                "Research query: {}\nProcessing incomplete.",
                fallback_query
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::transport::ApiResponse;

    const CONVERSATION: &str = "/conversations/job-1";

    async fn resolve_with(transport: &ScriptedTransport) -> String {
        let client = ConversationClient::new(Box::new(transport.clone()), "402");
        FallbackResolver.resolve(&client, "job-1", "solar storms").await
    }

    #[tokio::test]
    async fn test_extracts_last_assistant_message() {
        let transport = ScriptedTransport::new();
        transport.respond(
            CONVERSATION,
            ApiResponse::new(
                200,
                r#"{"messages":[{"role":"assistant","content":"draft"},{"role":"assistant","content":"final"}]}"#,
            ),
        );

        assert_eq!(resolve_with(&transport).await, "final");
        assert_eq!(transport.count(CONVERSATION), 1);
    }

    #[tokio::test]
    async fn test_json_without_content_is_placeholder() {
        let transport = ScriptedTransport::new();
        transport.respond(CONVERSATION, ApiResponse::new(200, r#"{"status":"processing"}"#));

        let client = ConversationClient::new(Box::new(transport.clone()), "402");
        let outcome = FallbackResolver.resolve_outcome(&client, "job-1", "solar storms").await;
        assert!(outcome.is_placeholder());
        assert_eq!(
            outcome.text,
            "Research query: solar storms\nNo research content found in response."
        );
    }

    #[tokio::test]
    async fn test_text_body_returned_verbatim() {
        let transport = ScriptedTransport::new();
        transport.respond(CONVERSATION, ApiResponse::new(200, "partial notes"));

        assert_eq!(resolve_with(&transport).await, "partial notes");
    }

    #[tokio::test]
    async fn test_empty_body_is_incomplete() {
        let transport = ScriptedTransport::new();
        transport.respond(CONVERSATION, ApiResponse::new(200, ""));

        assert_eq!(
            resolve_with(&transport).await,
            "Research query: solar storms\nProcessing incomplete."
        );
    }

    #[tokio::test]
    async fn test_error_status_embeds_query() {
        let transport = ScriptedTransport::new();
        transport.respond(CONVERSATION, ApiResponse::new(500, "boom"));

        let text = resolve_with(&transport).await;
        assert!(text.contains("solar storms"));
        assert!(text.contains("Error retrieving results."));
    }

    #[tokio::test]
    async fn test_transport_failure_embeds_query() {
        let transport = ScriptedTransport::new();
        transport.fail(CONVERSATION);

        let text = resolve_with(&transport).await;
        assert!(text.starts_with("Research query: solar storms\nError during research:"));
    }
}
