use crate::payload::Payload;
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// Body of `POST /conversations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateConversation {
    pub initial_user_msg: String,
    pub image_urls: Option<Vec<String>>,
    pub system_prompt: Option<String>,
    pub mcp_disable: Map<String, Value>,
    pub research_mode: String,
    pub space_id: String,
}

/// What the service answered to a create request.
///
/// A success response that is not a JSON object is kept as
/// `{"status": "success", "raw_response": <body>}`, so callers see one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCreation {
    pub record: Map<String, Value>,
}

impl JobCreation {
    fn from_body(body: &str) -> Self {
        match Payload::from_body(body) {
            Payload::Json(record) => Self { record },
            _ => {
                warn!("create conversation returned a non-JSON success body");
                let mut record = Map::new();
                record.insert("status".to_string(), Value::from("success"));
                record.insert("raw_response".to_string(), Value::from(body));
                Self { record }
            }
        }
    }

    /// The conversation id, if the service assigned one. Numeric ids are
    /// accepted and rendered as strings.
    pub fn job_id(&self) -> Option<String> {
        match self.record.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// One session against the conversation API.
pub struct ConversationClient {
    transport: Box<dyn Transport>,
    space_id: String,
}

impl ConversationClient {
    pub fn new(transport: Box<dyn Transport>, space_id: impl Into<String>) -> Self {
        Self {
            transport,
            space_id: space_id.into(),
        }
    }

    pub async fn create(
        &self,
        query: &str,
        mode: &str,
        system_prompt: Option<&str>,
    ) -> Result<JobCreation> {
        let request = CreateConversation {
            initial_user_msg: query.to_string(),
            image_urls: None,
            system_prompt: system_prompt.map(str::to_string),
            mcp_disable: Map::new(),
            research_mode: mode.to_string(),
            space_id: self.space_id.clone(),
        };

        info!("Creating research conversation for: {}", preview(query));
        debug!(?request, "create conversation payload");

        let response = self
            .transport
            .execute(ApiRequest::post("/conversations", serde_json::to_value(&request)?))
            .await?;

        if !response.is_success() {
            error!(status = response.status, "failed to create conversation");
            return Err(Error::Remote {
                status: response.status,
                body: response.body,
            });
        }

        Ok(JobCreation::from_body(&response.body))
    }

    pub async fn fetch_final_result(&self, job_id: &str) -> Result<ApiResponse> {
        self.transport
            .execute(ApiRequest::get(format!("/conversations/{}/final_result", job_id)))
            .await
    }

    pub async fn fetch_conversation(&self, job_id: &str) -> Result<ApiResponse> {
        self.transport
            .execute(ApiRequest::get(format!("/conversations/{}", job_id)))
            .await
    }
}

/// First 50 characters of a query, for log lines.
pub(crate) fn preview(query: &str) -> String {
    match query.char_indices().nth(50) {
        Some((idx, _)) => format!("{}...", &query[..idx]),
        None => query.to_string(),
    }
}
