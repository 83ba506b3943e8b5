//! The social platform collaborator: posting, search and timelines.

use crate::config::TwitterConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info, warn};

pub const TWEET_CHAR_LIMIT: usize = 280;

/// Texts over the platform limit keep their first 277 characters plus `...`.
pub fn truncate_for_platform(text: &str) -> String {
    if text.chars().count() <= TWEET_CHAR_LIMIT {
        return text.to_string();
    }

    let kept = text.chars().take(TWEET_CHAR_LIMIT - 3).collect::<String>();
    format!("{}...", kept)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    /// The text actually submitted, after truncation.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, rename(deserialize = "public_metrics"), skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
}

/// None of these fail: errors are logged and reported in the return value.
#[async_trait]
pub trait SocialClient: Send + Sync {
    async fn post(&self, text: &str) -> PostResult;

    async fn search(&self, query: &str, count: usize) -> Vec<Post>;

    async fn timeline(&self, username: &str, count: usize) -> Vec<Post>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Deserialize)]
struct User {
    id: String,
}

/// Twitter API v2 client authenticated with a bearer token.
pub struct TwitterClient {
    client: Client,
    api_base: String,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig) -> Result<Self> {
        let token = config.bearer_token.as_deref().ok_or(Error::Config(
            "TWITTER_BEARER_TOKEN is required for the Twitter API".to_string(),
        ))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| Error::Config(format!("invalid bearer token: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Platform { status, body });
        }

        Ok(response.json().await?)
    }

    async fn try_post(&self, text: &str) -> Result<String> {
        let created: Envelope<CreatedTweet> = self
            .send(self.client.post(self.url("/tweets")).json(&json!({ "text": text })))
            .await?;

        created
            .data
            .map(|tweet| tweet.id)
            .ok_or(Error::Platform {
                status: 200,
                body: "tweet created without an id".to_string(),
            })
    }

    async fn try_search(&self, query: &str, count: usize) -> Result<Vec<Post>> {
        let found: Envelope<Vec<Post>> = self
            .send(self.client.get(self.url("/tweets/search/recent")).query(&[
                ("query", query.to_string()),
                ("max_results", page_size(count).to_string()),
                ("tweet.fields", "author_id,created_at,public_metrics".to_string()),
            ]))
            .await?;

        Ok(first(found.data, count))
    }

    async fn try_timeline(&self, username: &str, count: usize) -> Result<Vec<Post>> {
        let user: Envelope<User> = self
            .send(
                self.client
                    .get(self.url(&format!("/users/by/username/{}", username))),
            )
            .await?;

        let Some(user) = user.data else {
            return Ok(Vec::new());
        };

        let tweets: Envelope<Vec<Post>> = self
            .send(
                self.client
                    .get(self.url(&format!("/users/{}/tweets", user.id)))
                    .query(&[
                        ("max_results", page_size(count).to_string()),
                        ("tweet.fields", "created_at,public_metrics".to_string()),
                    ]),
            )
            .await?;

        Ok(first(tweets.data, count))
    }
}

/// The v2 endpoints only accept page sizes between 10 and 100.
fn page_size(count: usize) -> usize {
    count.clamp(10, 100)
}

fn first(posts: Option<Vec<Post>>, count: usize) -> Vec<Post> {
    let mut posts = posts.unwrap_or_default();
    posts.truncate(count);
    posts
}

#[async_trait]
impl SocialClient for TwitterClient {
    async fn post(&self, text: &str) -> PostResult {
        let text = truncate_for_platform(text);
        info!("Posting tweet: {}", text.chars().take(50).collect::<String>());

        match self.try_post(&text).await {
            Ok(id) => {
                info!(tweet_id = %id, "tweet posted");
                PostResult {
                    success: true,
                    post_id: Some(id),
                    text,
                    error: None,
                }
            }
            Err(err) => {
                error!("Error posting tweet: {}", err);
                PostResult {
                    success: false,
                    post_id: None,
                    text,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    async fn search(&self, query: &str, count: usize) -> Vec<Post> {
        self.try_search(query, count).await.unwrap_or_else(|err| {
            error!("Error searching tweets: {}", err);
            Vec::new()
        })
    }

    async fn timeline(&self, username: &str, count: usize) -> Vec<Post> {
        self.try_timeline(username, count).await.unwrap_or_else(|err| {
            error!("Error getting user timeline: {}", err);
            Vec::new()
        })
    }
}

/// Accepts posts without sending them anywhere. Used when no bearer token is
/// configured.
#[derive(Default)]
pub struct DryRunClient {
    posted: Mutex<Vec<String>>,
}

impl DryRunClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posted(&self) -> Vec<String> {
        self.posted.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SocialClient for DryRunClient {
    async fn post(&self, text: &str) -> PostResult {
        let text = truncate_for_platform(text);
        let id = format!("dry-run-{}", uuid::Uuid::new_v4());
        info!(tweet_id = %id, "dry run, tweet not sent: {}", text);

        if let Ok(mut posted) = self.posted.lock() {
            posted.push(text.clone());
        }

        PostResult {
            success: true,
            post_id: Some(id),
            text,
            error: None,
        }
    }

    async fn search(&self, query: &str, _count: usize) -> Vec<Post> {
        warn!(query, "dry run client cannot search, returning no tweets");
        Vec::new()
    }

    async fn timeline(&self, username: &str, _count: usize) -> Vec<Post> {
        warn!(username, "dry run client cannot read timelines, returning no tweets");
        Vec::new()
    }
}
