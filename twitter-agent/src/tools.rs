use crate::twitter::SocialClient;
use agent::llm::Message;
use agent::tools::{FunctionalTool, ToolCall, ToolDefinition};
use agent::{AgentBuilder, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use thesis::{Connector, ThesisResearcher};

pub const RESEARCH: &str = "research_thesis";
pub const POST_TWEET: &str = "post_tweet";
pub const SEARCH_TWEETS: &str = "search_tweets";
pub const GET_TIMELINE: &str = "get_timeline";

const DEFAULT_COUNT: usize = 10;

/// Other names planners commonly use for the tools above.
pub const ALIASES: [(&str, &str); 8] = [
    ("research", RESEARCH),
    ("search_research", RESEARCH),
    ("investigate", RESEARCH),
    ("tweet", POST_TWEET),
    ("post", POST_TWEET),
    ("publish_tweet", POST_TWEET),
    ("search", SEARCH_TWEETS),
    ("timeline", GET_TIMELINE),
];

/// Registers every tool and alias on an agent builder.
pub fn register<C: Connector + 'static>(
    builder: AgentBuilder,
    researcher: Arc<ThesisResearcher<C>>,
    social: Arc<dyn SocialClient>,
) -> AgentBuilder {
    let builder = builder
        .tool(Box::new(ResearchTool(researcher)))
        .tool(Box::new(PostTweetTool(social.clone())))
        .tool(Box::new(SearchTweetsTool(social.clone())))
        .tool(Box::new(TimelineTool(social)));

    ALIASES
        .iter()
        .fold(builder, |builder, (alias, tool)| builder.alias(alias, tool))
}

#[derive(Deserialize, JsonSchema)]
struct ResearchArgs {
    /// The research query or topic to investigate
    query: String,
    /// Type of research mode, defaults to deep_research
    research_mode: Option<String>,
    /// Optional system prompt to guide the research
    system_prompt: Option<String>,
}

pub struct ResearchTool<C>(pub Arc<ThesisResearcher<C>>);

#[async_trait]
impl<C: Connector + 'static> FunctionalTool for ResearchTool<C> {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<ResearchArgs>(
            RESEARCH,
            "Research any topic using the Thesis API, waiting until the research completes. Returns comprehensive research results.",
        )
    }

    async fn invoke_fn(&mut self, call: &ToolCall) -> Result<Message> {
        let args: ResearchArgs = call.args()?;
        let result = self
            .0
            .research(
                &args.query,
                args.research_mode.as_deref(),
                args.system_prompt.as_deref(),
            )
            .await;

        Ok(call.reply(result))
    }
}

#[derive(Deserialize, JsonSchema)]
struct PostTweetArgs {
    /// The text content to post as a tweet
    content: String,
}

pub struct PostTweetTool(pub Arc<dyn SocialClient>);

#[async_trait]
impl FunctionalTool for PostTweetTool {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<PostTweetArgs>(
            POST_TWEET,
            "Post content to Twitter. Text over 280 characters is truncated. Returns success status and tweet id.",
        )
    }

    async fn invoke_fn(&mut self, call: &ToolCall) -> Result<Message> {
        let args: PostTweetArgs = call.args()?;
        let result = self.0.post(&args.content).await;
        Ok(call.reply(serde_json::to_string(&result)?))
    }
}

#[derive(Deserialize, JsonSchema)]
struct SearchTweetsArgs {
    /// Search query in Twitter search syntax
    query: String,
    /// Maximum number of tweets to return, defaults to 10
    count: Option<usize>,
}

pub struct SearchTweetsTool(pub Arc<dyn SocialClient>);

#[async_trait]
impl FunctionalTool for SearchTweetsTool {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<SearchTweetsArgs>(SEARCH_TWEETS, "Search recent tweets.")
    }

    async fn invoke_fn(&mut self, call: &ToolCall) -> Result<Message> {
        let args: SearchTweetsArgs = call.args()?;
        let posts = self
            .0
            .search(&args.query, args.count.unwrap_or(DEFAULT_COUNT))
            .await;
        Ok(call.reply(serde_json::to_string(&posts)?))
    }
}

#[derive(Deserialize, JsonSchema)]
struct TimelineArgs {
    /// Twitter handle without the leading @
    username: String,
    /// Maximum number of tweets to return, defaults to 10
    count: Option<usize>,
}

pub struct TimelineTool(pub Arc<dyn SocialClient>);

#[async_trait]
impl FunctionalTool for TimelineTool {
    fn definition(&self) -> Result<ToolDefinition> {
        ToolDefinition::new::<TimelineArgs>(GET_TIMELINE, "Get the latest tweets of a user.")
    }

    async fn invoke_fn(&mut self, call: &ToolCall) -> Result<Message> {
        let args: TimelineArgs = call.args()?;
        let username = args.username.trim_start_matches('@');
        let posts = self
            .0
            .timeline(username, args.count.unwrap_or(DEFAULT_COUNT))
            .await;
        Ok(call.reply(serde_json::to_string(&posts)?))
    }
}
