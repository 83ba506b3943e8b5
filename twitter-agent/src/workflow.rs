use crate::tools;
use crate::twitter::{PostResult, SocialClient, TWEET_CHAR_LIMIT};
use agent::callbacks::Callback;
use agent::llm::{LLM, Message};
use agent::{AgentBuilder, NoToolCalls};
use serde::Serialize;
use std::sync::Arc;
use thesis::{Connector, ThesisResearcher};
use tracing::{error, info, warn};

const SYSTEM_PROMPT: &str = include_str!("prompts/agent.md");

const SUMMARY_CHARS: usize = 200;
const HASHTAGS: &str = "#Research #AI";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub action: String,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub action: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub actions: Vec<ActionRecord>,
    pub results: Vec<ActionResult>,
    pub final_answer: String,
    pub success: bool,
    pub error: Option<String>,
}

impl TaskReport {
    fn failed(task: &str, error: String) -> Self {
        Self {
            task: task.to_string(),
            actions: Vec::new(),
            results: Vec::new(),
            final_answer: String::new(),
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowReport {
    pub topic: String,
    pub research: String,
    pub tweet: Option<String>,
    /// `None` for dry runs.
    pub post: Option<PostResult>,
    pub success: bool,
    pub error: Option<String>,
}

/// Builds the tweet for a research result:
/// `Interesting insights on {topic}:\n\n{summary}\n\n#Research #AI`, with the
/// summary cut to 200 characters and the whole tweet cut to fit the limit.
pub fn compose_tweet(topic: &str, research: &str) -> String {
    let summary = if research.chars().count() > SUMMARY_CHARS {
        format!("{}...", research.chars().take(SUMMARY_CHARS).collect::<String>())
    } else {
        research.to_string()
    };

    let tweet = format!("Interesting insights on {}:\n\n{}\n\n{}", topic, summary, HASHTAGS);
    if tweet.chars().count() <= TWEET_CHAR_LIMIT {
        return tweet;
    }

    format!("{}... {}", tweet.chars().take(250).collect::<String>(), HASHTAGS)
}

/// Research, tweet and free-form agent tasks over one researcher and one
/// social client.
pub struct TwitterTaskAgent<C> {
    researcher: Arc<ThesisResearcher<C>>,
    social: Arc<dyn SocialClient>,
    llm: Option<Arc<dyn LLM + Send + Sync>>,
    max_steps: usize,
}

impl<C: Connector + 'static> TwitterTaskAgent<C> {
    pub fn new(
        researcher: Arc<ThesisResearcher<C>>,
        social: Arc<dyn SocialClient>,
        llm: Option<Arc<dyn LLM + Send + Sync>>,
        max_steps: usize,
    ) -> Self {
        Self {
            researcher,
            social,
            llm,
            max_steps,
        }
    }

    pub async fn research_and_tweet(&self, topic: &str, publish: bool) -> WorkflowReport {
        info!(topic, publish, "research and tweet workflow");

        let outcome = self.researcher.research_outcome(topic, None, None).await;
        if outcome.is_placeholder() {
            warn!(topic, "research produced no content, not tweeting");
            return WorkflowReport {
                topic: topic.to_string(),
                error: Some(format!("Research failed: {}", outcome.text)),
                research: outcome.text,
                tweet: None,
                post: None,
                success: false,
            };
        }

        let tweet = compose_tweet(topic, &outcome.text);
        let post = if publish {
            Some(self.social.post(&tweet).await)
        } else {
            None
        };

        let success = post.as_ref().is_none_or(|post| post.success);
        let error = post.as_ref().and_then(|post| post.error.clone());

        WorkflowReport {
            topic: topic.to_string(),
            research: outcome.text,
            tweet: Some(tweet),
            post,
            success,
            error,
        }
    }

    /// Lets the planner work on `task` with the research and Twitter tools.
    ///
    /// When the planner calls no tool and the task is about research, the
    /// task text itself is researched.
    pub async fn execute_task(
        &self,
        task: &str,
        transcript: Option<Box<dyn Callback + Send>>,
    ) -> TaskReport {
        info!(task, "executing task");

        let mut report = match &self.llm {
            Some(llm) => match self.plan_and_run(llm.clone(), task, transcript).await {
                Ok(report) => report,
                Err(err) => {
                    error!("Error executing task: {}", err);
                    return TaskReport::failed(task, err.to_string());
                }
            },
            None => {
                warn!("no language model configured, only the default research action is available");
                TaskReport {
                    task: task.to_string(),
                    actions: Vec::new(),
                    results: Vec::new(),
                    final_answer: String::new(),
                    success: true,
                    error: None,
                }
            }
        };

        if report.actions.is_empty() {
            if task.to_lowercase().contains("research") {
                let result = self.researcher.research(task, None, None).await;
                report.actions.push(ActionRecord {
                    action: tools::RESEARCH.to_string(),
                    input: task.to_string(),
                });
                report.results.push(ActionResult {
                    action: tools::RESEARCH.to_string(),
                    output: result,
                });
            } else if self.llm.is_none() {
                return TaskReport::failed(
                    task,
                    "no language model configured (set OPENAI_API_KEY) and the task is not a research task"
                        .to_string(),
                );
            }
        }

        report
    }

    async fn plan_and_run(
        &self,
        llm: Arc<dyn LLM + Send + Sync>,
        task: &str,
        transcript: Option<Box<dyn Callback + Send>>,
    ) -> agent::Result<TaskReport> {
        let mut builder = tools::register(
            AgentBuilder::new(),
            self.researcher.clone(),
            self.social.clone(),
        )
        .llm(llm)
        .stop_condition(Box::new(NoToolCalls))
        .max_steps(self.max_steps);

        if let Some(transcript) = transcript {
            builder = builder.callback(transcript);
        }

        let history = builder
            .build()?
            .run(vec![
                Message::System(SYSTEM_PROMPT.to_string()),
                Message::User(task.to_string()),
            ])
            .await?;

        Ok(report_from_history(task, &history))
    }
}

fn report_from_history(task: &str, history: &[Message]) -> TaskReport {
    let mut actions = Vec::new();
    let mut results = Vec::new();
    let mut final_answer = String::new();

    for message in history {
        match message {
            Message::Assistant(content, calls) => {
                actions.extend(calls.iter().map(|call| ActionRecord {
                    action: call.name.clone(),
                    input: call.args.clone(),
                }));
                if !content.is_empty() {
                    final_answer = content.clone();
                }
            }
            Message::Tool { name, result, .. } => results.push(ActionResult {
                action: name.clone(),
                output: result.clone(),
            }),
            _ => {}
        }
    }

    TaskReport {
        task: task.to_string(),
        actions,
        results,
        final_answer,
        success: true,
        error: None,
    }
}
