//! Twitter agent CLI: Thesis research, tweets and LLM-planned tasks.

mod config;
mod error;
mod tools;
mod twitter;
mod workflow;

use agent::callbacks::{Callback, MessageLogger};
use agent::llm::{LLM, OpenAI, OpenAIOptions};
use clap::{Parser, Subcommand};
use config::Settings;
use error::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thesis::ThesisResearcher;
use tracing::{error, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use twitter::{DryRunClient, SocialClient, TWEET_CHAR_LIMIT, TwitterClient};
use workflow::TwitterTaskAgent;

#[derive(Parser)]
#[command(name = "twitter-agent")]
#[command(about = "Research topics with Thesis and share the results on Twitter", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a topic and print the result
    Research {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Research mode sent to Thesis [default: THESIS_RESEARCH_MODE or deep_research]
        #[arg(long)]
        mode: Option<String>,

        /// System prompt to guide the research
        #[arg(long, value_name = "PROMPT")]
        system_prompt: Option<String>,
    },

    /// Research several topics concurrently and print the results as JSON
    ResearchBatch {
        #[arg(value_name = "TOPICS", required = true)]
        topics: Vec<String>,
    },

    /// Research a topic and compose a tweet about it
    ResearchAndTweet {
        #[arg(value_name = "TOPIC")]
        topic: String,

        /// Publish the tweet instead of only printing it
        #[arg(long)]
        post: bool,
    },

    /// Post a tweet
    Tweet {
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Search recent tweets
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        #[arg(short, long, default_value_t = 10)]
        count: usize,
    },

    /// Show the latest tweets of an account
    Timeline {
        #[arg(value_name = "USERNAME")]
        username: String,

        #[arg(short, long, default_value_t = 10)]
        count: usize,
    },

    /// Let the language model plan and run a task with the research and Twitter tools
    Agent {
        #[arg(value_name = "TASK")]
        task: String,

        /// Write a markdown transcript of the conversation to FILE
        #[arg(long, value_name = "FILE")]
        transcript: Option<PathBuf>,
    },

    /// Report which credentials are configured
    ConfigCheck,
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,twitter_agent=info,thesis=info,agent=info".to_string(),
            2 => "info,twitter_agent=debug,thesis=debug,agent=debug".to_string(),
            _ => "debug,twitter_agent=trace,thesis=trace,agent=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn social_client(settings: &Settings) -> Result<Arc<dyn SocialClient>> {
    if settings.twitter.bearer_token.is_none() {
        warn!("TWITTER_BEARER_TOKEN is not set, tweets are only simulated");
        return Ok(Arc::new(DryRunClient::new()));
    }

    Ok(Arc::new(TwitterClient::new(&settings.twitter)?))
}

fn language_model(settings: &Settings) -> Option<Arc<dyn LLM + Send + Sync>> {
    let agent = &settings.agent;
    let api_key = agent.openai_api_key.clone()?;

    let llm: Arc<dyn LLM + Send + Sync> = OpenAI::with_options(
        agent.model.clone(),
        OpenAIOptions {
            api_key: Some(api_key),
            api_base: agent.openai_api_base.clone(),
            max_tokens: Some(agent.max_tokens),
            temperature: Some(agent.temperature),
        },
    );
    Some(llm)
}

fn task_agent(settings: &Settings) -> Result<TwitterTaskAgent<thesis::HttpConnector>> {
    if settings.thesis.auth_token.is_empty() || settings.thesis.device_id.is_empty() {
        warn!("THESIS_AUTH_TOKEN or THESIS_DEVICE_ID is not set, research requests will likely be rejected");
    }

    Ok(TwitterTaskAgent::new(
        Arc::new(ThesisResearcher::new(settings.thesis.clone())),
        social_client(settings)?,
        language_model(settings),
        settings.agent.max_steps,
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, PartialEq, Serialize)]
struct BatchEntry {
    topic: String,
    result: String,
}

fn batch_entries(topics: Vec<String>, results: Vec<String>) -> Vec<BatchEntry> {
    topics
        .into_iter()
        .zip(results)
        .map(|(topic, result)| BatchEntry { topic, result })
        .collect()
}

fn status(value: bool) -> &'static str {
    if value { "Set" } else { "Missing" }
}

fn config_report(settings: &Settings) -> Vec<(&'static str, &'static str)> {
    let twitter = &settings.twitter;
    let thesis = &settings.thesis;
    let agent = &settings.agent;

    vec![
        ("TWITTER_API_KEY", status(!twitter.api_key.is_empty())),
        ("TWITTER_API_SECRET", status(!twitter.api_secret.is_empty())),
        ("TWITTER_ACCESS_TOKEN", status(!twitter.access_token.is_empty())),
        (
            "TWITTER_ACCESS_TOKEN_SECRET",
            status(!twitter.access_token_secret.is_empty()),
        ),
        (
            "TWITTER_BEARER_TOKEN",
            if twitter.bearer_token.is_some() { "Set" } else { "Optional" },
        ),
        ("THESIS_AUTH_TOKEN", status(!thesis.auth_token.is_empty())),
        ("THESIS_DEVICE_ID", status(!thesis.device_id.is_empty())),
        (
            "OPENAI_API_KEY",
            if agent.openai_api_key.is_some() { "Set" } else { "Optional" },
        ),
    ]
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    match cli.command {
        Commands::Research {
            query,
            mode,
            system_prompt,
        } => {
            let researcher = ThesisResearcher::new(settings.thesis);
            let result = researcher
                .research(&query, mode.as_deref(), system_prompt.as_deref())
                .await;
            println!("{}", result);
        }
        Commands::ResearchBatch { topics } => {
            let researcher = ThesisResearcher::new(settings.thesis);
            let results = researcher.research_batch(&topics).await;
            print_json(&batch_entries(topics, results))?;
        }
        Commands::ResearchAndTweet { topic, post } => {
            let report = task_agent(&settings)?.research_and_tweet(&topic, post).await;
            print_json(&report)?;
        }
        Commands::Tweet { text } => {
            if text.chars().count() > TWEET_CHAR_LIMIT {
                warn!(
                    "tweet is {} characters, it will be truncated to {}",
                    text.chars().count(),
                    TWEET_CHAR_LIMIT
                );
            }
            let result = social_client(&settings)?.post(&text).await;
            print_json(&result)?;
        }
        Commands::Search { query, count } => {
            let posts = social_client(&settings)?.search(&query, count).await;
            print_json(&posts)?;
        }
        Commands::Timeline { username, count } => {
            let posts = social_client(&settings)?.timeline(&username, count).await;
            print_json(&posts)?;
        }
        Commands::Agent { task, transcript } => {
            let transcript = match transcript {
                Some(path) => {
                    let logger: Box<dyn Callback + Send> =
                        MessageLogger::new(&task, std::fs::File::create(path)?)?;
                    Some(logger)
                }
                None => None,
            };
            let report = task_agent(&settings)?.execute_task(&task, transcript).await;
            print_json(&report)?;
        }
        Commands::ConfigCheck => {
            println!("Configuration Status:");
            for (key, state) in config_report(&settings) {
                println!("  {}: {}", key, state);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.json);

    let result = match Settings::from_env() {
        Ok(settings) => run(cli, settings).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        error!("{}", err);
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
