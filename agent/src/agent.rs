use crate::agent::llm::Message;
use crate::callbacks;
use crate::llm;
use crate::tools;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub trait StopCondition {
    fn done(&self, history: &[llm::Message]) -> bool;
}

/// Stops once the model answers without requesting any tool.
pub struct NoToolCalls;

impl StopCondition for NoToolCalls {
    fn done(&self, history: &[llm::Message]) -> bool {
        matches!(history.last(), Some(Message::Assistant(_, calls)) if calls.is_empty())
    }
}

type Tool = Box<dyn tools::Tool + Send>;
type Callback = Box<dyn callbacks::Callback + Send>;

pub struct Agent {
    llm: Arc<dyn llm::LLM + Send + Sync>,
    tools: HashMap<String, Tool>,
    aliases: HashMap<String, String>,
    callbacks: Vec<Callback>,
    tool_defs: Vec<tools::ToolDefinition>,
    stop_condition: Box<dyn StopCondition + Send>,
    max_steps: Option<usize>,
}

impl Agent {
    /// Maps a requested tool name to a registered tool, following aliases.
    fn resolve(&self, name: &str) -> Option<String> {
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.tools.contains_key(name).then(|| name.to_string())
    }

    async fn execute_tool_call(
        &mut self,
        tool_call: &tools::ToolCall,
        messages: Vec<llm::Message>,
    ) -> Result<Vec<llm::Message>> {
        let tool = self
            .tools
            .get_mut(&tool_call.name)
            .ok_or(Error::ToolDoesNotExist(tool_call.name.clone()))?;

        let messages = tool.invoke(tool_call, messages).await?;

        Ok(messages)
    }

    fn unknown_tool_reply(&self, tool_call: &tools::ToolCall) -> llm::Message {
        let mut available = self.tools.keys().cloned().collect::<Vec<_>>();
        available.sort();

        let err = Error::ToolDoesNotExist(tool_call.name.clone());
        warn!(tool = %tool_call.name, "planner requested an unknown tool");

        tool_call.reply(format!(
            "{}. Only these tools are supported: {}",
            err,
            available.join(", ")
        ))
    }

    pub async fn run(&mut self, mut messages: Vec<llm::Message>) -> Result<Vec<Message>> {
        let mut steps = 0;

        while !self.stop_condition.done(&messages) {
            if let Some(max_steps) = self.max_steps {
                if steps >= max_steps {
                    return Err(Error::StepLimit(max_steps));
                }
            }
            steps += 1;

            let next = self
                .llm
                .completion(llm::CompletionRequest {
                    messages: &messages,
                    tools: &self.tool_defs,
                })
                .await?;

            debug!(step = steps, tool_calls = next.tool_calls.len(), "completion received");

            messages.push(llm::Message::Assistant(
                next.content,
                next.tool_calls.clone(),
            ));

            for tool_call in &next.tool_calls {
                match self.resolve(&tool_call.name) {
                    Some(name) => {
                        info!(tool = %name, requested = %tool_call.name, "invoking tool");
                        let call = tools::ToolCall {
                            name,
                            ..tool_call.clone()
                        };
                        messages = self.execute_tool_call(&call, messages).await?;
                    }
                    None => messages.push(self.unknown_tool_reply(tool_call)),
                }
            }

            for callback in &mut self.callbacks {
                messages = callback.call(messages).await?;
            }
        }

        Ok(messages)
    }
}

pub struct AgentBuilder {
    llm: Option<Arc<dyn llm::LLM + Send + Sync>>,
    tools: Vec<Tool>,
    aliases: HashMap<String, String>,
    callbacks: Vec<Callback>,
    stop_condition: Option<Box<dyn StopCondition + Send>>,
    max_steps: Option<usize>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            llm: None,
            tools: Vec::new(),
            aliases: HashMap::new(),
            callbacks: Vec::new(),
            stop_condition: None,
            max_steps: None,
        }
    }

    pub fn llm(mut self, llm: Arc<dyn llm::LLM + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Lets the model reach `tool` under another name.
    pub fn alias(mut self, alias: &str, tool: &str) -> Self {
        self.aliases.insert(alias.to_string(), tool.to_string());
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn stop_condition(mut self, cond: Box<dyn StopCondition + Send>) -> Self {
        self.stop_condition = Some(cond);
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let mut tool_defs = Vec::new();
        let mut tools = HashMap::new();

        for tool in self.tools {
            let def = tool.definition()?;
            tools.insert(def.name.clone(), tool);
            tool_defs.push(def);
        }

        for (alias, target) in &self.aliases {
            if !tools.contains_key(target) {
                return Err(Error::UnknownAlias {
                    alias: alias.clone(),
                    tool: target.clone(),
                });
            }
        }

        Ok(Agent {
            llm: self
                .llm
                .ok_or(Error::MissingArg("llm is required for agent".to_string()))?,
            tools,
            aliases: self.aliases,
            tool_defs,
            callbacks: self.callbacks,
            stop_condition: self.stop_condition.ok_or(Error::MissingArg(
                "stop_condition is required for agent".to_string(),
            ))?,
            max_steps: self.max_steps,
        })
    }
}
