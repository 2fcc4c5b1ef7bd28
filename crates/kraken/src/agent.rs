use anyhow::Result;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::message::{Message, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::prompt_template::{load_prompt, SYSTEM_PROMPT_TEMPLATE};
use crate::providers::base::Provider;
use crate::systems::System;

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
}

impl SystemInfo {
    fn new(name: &str, description: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PromptContext {
    systems: Vec<SystemInfo>,
    instructions: Vec<String>,
}

/// Everything the agent produced while answering a conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    pub messages: Vec<Message>,
}

impl AgentReply {
    /// The text of the final assistant message, empty when there is none
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(Message::text)
            .unwrap_or_default()
    }
}

/// Completions allowed in one reply before the agent gives up on the model
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Agent integrates a foundational LLM with the systems it needs to pilot
pub struct Agent {
    systems: Vec<Box<dyn System>>,
    provider: Arc<dyn Provider>,
    max_turns: usize,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            systems: Vec::new(),
            provider,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Cap the number of completions a single reply may request
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    /// Get all tools from all systems
    fn get_tools(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    /// Find the system that owns a tool
    fn get_system_for_tool(&self, tool_name: &str) -> Option<&dyn System> {
        self.systems
            .iter()
            .find(|sys| sys.has_tool(tool_name))
            .map(|v| &**v)
    }

    /// Dispatch a single tool call to the appropriate system
    async fn dispatch_tool_call(
        &self,
        tool_call: AgentResult<ToolCall>,
    ) -> AgentResult<Vec<Content>> {
        let call = tool_call?;
        let system = self
            .get_system_for_tool(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tracing::info!(system = system.name(), tool = %call.name, "dispatching tool call");
        system.call(call).await
    }

    fn get_system_prompt(&self, instructions: Vec<String>) -> AgentResult<String> {
        let systems = self
            .systems
            .iter()
            .map(|system| {
                SystemInfo::new(system.name(), system.description(), system.instructions())
            })
            .collect();

        let context = PromptContext {
            systems,
            instructions,
        };
        load_prompt(SYSTEM_PROMPT_TEMPLATE, &context)
            .map_err(|e| AgentError::Internal(e.to_string()))
    }

    /// Create a stream that yields each message as it's generated by the agent.
    /// This includes both the assistant's responses and any tool responses.
    ///
    /// System messages in the conversation are folded into the system prompt.
    pub async fn reply(&self, messages: &[Message]) -> Result<BoxStream<'_, Result<Message>>> {
        let (system_messages, mut messages): (Vec<Message>, Vec<Message>) = messages
            .iter()
            .cloned()
            .partition(|message| message.role == Role::System);

        let instructions = system_messages
            .iter()
            .map(Message::text)
            .filter(|text| !text.is_empty())
            .collect();
        let system_prompt = self.get_system_prompt(instructions)?;
        let tools = self.get_tools();
        let max_turns = self.max_turns;

        Ok(Box::pin(async_stream::try_stream! {
            let mut turns = 0;
            loop {
                if turns == max_turns {
                    tracing::warn!(max_turns, "model kept requesting tools");
                    Err::<(), _>(anyhow::anyhow!(
                        "Agent stopped after {} turns without a final answer",
                        max_turns
                    ))?;
                }
                turns += 1;

                let (response, usage) = self.provider.complete(
                    &system_prompt,
                    &messages,
                    &tools,
                ).await?;
                tracing::debug!(?usage, "completion received");

                yield response.clone();

                // Make sure the message above is delivered before tools start running
                tokio::task::yield_now().await;

                let tool_requests: Vec<&ToolRequest> = response.content
                    .iter()
                    .filter_map(|content| content.as_tool_request())
                    .collect();

                if tool_requests.is_empty() {
                    break;
                }

                let futures: Vec<_> = tool_requests
                    .iter()
                    .map(|request| self.dispatch_tool_call(request.tool_call.clone()))
                    .collect();

                let outputs = futures::future::join_all(futures).await;

                let mut message_tool_response = Message::user();
                for (request, output) in tool_requests.iter().zip(outputs.into_iter()) {
                    message_tool_response = message_tool_response.with_tool_response(
                        request.id.clone(),
                        output,
                    );
                }

                yield message_tool_response.clone();

                messages.push(response.clone());
                messages.push(message_tool_response);
            }
        }))
    }

    /// Run the conversation to completion
    pub async fn call(&self, messages: &[Message]) -> Result<AgentReply> {
        let mut stream = self.reply(messages).await?;
        let mut reply = AgentReply::default();
        while let Some(message) = stream.try_next().await? {
            reply.messages.push(message);
        }
        Ok(reply)
    }
}
