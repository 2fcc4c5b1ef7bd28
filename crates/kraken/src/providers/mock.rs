use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::{Provider, Usage};

/// What the agent sent for one completion
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// Plays back scripted assistant messages in order and records every request.
/// Once the script runs out it answers with an empty assistant message.
pub struct MockProvider {
    script: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new(script: Vec<Message>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        self.requests.lock().unwrap().push(CompletionRequest {
            system: system.to_string(),
            messages: messages.to_vec(),
            tools: tools.iter().map(|tool| tool.name.clone()).collect(),
        });

        let next = self.script.lock().unwrap().pop_front();
        Ok((next.unwrap_or_else(Message::assistant), Usage::default()))
    }
}

/// A model that never settles on an answer and requests the same tool every turn
pub struct PersistentToolRequester {
    tool: String,
    completions: Mutex<usize>,
}

impl PersistentToolRequester {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            completions: Mutex::new(0),
        }
    }

    pub fn completions(&self) -> usize {
        *self.completions.lock().unwrap()
    }
}

#[async_trait]
impl Provider for PersistentToolRequester {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let mut completions = self.completions.lock().unwrap();
        *completions += 1;
        let id = format!("call_{}", *completions);
        Ok((
            Message::assistant().with_tool_request(
                id,
                Ok(ToolCall::new(&self.tool, json!({"message": "again"}))),
            ),
            Usage::default(),
        ))
    }
}
