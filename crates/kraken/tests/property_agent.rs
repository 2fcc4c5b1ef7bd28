use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kraken::agent::Agent;
use kraken::models::message::Message;
use kraken::models::tool::{Tool, ToolCall};
use kraken::property_data::{PropertyDataClient, PropertyDataConfig, DEFAULT_FIELDS, FIELDS_PARAM};
use kraken::property_system::PropertySystem;
use kraken::providers::base::{Provider, Usage};

const PROPERTY_ID: &str = "eyJ1ZHBybiI6ICIxOTg0ODc1NCJ9";

/// Plays back a tool request for the property, then summarises the tool output
struct PropertyAnalyst {
    tools_offered: Mutex<Vec<String>>,
}

#[async_trait]
impl Provider for PropertyAnalyst {
    async fn complete(
        &self,
        _system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        self.tools_offered
            .lock()
            .unwrap()
            .extend(tools.iter().map(|t| t.name.clone()));

        let last = messages.last().expect("conversation is never empty");
        let reply = match last.content.iter().find_map(|c| c.as_tool_response_text()) {
            Some(details) => {
                let record: serde_json::Value = serde_json::from_str(&details)?;
                Message::assistant().with_text(format!(
                    "The property is at {}.",
                    record["address"].as_str().unwrap_or("an unknown address")
                ))
            }
            None => Message::assistant().with_tool_request(
                "call_1",
                Ok(ToolCall::new("kraken", json!({"property_id": PROPERTY_ID}))),
            ),
        };
        Ok((reply, Usage::default()))
    }
}

#[tokio::test]
async fn test_agent_answers_from_property_data() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/property-data/properties/{}", PROPERTY_ID)))
        .and(header("x-api-key", "integration-key"))
        .and(header("key", "integration-key"))
        .and(query_param(FIELDS_PARAM, DEFAULT_FIELDS))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"address": "1 Example St"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = PropertyDataClient::new(
        PropertyDataConfig::new("integration-key").with_host(server.uri()),
    )?;
    let provider = Arc::new(PropertyAnalyst {
        tools_offered: Mutex::new(Vec::new()),
    });

    let mut agent = Agent::new(provider.clone());
    agent.add_system(Box::new(PropertySystem::new(client)));

    let conversation = vec![
        Message::system()
            .with_text("Please answer all user questions using the kraken tool for property analysis."),
        Message::user().with_text(format!(
            "what is the closest schools to this property id {}?",
            PROPERTY_ID
        )),
    ];
    let reply = agent.call(&conversation).await?;

    assert_eq!(reply.text(), "The property is at 1 Example St.");
    assert_eq!(
        reply.messages[1].content[0].as_tool_response_text(),
        Some(r#"{"address":"1 Example St"}"#.to_string())
    );
    assert!(provider
        .tools_offered
        .lock()
        .unwrap()
        .iter()
        .all(|name| name == "kraken"));
    Ok(())
}
