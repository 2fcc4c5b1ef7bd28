use async_trait::async_trait;
use indoc::indoc;
use serde_json::{json, Value};

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};
use crate::property_data::PropertyDataClient;
use crate::systems::System;

pub const KRAKEN_TOOL: &str = "kraken";

/// Exposes the Street Group Property Data API to the agent as the `kraken` tool
pub struct PropertySystem {
    tools: Vec<Tool>,
    client: PropertyDataClient,
}

impl PropertySystem {
    pub fn new(client: PropertyDataClient) -> Self {
        let kraken_tool = Tool::new(
            KRAKEN_TOOL,
            "Fetches property details from the Street Group Property Data API",
            json!({
                "type": "object",
                "required": ["property_id"],
                "properties": {
                    "property_id": {
                        "type": "string",
                        "description": "The property ID to fetch details for."
                    },
                    "fields": {
                        "type": "string",
                        "default": null,
                        "description": "Optional comma separated list of property fields to request. Defaults to every field."
                    }
                }
            }),
        );

        Self {
            tools: vec![kraken_tool],
            client,
        }
    }

    async fn kraken(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let property_id = arguments
            .get("property_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AgentError::InvalidParameters("The property_id string is required".into())
            })?;

        let details = match arguments.get("fields").and_then(|v| v.as_str()) {
            Some(fields) if !fields.trim().is_empty() => {
                self.client.lookup_with_fields(property_id, fields).await
            }
            _ => self.client.lookup(property_id).await,
        };

        Ok(vec![Content::text(details)])
    }
}

#[async_trait]
impl System for PropertySystem {
    fn name(&self) -> &str {
        "street"
    }

    fn description(&self) -> &str {
        "Property records from the Street Group Property Data API"
    }

    fn instructions(&self) -> &str {
        indoc! {r#"
            Use the kraken tool with a property ID to fetch everything known about a property:
            address, valuations, schools, transport, flood risk, planning and transaction history.
            The tool returns the property record as JSON. If the result starts with
            "Error fetching property details:" the lookup failed; tell the user instead of guessing.
        "#}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        match tool_call.name.as_str() {
            KRAKEN_TOOL => self.kraken(tool_call.arguments).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}
