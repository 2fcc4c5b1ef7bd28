use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use kraken::models::message::Message;
use serde::{Deserialize, Serialize};

pub const PROPERTY_AGENT_PATH: &str = "/property/agent";
pub const DEFAULT_PROPERTY_ID: &str = "eyJ1ZHBybiI6ICIxOTg0ODc1NCJ9";
pub const SYSTEM_INSTRUCTION: &str =
    "Please answer all user questions using the kraken tool for property analysis.";
const WELCOME_MESSAGE: &str = "Welcome to the property agent!";

// Every parameter is optional; the defaults reproduce the original fixed question
#[derive(Debug, Default, Deserialize)]
struct PropertyAgentQuery {
    property_id: Option<String>,
    question: Option<String>,
    fields: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PropertyAgentResponse {
    message: String,
    path: String,
    result: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

fn default_question(property_id: &str) -> String {
    format!(
        "what is the closest schools to this property id {}?",
        property_id
    )
}

fn build_conversation(property_id: &str, question: Option<String>) -> Vec<Message> {
    let question = question
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| default_question(property_id));

    vec![
        Message::system().with_text(SYSTEM_INSTRUCTION),
        Message::user().with_text(question),
    ]
}

async fn property_agent(
    State(state): State<AppState>,
    Query(query): Query<PropertyAgentQuery>,
) -> Response {
    let property_id = query
        .property_id
        .unwrap_or_else(|| DEFAULT_PROPERTY_ID.to_string());
    if property_id.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "property_id must not be empty",
        );
    }

    let fields = query
        .fields
        .as_deref()
        .map(str::trim)
        .filter(|fields| !fields.is_empty());
    let agent = state.agent(fields);
    let messages = build_conversation(&property_id, query.question);

    tracing::info!(%property_id, "asking the property agent");
    match agent.call(&messages).await {
        Ok(reply) => Json(PropertyAgentResponse {
            message: WELCOME_MESSAGE.to_string(),
            path: PROPERTY_AGENT_PATH.to_string(),
            result: reply.text(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Property agent failed: {:#}", e);
            error_response(
                StatusCode::BAD_GATEWAY,
                "agent_failed",
                "The property agent could not produce an answer",
            )
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(PROPERTY_AGENT_PATH, get(property_agent))
        .with_state(state)
}
