use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::message::Message;
use crate::models::role::Role;
use crate::models::tool::{ToolCall, ToolDefinition};

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages.iter().map(message_to_openai_spec).collect()
}

fn message_to_openai_spec(message: &Message) -> Value {
    let mut converted = Map::new();
    converted.insert("role".to_string(), json!(message.role));

    // an assistant turn that only calls tools carries no content
    if !message.content.is_empty() || message.tool_calls.is_empty() {
        converted.insert("content".to_string(), json!(message.content));
    }

    if !message.tool_calls.is_empty() {
        let tool_calls: Vec<Value> = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": sanitize_function_name(&call.name),
                        "arguments": call.arguments,
                    }
                })
            })
            .collect();
        converted.insert("tool_calls".to_string(), json!(tool_calls));
    }

    if message.role == Role::Tool {
        if let Some(id) = &message.tool_call_id {
            converted.insert("tool_call_id".to_string(), json!(id));
        }
        if let Some(name) = &message.name {
            converted.insert("name".to_string(), json!(name));
        }
    }

    Value::Object(converted)
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[ToolDefinition]) -> Result<Vec<Value>> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": sanitize_function_name(&tool.name),
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No choices in response: {}", response))?;

    let content = original
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = original.get("tool_calls").and_then(|c| c.as_array()) {
        for call in calls {
            let id = call["id"].as_str().unwrap_or_default();
            let name = call["function"]["name"].as_str().unwrap_or_default();
            // some compatible endpoints send the arguments as an object
            let arguments = match &call["function"]["arguments"] {
                Value::String(text) => text.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            tool_calls.push(ToolCall::new(id, name, arguments));
        }
    }

    Ok(Message::assistant_with_tool_calls(content, tool_calls)?)
}

fn sanitize_function_name(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let re = INVALID.get_or_init(|| {
        Regex::new(r"[^a-zA-Z0-9_-]").expect("function name pattern is valid")
    });
    re.replace_all(name, "_").to_string()
}

#[derive(Debug, thiserror::Error)]
#[error("Input message too long. Message: {0}")]
pub struct InitialMessageTooLargeError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<InitialMessageTooLargeError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(InitialMessageTooLargeError(message))
    } else {
        None
    }
}
