use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};

/// A tool the model is allowed to call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A json schema of the function signature
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Provider assigned id, echoed back on the tool result
    pub id: String,
    /// The name of the tool to execute
    pub name: String,
    /// Arguments exactly as the model produced them (JSON text)
    pub arguments: String,
}

impl ToolCall {
    pub fn new<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Decode the raw argument text into the parameter shape a tool expects.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> AgentResult<T> {
        serde_json::from_str(&self.arguments).map_err(|e| {
            AgentError::InvalidParameters(format!(
                "could not decode arguments for {} ({}): {}",
                self.name, self.id, e
            ))
        })
    }
}
