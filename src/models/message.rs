use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::objectid::create_object_id;
use super::role::Role;
use super::tool::ToolCall;
use crate::errors::{AgentError, AgentResult};

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub id: String,
    pub created: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn new(
        role: Role,
        content: String,
        tool_calls: Vec<ToolCall>,
        tool_call_id: Option<String>,
        name: Option<String>,
    ) -> AgentResult<Self> {
        let msg = Self {
            role,
            id: create_object_id("msg"),
            created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default(),
            content,
            tool_calls,
            tool_call_id,
            name,
        };
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> AgentResult<()> {
        if self.role != Role::Assistant && !self.tool_calls.is_empty() {
            return Err(AgentError::InvalidMessage(format!(
                "{} message does not support tool calls",
                self.role
            )));
        }
        match self.role {
            Role::Tool => {
                if self.tool_call_id.as_deref().map_or(true, str::is_empty) {
                    return Err(AgentError::InvalidMessage(
                        "Tool message must reference a tool call id".to_string(),
                    ));
                }
                if self.name.as_deref().map_or(true, str::is_empty) {
                    return Err(AgentError::InvalidMessage(
                        "Tool message must name the tool".to_string(),
                    ));
                }
            }
            _ => {
                if self.tool_call_id.is_some() {
                    return Err(AgentError::InvalidMessage(format!(
                        "{} message does not support a tool call id",
                        self.role
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn system<S: Into<String>>(text: S) -> AgentResult<Self> {
        Self::new(Role::System, text.into(), Vec::new(), None, None)
    }

    pub fn user<S: Into<String>>(text: S) -> AgentResult<Self> {
        Self::new(Role::User, text.into(), Vec::new(), None, None)
    }

    pub fn assistant<S: Into<String>>(text: S) -> AgentResult<Self> {
        Self::new(Role::Assistant, text.into(), Vec::new(), None, None)
    }

    /// Assistant turn that asks for one or more tools to be run
    pub fn assistant_with_tool_calls<S: Into<String>>(
        text: S,
        tool_calls: Vec<ToolCall>,
    ) -> AgentResult<Self> {
        Self::new(Role::Assistant, text.into(), tool_calls, None, None)
    }

    /// Tool output, keyed to the call that produced it
    pub fn tool_result<S, N, I>(output: S, name: N, tool_call_id: I) -> AgentResult<Self>
    where
        S: Into<String>,
        N: Into<String>,
        I: Into<String>,
    {
        Self::new(
            Role::Tool,
            output.into(),
            Vec::new(),
            Some(tool_call_id.into()),
            Some(name.into()),
        )
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Role={}, Content length={}, Tool calls={}",
            self.role,
            self.content.len(),
            self.tool_calls.len()
        )
    }
}
