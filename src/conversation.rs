use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::role::Role;

/// Ordered, append-only history of a single session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Copy of the history. Changes to the returned vector never reach the store.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every tool message must answer a call made by the assistant message
    /// that opens its block (tool messages may follow one another).
    pub fn check_tool_pairing(&self) -> AgentResult<()> {
        let mut owner: Option<&Message> = None;
        for (index, message) in self.messages.iter().enumerate() {
            match message.role {
                Role::Tool => {
                    let call_id = message.tool_call_id.as_deref().unwrap_or_default();
                    let paired = owner
                        .map(|assistant| assistant.tool_calls.iter().any(|c| c.id == call_id))
                        .unwrap_or(false);
                    if !paired {
                        return Err(AgentError::Internal(format!(
                            "tool message {} references unknown tool call id '{}'",
                            index, call_id
                        )));
                    }
                }
                Role::Assistant => owner = Some(message),
                _ => owner = None,
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Number of messages: {}", self.messages.len())];
        for (i, message) in self.messages.iter().enumerate() {
            lines.push(format!("Message {}: {}", i, message.summary()));
        }
        lines.join("\n")
    }
}
