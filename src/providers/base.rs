use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::tool::ToolDefinition;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Add another completion's counts; a side that was never reported stays `None`
    pub fn accumulate(&mut self, other: &Usage) {
        fn add(total: Option<i32>, more: Option<i32>) -> Option<i32> {
            match (total, more) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            }
        }
        self.input_tokens = add(self.input_tokens, other.input_tokens);
        self.output_tokens = add(self.output_tokens, other.output_tokens);
        self.total_tokens = add(self.total_tokens, other.total_tokens);
    }
}

/// Chat completion backend (any OpenAI compatible endpoint)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send the whole history and return the model's next message.
    ///
    /// An empty `tools` slice means the model is not offered any tool.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<(Message, Usage)>;
}
