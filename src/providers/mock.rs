use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::ToolDefinition;
use crate::providers::base::{Provider, Usage};

/// What the mock was asked for on one `complete` call
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Mutex<VecDeque<Result<Message, String>>>,
    repeat: Option<Message>,
    requests: Mutex<Vec<MockRequest>>,
}

impl MockProvider {
    /// Replay `responses` in order, failing once they run out
    pub fn new(responses: Vec<Message>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// Like `new`, but individual turns may be transport failures
    pub fn scripted(responses: Vec<Result<Message, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same message
    pub fn always(response: Message) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<(Message, Usage)> {
        self.requests.lock().unwrap().push(MockRequest {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });

        let next = self.responses.lock().unwrap().pop_front();
        let usage = Usage::new(Some(10), Some(5), Some(15));
        match (next, &self.repeat) {
            (Some(Ok(message)), _) => Ok((message, usage)),
            (Some(Err(error)), _) => Err(anyhow!(error)),
            (None, Some(message)) => Ok((message.clone(), usage)),
            (None, None) => Err(anyhow!("mock provider has no responses left")),
        }
    }
}
