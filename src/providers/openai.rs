use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use super::base::{Provider, Usage};
use super::configs::{OpenAiProviderConfig, ProviderConfig};
use super::utils::{
    check_openai_context_length_error, messages_to_openai_spec, openai_response_to_message,
    tools_to_openai_spec,
};
use crate::models::message::Message;
use crate::models::tool::ToolDefinition;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiProviderConfig::from_env()?)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow!("Request failed: {}\n{}", status, body))
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<(Message, Usage)> {
        let messages_spec = messages_to_openai_spec(messages);
        let tools_spec = tools_to_openai_spec(tools)?;

        let mut payload = Map::new();
        payload.insert("model".to_string(), json!(self.config.model));
        payload.insert("messages".to_string(), json!(messages_spec));
        if !tools_spec.is_empty() {
            payload.insert("tools".to_string(), json!(tools_spec));
            payload.insert("tool_choice".to_string(), json!("auto"));
        }
        if let Some(temp) = self.config.temperature {
            payload.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            payload.insert("max_tokens".to_string(), json!(tokens));
        }

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "requesting chat completion"
        );
        let response = self.post(Value::Object(payload)).await?;

        // Raise specific error if context length is exceeded
        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err.into());
            }
            return Err(anyhow!("OpenAI API error: {}", error));
        }

        let message = openai_response_to_message(&response)?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::utils::InitialMessageTooLargeError;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: format!("{}/compatible-mode/v1/", server.uri()),
            api_key: "test_api_key".to_string(),
            model: "qwen-plus".to_string(),
            temperature: Some(0.5),
            max_tokens: None,
        }
    }

    async fn setup_mock_server(response: ResponseTemplate) -> (MockServer, OpenAiProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/compatible-mode/v1/chat/completions"))
            .and(header("Authorization", "Bearer test_api_key"))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        let provider = OpenAiProvider::new(config_for(&mock_server)).unwrap();
        (mock_server, provider)
    }

    fn weather_tool() -> ToolDefinition {
        ToolDefinition::new(
            "GetWeather",
            "Gets the current weather for a location",
            json!({
                "type": "object",
                "properties": {
                    "latitude": {"type": "number"},
                    "longitude": {"type": "number"}
                },
                "required": ["latitude", "longitude"]
            }),
        )
    }

    #[test]
    fn test_get_usage() {
        let usage = OpenAiProvider::get_usage(&json!({
            "usage": {"prompt_tokens": 10, "completion_tokens": 20}
        }));
        assert_eq!(usage, Usage::new(Some(10), Some(20), Some(30)));

        assert_eq!(OpenAiProvider::get_usage(&json!({})), Usage::default());
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I assist you today?",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (server, provider) =
            setup_mock_server(ResponseTemplate::new(200).set_body_json(response_body)).await;

        let messages = vec![Message::user("Hello?")?];
        let (message, usage) = provider.complete(&messages, &[]).await?;

        assert_eq!(message.content, "Hello! How can I assist you today?");
        assert!(!message.has_tool_calls());
        assert_eq!(usage, Usage::new(Some(12), Some(15), Some(27)));

        // no tools offered means no tool_choice either
        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body)?;
        assert_eq!(body["model"], "qwen-plus");
        assert_eq!(body["temperature"], json!(0.5));
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert!(body.get("max_tokens").is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_request() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-tool",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "GetWeather",
                            "arguments": "{\"latitude\":22.547,\"longitude\":114.058}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {
                "prompt_tokens": 20,
                "completion_tokens": 15,
                "total_tokens": 35
            }
        });

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/compatible-mode/v1/chat/completions"))
            .and(body_partial_json(json!({
                "tool_choice": "auto",
                "tools": [{"type": "function", "function": {"name": "GetWeather"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let provider = OpenAiProvider::new(config_for(&mock_server))?;

        let messages = vec![Message::user("What's the weather in Shenzhen?")?];
        let (message, usage) = provider.complete(&messages, &[weather_tool()]).await?;

        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].id, "call_123");
        assert_eq!(message.tool_calls[0].name, "GetWeather");
        assert_eq!(usage.total_tokens, Some(35));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_server_error() -> Result<()> {
        let (_server, provider) = setup_mock_server(ResponseTemplate::new(503)).await;

        let err = provider
            .complete(&[Message::user("Hello?")?], &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Server error: 503 Service Unavailable");
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_request_failed() -> Result<()> {
        let (_server, provider) = setup_mock_server(
            ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid api key"}"#),
        )
        .await;

        let err = provider
            .complete(&[Message::user("Hello?")?], &[])
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Request failed: 401 Unauthorized"));
        assert!(text.contains("invalid api key"));
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_error_body() -> Result<()> {
        let (_server, provider) = setup_mock_server(ResponseTemplate::new(200).set_body_json(
            json!({"error": {"code": "context_length_exceeded", "message": "too long"}}),
        ))
        .await;

        let err = provider
            .complete(&[Message::user("Hello?")?], &[])
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<InitialMessageTooLargeError>().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_without_choices() -> Result<()> {
        let (_server, provider) = setup_mock_server(
            ResponseTemplate::new(200).set_body_json(json!({"id": "x", "choices": []})),
        )
        .await;

        let result = provider.complete(&[Message::user("Hello?")?], &[]).await;
        assert!(result.is_err());
        Ok(())
    }
}
