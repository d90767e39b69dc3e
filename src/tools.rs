//! Tools the model may call, and the registry the agent dispatches through.
pub mod weather;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{ToolCall, ToolDefinition};
use weather::WeatherTool;

/// A capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema sent with every request
    fn definition(&self) -> ToolDefinition;

    /// Run the tool for a call the model made, returning text for the model to read
    async fn call(&self, call: &ToolCall) -> AgentResult<String>;
}

/// Static name → tool mapping, filled once before a run starts.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by the binary: a single `GetWeather` tool.
    pub fn with_weather(weather: WeatherTool) -> Self {
        Self {
            tools: vec![Box::new(weather)],
        }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) -> AgentResult<()> {
        let name = tool.definition().name;
        if self.get(&name).is_some() {
            return Err(AgentError::DuplicateTool(name));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.definition().name == name)
            .map(|tool| &**tool)
    }

    /// Route a call to the tool with exactly the same name
    pub async fn dispatch(&self, call: &ToolCall) -> AgentResult<String> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;
        debug!(tool = %call.name, id = %call.id, "dispatching tool call");
        tool.call(call).await
    }
}
