use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::conversation::Conversation;
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::providers::base::{Provider, Usage};
use crate::tools::ToolRegistry;

pub const DEFAULT_MAX_LOOPS: usize = 5;

/// Where a run stands after the latest model response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    HasToolCall,
    ExecutingTool,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model answered without asking for a tool
    Completed,
    /// The model still wanted a tool but the loop bound was reached
    LoopLimit,
}

/// Everything a run carries from one iteration to the next.
#[derive(Debug, Clone)]
pub struct RunState {
    /// History sent with the latest request
    pub conversation: Conversation,
    /// Latest model response, not yet part of the history
    pub response: Message,
    /// Tool rounds completed so far
    pub round: usize,
    pub completions: usize,
    pub usage: Usage,
}

impl RunState {
    fn new(conversation: Conversation, response: Message, usage: Usage) -> Self {
        Self {
            conversation,
            response,
            round: 0,
            completions: 1,
            usage,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Text of the last assistant message
    pub content: String,
    pub stop_reason: StopReason,
    pub rounds: usize,
    /// Number of gateway calls made
    pub completions: usize,
    pub usage: Usage,
    pub final_message: Message,
    pub conversation: Conversation,
}

pub enum Transition {
    Continue(RunState),
    Done(RunOutcome),
}

/// Drives the model ⇄ tool cycle until the model stops asking for tools.
pub struct Agent {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    max_loops: usize,
    system_prompt: Option<String>,
    use_tools: bool,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            max_loops: DEFAULT_MAX_LOOPS,
            system_prompt: None,
            use_tools: true,
        }
    }

    /// Upper bound on tool rounds; the run makes at most `max_loops + 1` completions
    pub fn with_max_loops(mut self, max_loops: usize) -> Self {
        self.max_loops = max_loops;
        self
    }

    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Plain chat: the model is never offered the registered tools
    pub fn without_tools(mut self) -> Self {
        self.use_tools = false;
        self
    }

    /// Start a fresh session for `prompt` and run it to completion
    pub async fn run(&self, prompt: &str) -> AgentResult<RunOutcome> {
        self.run_with(Conversation::new(), prompt).await
    }

    /// Run `prompt` reusing `conversation`'s storage. Earlier messages are
    /// cleared first so every run starts a new session.
    pub async fn run_with(
        &self,
        mut conversation: Conversation,
        prompt: &str,
    ) -> AgentResult<RunOutcome> {
        conversation.clear();
        if let Some(system) = &self.system_prompt {
            conversation.append(Message::system(system.as_str())?);
        }
        conversation.append(Message::user(prompt)?);

        let (response, usage) = self.complete(&conversation).await?;
        let mut state = RunState::new(conversation, response, usage);

        loop {
            state = match self.advance(state).await? {
                Transition::Continue(next) => next,
                Transition::Done(outcome) => return Ok(outcome),
            };
        }
    }

    /// What the loop will do with the state's latest response
    pub fn classify(&self, state: &RunState) -> LoopState {
        if !state.response.has_tool_calls() || state.round >= self.max_loops {
            LoopState::Done
        } else {
            LoopState::HasToolCall
        }
    }

    /// Run one iteration: finish, or execute the requested tool and ask the model again.
    pub async fn advance(&self, mut state: RunState) -> AgentResult<Transition> {
        info!(
            round = state.round,
            tool_calls = state.response.tool_calls.len(),
            "model responded"
        );
        debug!("conversation:\n{}", state.conversation.summary());

        if self.classify(&state) == LoopState::Done {
            let stop_reason = if state.response.has_tool_calls() {
                warn!(max_loops = self.max_loops, "loop limit reached with a pending tool call");
                StopReason::LoopLimit
            } else {
                StopReason::Completed
            };
            return Ok(Transition::Done(RunOutcome {
                content: state.response.content.clone(),
                stop_reason,
                rounds: state.round,
                completions: state.completions,
                usage: state.usage,
                final_message: state.response,
                conversation: state.conversation,
            }));
        }

        let mut calls = state.response.tool_calls.clone().into_iter();
        let call = calls
            .next()
            .ok_or_else(|| AgentError::Internal("tool call list is empty".to_string()))?;
        let ignored = calls.count();
        if ignored > 0 {
            warn!(ignored, "only the first tool call of a response is executed");
        }

        info!(
            state = ?LoopState::ExecutingTool,
            tool = %call.name,
            arguments = %call.arguments,
            "executing tool"
        );
        let output = self.tools.dispatch(&call).await?;
        debug!(bytes = output.len(), "tool finished");

        state.conversation.append(Message::assistant_with_tool_calls(
            state.response.content.as_str(),
            vec![call.clone()],
        )?);
        state
            .conversation
            .append(Message::tool_result(output, call.name, call.id)?);
        state.conversation.check_tool_pairing()?;

        debug!(state = ?LoopState::AwaitingModel, "sending tool result to the model");
        let (response, usage) = self.complete(&state.conversation).await?;
        state.response = response;
        state.round += 1;
        state.completions += 1;
        state.usage.accumulate(&usage);

        Ok(Transition::Continue(state))
    }

    async fn complete(&self, conversation: &Conversation) -> AgentResult<(Message, Usage)> {
        let tools = if self.use_tools {
            self.tools.definitions()
        } else {
            Vec::new()
        };
        self.provider
            .complete(&conversation.snapshot(), &tools)
            .await
            .map_err(|e| AgentError::Provider(format!("{:#}", e)))
    }
}
