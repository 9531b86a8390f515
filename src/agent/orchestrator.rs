//! The agent turn loop
//!
//! Drives repeated model rounds: send the conversation, process any tool
//! calls strictly in request order, feed results back, repeat until the
//! model answers with plain content.
//!
//! Ordering invariant: for every assistant message carrying N tool calls,
//! N tool messages are appended (in the same order) before the next model
//! call. The single exception is a call whose arguments fail to parse,
//! which is logged and skipped.

use crate::core::{AgentError, AgentResult};
use crate::llm::{
    default_toolset, ChatMessage, ChatProvider, ExecuteCommandArgs, EXECUTE_COMMAND_TOOL,
};
use crate::llm::tools::ToolDefinition;

use super::confirm::{ConfirmationHandler, NullObserver, TurnObserver};
use super::session::Session;

/// Tool message content for a successful command with no output
pub const NO_OUTPUT_SENTINEL: &str = "Command executed successfully (no output)";

static NULL_OBSERVER: NullObserver = NullObserver;

/// Drives tool-calling turns against a model provider
pub struct Orchestrator<'a, P: ChatProvider + ?Sized> {
    provider: &'a P,
    confirmer: &'a dyn ConfirmationHandler,
    observer: &'a dyn TurnObserver,
    tools: Vec<ToolDefinition>,
}

impl<'a, P: ChatProvider + ?Sized> Orchestrator<'a, P> {
    /// Create an orchestrator with no UI observer
    pub fn new(provider: &'a P, confirmer: &'a dyn ConfirmationHandler) -> Self {
        Self {
            provider,
            confirmer,
            observer: &NULL_OBSERVER,
            tools: default_toolset(),
        }
    }

    /// Attach an observer for UI notifications
    pub fn with_observer(mut self, observer: &'a dyn TurnObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run one user turn to completion and return the model's final text.
    ///
    /// On transport failure the conversation is restored to its pre-turn
    /// state so the session only ever reflects confirmed exchanges.
    pub async fn run_turn(&self, session: &mut Session, user_input: &str) -> AgentResult<String> {
        let checkpoint = session.messages.len();
        session.messages.push(ChatMessage::user(user_input));

        match self.drive(session).await {
            Ok(content) => Ok(content),
            Err(e) => {
                tracing::warn!(
                    "Turn failed, rolling conversation back to {} message(s): {}",
                    checkpoint,
                    e
                );
                session.messages.truncate(checkpoint);
                Err(e)
            }
        }
    }

    /// The model round loop
    async fn drive(&self, session: &mut Session) -> AgentResult<String> {
        loop {
            let response = tokio::select! {
                biased;
                _ = session.cancel.cancelled() => return Err(AgentError::Interrupted),
                result = self.provider.complete(&session.messages, &self.tools) => result?,
            };

            let tool_calls = response.tool_calls().to_vec();

            if tool_calls.is_empty() {
                // Terminal round: plain content
                let content = response.content().to_string();
                if !content.is_empty() {
                    session.messages.push(ChatMessage::assistant(&content));
                }
                return Ok(content);
            }

            tracing::info!("Model requested {} tool call(s)", tool_calls.len());
            session
                .messages
                .push(ChatMessage::assistant_with_tool_calls(tool_calls.clone()));

            // Strictly sequential: each call is resolved and answered
            // before the next one is looked at.
            for call in &tool_calls {
                if call.function.name != EXECUTE_COMMAND_TOOL {
                    tracing::warn!("Model called unknown tool: {}", call.function.name);
                    session.messages.push(ChatMessage::tool(
                        &call.id,
                        format!("Unknown tool: {}", call.function.name),
                    ));
                    continue;
                }

                let args: ExecuteCommandArgs = match serde_json::from_str(&call.function.arguments)
                {
                    Ok(args) => args,
                    Err(e) => {
                        // Degraded but non-fatal: this call gets no tool
                        // message; remaining calls are still processed.
                        tracing::warn!(
                            "Failed to parse tool arguments for call {}: {}",
                            call.id,
                            e
                        );
                        continue;
                    }
                };

                let content = self.process_command(session, &args).await;
                session.messages.push(ChatMessage::tool(&call.id, content));
            }
        }
    }

    /// Resolve one command through policy, confirmation, and execution.
    ///
    /// Always yields tool-message content; blocks, denials, and command
    /// failures are reported to the model rather than raised.
    async fn process_command(&self, session: &Session, args: &ExecuteCommandArgs) -> String {
        let decision = session.policy.check_permission(&args.command);

        if decision.is_blocked() {
            tracing::info!("Command blocked: {} ({})", args.command, decision.reason);
            self.observer.on_command_blocked(&args.command, &decision.reason);
            return format!("Command blocked: {}", decision.reason);
        }

        if decision.needs_confirm {
            let confirmation = self.confirmer.confirm(&args.command, &args.reasoning);
            if !confirmation.allow {
                tracing::info!("Command denied by user: {}", args.command);
                self.observer.on_command_denied(&args.command);
                return "Command execution denied by user".to_string();
            }
            if confirmation.always {
                session.policy.add_to_allowlist(&args.command);
            }
        }

        self.observer.on_command_executing(&args.command);

        match session.runner.execute(&args.command, &session.cancel).await {
            Ok(result) => {
                if result.is_success() {
                    self.observer.on_command_output(&result.output);
                    if result.output.is_empty() {
                        NO_OUTPUT_SENTINEL.to_string()
                    } else {
                        result.output
                    }
                } else {
                    let summary = result.format_result();
                    self.observer.on_command_failed(&args.command, &summary);
                    summary
                }
            }
            Err(e) => {
                let summary = format!("Failed to execute command: {}", e);
                self.observer.on_command_failed(&args.command, &summary);
                summary
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::agent::confirm::test_support::{CountingObserver, ScriptedConfirmer};
    use crate::agent::confirm::Confirmation;
    use crate::llm::types::{ChatResponse, Choice, ResponseMessage, ToolCall};

    use super::*;

    /// Provider that replays a fixed sequence of responses
    struct ScriptedProvider {
        rounds: Mutex<Vec<AgentResult<ChatResponse>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedProvider {
        fn new(rounds: Vec<AgentResult<ChatResponse>>) -> Self {
            Self {
                rounds: Mutex::new(rounds),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> AgentResult<ChatResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let mut rounds = self.rounds.lock().unwrap();
            if rounds.is_empty() {
                return Ok(text_response("done"));
            }
            rounds.remove(0)
        }
    }

    fn text_response(content: &str) -> ChatResponse {
        ChatResponse {
            id: "resp".into(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    content: Some(content.to_string()),
                    tool_calls: Vec::new(),
                },
                delta: Default::default(),
                finish_reason: Some("stop".into()),
            }],
            usage: None,
        }
    }

    fn tool_response(calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse {
            id: "resp".into(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    content: None,
                    tool_calls: calls,
                },
                delta: Default::default(),
                finish_reason: Some("tool_calls".into()),
            }],
            usage: None,
        }
    }

    fn command_call(id: &str, command: &str) -> ToolCall {
        ToolCall::new(
            id,
            EXECUTE_COMMAND_TOOL,
            serde_json::json!({"command": command, "reasoning": "test"}).to_string(),
        )
    }

    #[tokio::test]
    async fn test_plain_content_round_is_terminal() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("hello"))]);
        let confirmer = ScriptedConfirmer::new(vec![]);
        let orchestrator = Orchestrator::new(&provider, &confirmer);
        let mut session = Session::new("sys");

        let content = orchestrator.run_turn(&mut session, "hi").await.unwrap();
        assert_eq!(content, "hello");
        // system + user + assistant
        assert_eq!(session.messages.len(), 3);
        assert_eq!(session.messages[2], ChatMessage::assistant("hello"));
    }

    #[tokio::test]
    async fn test_deny_first_approve_second() {
        // Two calls: A denied, B approved. Exactly one assistant message
        // with both calls, two tool messages in order, one execution.
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![
                command_call("call_a", "touch /tmp/a"),
                command_call("call_b", "true"),
            ])),
            Ok(text_response("finished")),
        ]);
        let confirmer =
            ScriptedConfirmer::new(vec![Confirmation::DENY, Confirmation::ALLOW_ONCE]);
        let observer = CountingObserver::default();
        let orchestrator = Orchestrator::new(&provider, &confirmer).with_observer(&observer);
        let mut session = Session::new("sys");

        let content = orchestrator.run_turn(&mut session, "do things").await.unwrap();
        assert_eq!(content, "finished");

        // system, user, assistant(tool_calls), tool A, tool B, assistant(text)
        assert_eq!(session.messages.len(), 6);
        match &session.messages[2] {
            ChatMessage::Assistant { tool_calls, content } => {
                assert_eq!(tool_calls.len(), 2);
                assert!(content.is_none());
            }
            other => panic!("expected assistant with tool calls, got {:?}", other),
        }
        assert_eq!(
            session.messages[3],
            ChatMessage::tool("call_a", "Command execution denied by user")
        );
        assert_eq!(
            session.messages[4],
            ChatMessage::tool("call_b", NO_OUTPUT_SENTINEL)
        );

        // Executor invoked exactly once, for B
        assert_eq!(*observer.executed.lock().unwrap(), vec!["true".to_string()]);
    }

    #[tokio::test]
    async fn test_always_adds_to_allowlist() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![command_call("call_1", "true")])),
            Ok(tool_response(vec![command_call("call_2", "true")])),
            Ok(text_response("ok")),
        ]);
        let confirmer = ScriptedConfirmer::new(vec![Confirmation::ALLOW_ALWAYS]);
        let orchestrator = Orchestrator::new(&provider, &confirmer);
        let mut session = Session::new("sys");

        orchestrator.run_turn(&mut session, "go").await.unwrap();

        // Second invocation hit the allowlist, so only one question asked
        assert_eq!(confirmer.asked.lock().unwrap().len(), 1);
        assert_eq!(session.policy.settings().allowlist_count, 1);
        assert!(session.policy.check_permission("true").allowed);
    }

    #[tokio::test]
    async fn test_blocked_command_never_executes() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![command_call("call_1", "sudo rm -rf /")])),
            Ok(text_response("understood")),
        ]);
        let confirmer = ScriptedConfirmer::new(vec![]);
        let observer = CountingObserver::default();
        let orchestrator = Orchestrator::new(&provider, &confirmer).with_observer(&observer);
        let mut session = Session::new("sys");

        orchestrator.run_turn(&mut session, "wipe it").await.unwrap();

        // No confirmation, no execution, block reported to the model
        assert!(confirmer.asked.lock().unwrap().is_empty());
        assert!(observer.executed.lock().unwrap().is_empty());
        match &session.messages[3] {
            ChatMessage::Tool { content, tool_call_id } => {
                assert_eq!(tool_call_id, "call_1");
                assert!(content.starts_with("Command blocked:"));
            }
            other => panic!("expected tool message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_safe_command_skips_confirmation() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![command_call("call_1", "echo hi")])),
            Ok(text_response("said hi")),
        ]);
        let confirmer = ScriptedConfirmer::new(vec![]);
        let orchestrator = Orchestrator::new(&provider, &confirmer);
        let mut session = Session::new("sys");

        orchestrator.run_turn(&mut session, "greet").await.unwrap();

        assert!(confirmer.asked.lock().unwrap().is_empty());
        match &session.messages[3] {
            ChatMessage::Tool { content, .. } => assert_eq!(content.trim(), "hi"),
            other => panic!("expected tool message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_arguments_skip_call() {
        let bad_call = ToolCall::new("call_bad", EXECUTE_COMMAND_TOOL, "{not json");
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![
                bad_call,
                command_call("call_ok", "echo fine"),
            ])),
            Ok(text_response("done")),
        ]);
        let confirmer = ScriptedConfirmer::new(vec![]);
        let orchestrator = Orchestrator::new(&provider, &confirmer);
        let mut session = Session::new("sys");

        orchestrator.run_turn(&mut session, "go").await.unwrap();

        // The malformed call gets no tool message; the valid one does
        let tool_messages: Vec<_> = session
            .messages
            .iter()
            .filter_map(|m| match m {
                ChatMessage::Tool { tool_call_id, .. } => Some(tool_call_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(tool_messages, vec!["call_ok".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_failure_rolls_back_turn() {
        let provider = ScriptedProvider::new(vec![Err(AgentError::api(503, "unavailable"))]);
        let confirmer = ScriptedConfirmer::new(vec![]);
        let orchestrator = Orchestrator::new(&provider, &confirmer);
        let mut session = Session::new("sys");

        let err = orchestrator.run_turn(&mut session, "hi").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        // Only the system prompt remains
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_mid_turn_transport_failure_restores_pre_turn_state() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![command_call("call_1", "echo hi")])),
            Err(AgentError::api(500, "boom")),
        ]);
        let confirmer = ScriptedConfirmer::new(vec![]);
        let orchestrator = Orchestrator::new(&provider, &confirmer);
        let mut session = Session::new("sys");

        let err = orchestrator.run_turn(&mut session, "hi").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        // Round 1's assistant/tool messages are gone too
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_session_interrupts_turn() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("never seen"))]);
        let confirmer = ScriptedConfirmer::new(vec![]);
        let orchestrator = Orchestrator::new(&provider, &confirmer);
        let mut session = Session::new("sys");
        session.cancel.cancel();

        let err = orchestrator.run_turn(&mut session, "hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Interrupted));
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_command_reported_to_model() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_response(vec![command_call("call_1", "ls /definitely/not/here")])),
            Ok(text_response("noted")),
        ]);
        let confirmer = ScriptedConfirmer::new(vec![]);
        let orchestrator = Orchestrator::new(&provider, &confirmer);
        let mut session = Session::new("sys");

        let content = orchestrator.run_turn(&mut session, "list").await.unwrap();
        assert_eq!(content, "noted");
        match &session.messages[3] {
            ChatMessage::Tool { content, .. } => {
                assert!(content.starts_with("Command failed with exit code"));
            }
            other => panic!("expected tool message, got {:?}", other),
        }
    }
}
