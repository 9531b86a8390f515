//! Agent session state
//!
//! One session owns the conversation, the permission policy, and the
//! command runner. Nothing here is global: concurrent sessions cannot
//! cross-talk.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::executor::{CommandRunner, PermissionPolicy};
use crate::llm::ChatMessage;

/// A single interactive session.
///
/// The conversation list is owned exclusively by the session's turn loop;
/// it must not be mutated from outside while a turn is in flight.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Ordered conversation history, starting with the system prompt
    pub messages: Vec<ChatMessage>,
    /// Permission state for this session (allowlist + flags)
    pub policy: PermissionPolicy,
    /// Bounded command executor
    pub runner: CommandRunner,
    /// Cancellation signal shared by model calls and subprocesses
    pub cancel: CancellationToken,
    system_prompt: String,
}

impl Session {
    /// Start a session with an empty allowlist and default flags
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!("Starting session {} at {}", id, started_at.to_rfc3339());

        Self {
            id,
            started_at,
            messages: vec![ChatMessage::system(&system_prompt)],
            policy: PermissionPolicy::new(),
            runner: CommandRunner::new(),
            cancel: CancellationToken::new(),
            system_prompt,
        }
    }

    /// Clear the conversation, keeping permission state.
    ///
    /// The system prompt is reinstated as the first message.
    pub fn clear_conversation(&mut self) {
        self.messages.clear();
        self.messages.push(ChatMessage::system(&self.system_prompt));
    }

    /// Replace the cancellation token after a cancelled turn so the next
    /// turn starts uncancelled.
    pub fn reset_cancel(&mut self) {
        self.cancel = CancellationToken::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_has_system_prompt() {
        let session = Session::new("be helpful");
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0], ChatMessage::system("be helpful"));
        assert_eq!(session.policy.settings().allowlist_count, 0);
    }

    #[test]
    fn test_clear_keeps_policy() {
        let mut session = Session::new("sys");
        session.messages.push(ChatMessage::user("hi"));
        session.policy.add_to_allowlist("npm install express");

        session.clear_conversation();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.policy.settings().allowlist_count, 1);
    }
}
