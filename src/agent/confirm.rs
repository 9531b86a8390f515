//! Confirmation and observation seams for the turn loop
//!
//! Confirmation is deliberately synchronous: the loop blocks on the
//! user's answer before touching the next tool call, which is what keeps
//! tool messages in request order.

/// The user's answer to a confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    /// Execute this command now
    pub allow: bool,
    /// Also add it to the session allowlist
    pub always: bool,
}

impl Confirmation {
    pub const DENY: Confirmation = Confirmation {
        allow: false,
        always: false,
    };

    pub const ALLOW_ONCE: Confirmation = Confirmation {
        allow: true,
        always: false,
    };

    pub const ALLOW_ALWAYS: Confirmation = Confirmation {
        allow: true,
        always: true,
    };
}

/// Map a textual answer to a confirmation decision.
///
/// `y`/`yes` allows once, `a`/`always` allows and remembers, anything
/// else (including empty input) denies.
pub fn parse_confirmation(input: &str) -> Confirmation {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Confirmation::ALLOW_ONCE,
        "a" | "always" => Confirmation::ALLOW_ALWAYS,
        _ => Confirmation::DENY,
    }
}

/// Collaborator that asks the user whether a command may run
pub trait ConfirmationHandler: Send + Sync {
    /// Present `command` and the model's `reasoning`, block for an answer
    fn confirm(&self, command: &str, reasoning: &str) -> Confirmation;
}

/// UI notifications emitted while a turn is processed.
///
/// All methods default to no-ops so headless callers can ignore them.
pub trait TurnObserver: Send + Sync {
    fn on_command_executing(&self, _command: &str) {}
    fn on_command_blocked(&self, _command: &str, _reason: &str) {}
    fn on_command_denied(&self, _command: &str) {}
    fn on_command_output(&self, _output: &str) {}
    fn on_command_failed(&self, _command: &str, _detail: &str) {}
}

/// Observer that ignores every event
#[derive(Debug, Default)]
pub struct NullObserver;

impl TurnObserver for NullObserver {}
