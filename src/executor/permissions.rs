//! Command execution permission policy
//!
//! Session-scoped state: an exact-string allowlist plus two flags,
//! guarded by a single lock shared by every read and mutation.

use std::collections::HashSet;
use std::sync::RwLock;

use serde::Serialize;

use super::classifier::{classify_command, RiskTier};

/// Outcome of a permission check.
///
/// `allowed && needs_confirm` is never produced; the four valid states
/// are auto-allowed, ask-user, hard-blocked, and previously-approved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub needs_confirm: bool,
    pub reason: String,
}

impl PermissionDecision {
    fn new(allowed: bool, needs_confirm: bool, reason: impl Into<String>) -> Self {
        Self {
            allowed,
            needs_confirm,
            reason: reason.into(),
        }
    }

    /// Hard block: not allowed and no confirmation offered
    pub fn is_blocked(&self) -> bool {
        !self.allowed && !self.needs_confirm
    }
}

/// Read-only snapshot of the policy state for display.
///
/// Exposes counts only, never the allowlisted command strings.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PermissionSettings {
    pub auto_allow_reads: bool,
    pub dangerous_enabled: bool,
    pub allowlist_count: usize,
}

#[derive(Debug)]
struct PolicyState {
    always_allow: HashSet<String>,
    dangerous_enabled: bool,
    auto_allow_reads: bool,
}

/// Stateful permission policy consulted for every tool call
#[derive(Debug)]
pub struct PermissionPolicy {
    state: RwLock<PolicyState>,
}

impl PermissionPolicy {
    /// Create a policy with safe defaults: empty allowlist, dangerous
    /// commands blocked, safe reads auto-approved.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PolicyState {
                always_allow: HashSet::new(),
                dangerous_enabled: false,
                auto_allow_reads: true,
            }),
        }
    }

    /// Check whether a command may execute.
    ///
    /// The allowlist is consulted before classification and overrides it
    /// entirely, including for commands that classify as dangerous.
    pub fn check_permission(&self, command: &str) -> PermissionDecision {
        let state = self.state.read().unwrap();

        if state.always_allow.contains(command) {
            return PermissionDecision::new(true, false, "Previously approved by user");
        }

        match classify_command(command) {
            RiskTier::Safe => {
                if state.auto_allow_reads {
                    PermissionDecision::new(true, false, "Safe read-only command")
                } else {
                    PermissionDecision::new(false, true, "Needs confirmation")
                }
            }
            RiskTier::NeedsConfirm => {
                PermissionDecision::new(false, true, "Command may modify system state")
            }
            RiskTier::Dangerous => {
                if state.dangerous_enabled {
                    PermissionDecision::new(
                        false,
                        true,
                        "Dangerous command (requires explicit confirmation)",
                    )
                } else {
                    PermissionDecision::new(
                        false,
                        false,
                        "Dangerous command blocked (use /allow-dangerous to enable)",
                    )
                }
            }
        }
    }

    /// Add a command to the always-allow list.
    ///
    /// Matching is exact-string: differently-whitespaced equivalents are
    /// distinct keys.
    pub fn add_to_allowlist(&self, command: impl Into<String>) {
        let command = command.into();
        tracing::info!("Adding command to session allowlist: {}", command);
        self.state.write().unwrap().always_allow.insert(command);
    }

    /// Enable execution of dangerous commands (still gated on confirmation)
    pub fn enable_dangerous(&self) {
        tracing::info!("Dangerous commands enabled for this session");
        self.state.write().unwrap().dangerous_enabled = true;
    }

    /// Disable execution of dangerous commands
    pub fn disable_dangerous(&self) {
        tracing::info!("Dangerous commands disabled");
        self.state.write().unwrap().dangerous_enabled = false;
    }

    /// Set whether safe read-only commands are auto-approved
    pub fn set_auto_allow_reads(&self, enabled: bool) {
        self.state.write().unwrap().auto_allow_reads = enabled;
    }

    /// Clear all previously approved commands
    pub fn clear_allowlist(&self) {
        let mut state = self.state.write().unwrap();
        let count = state.always_allow.len();
        state.always_allow.clear();
        tracing::info!("Cleared {} allowlisted command(s)", count);
    }

    /// Snapshot of the current settings for display
    pub fn settings(&self) -> PermissionSettings {
        let state = self.state.read().unwrap();
        PermissionSettings {
            auto_allow_reads: state.auto_allow_reads,
            dangerous_enabled: state.dangerous_enabled,
            allowlist_count: state.always_allow.len(),
        }
    }
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self::new()
    }
}
