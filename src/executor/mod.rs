//! Command trust and execution core
//!
//! Three layers, consulted in order by the agent loop:
//! - [`classifier`] assigns a risk tier to a command string
//! - [`permissions`] turns the tier plus session state into a decision
//! - [`runner`] executes approved commands under a wall-clock budget

pub mod classifier;
pub mod permissions;
pub mod runner;

pub use classifier::{classify_command, RiskTier};
pub use permissions::{PermissionDecision, PermissionPolicy, PermissionSettings};
pub use runner::{CommandRunner, ExecutionResult};
