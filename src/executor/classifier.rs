//! Command risk classification
//!
//! Pure pattern matching over the command text. Deny patterns win over
//! the safe lists, and anything unrecognized needs confirmation.

use std::sync::LazyLock;

use regex::Regex;

/// Risk tier of a shell command, ordered by increasing caution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskTier {
    /// Read-only, eligible for auto-approval
    Safe,
    /// Modifies state, requires user confirmation
    NeedsConfirm,
    /// Potentially destructive, blocked unless explicitly enabled
    Dangerous,
}

impl RiskTier {
    /// Human-readable description, used as the permission reason
    pub fn description(&self) -> &'static str {
        match self {
            RiskTier::Safe => "Safe read-only command",
            RiskTier::NeedsConfirm => "Command may modify system state",
            RiskTier::Dangerous => "Potentially dangerous command",
        }
    }
}

/// Read-only utilities auto-approved by first token, no argument inspection
const SAFE_COMMANDS: &[&str] = &[
    "ls", "cat", "pwd", "echo", "head", "tail", "grep", "find",
    "which", "whoami", "date", "wc", "sort", "uniq", "diff",
    "env", "printenv", "df", "du", "ps", "top", "tree",
    "file", "stat", "basename", "dirname", "realpath",
];

/// Read-only sub-commands of common tools
static SAFE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^git\s+(status|log|diff|branch|show|remote)",
        r"^npm\s+(list|ls|view|info|outdated)",
        r"^pip\s+(list|show|freeze)",
        r"^cargo\s+(tree|search|check)",
        r"^go\s+(list|version|env)",
        r"^docker\s+(ps|images|inspect|logs)",
        r"^kubectl\s+(get|describe|logs)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid safe pattern"))
    .collect()
});

/// Destructive patterns, checked before everything else
static DANGEROUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"rm\s+(-[rf]*\s+)?/",       // rm -rf / or variations
        r"sudo",                     // any privilege escalation
        r"dd\s+if=",                 // raw disk copies
        r"mkfs",                     // format filesystem
        r":\(\)\{",                  // fork bomb
        r"curl.*\|\s*(sh|bash|zsh)", // pipe download to shell
        r"wget.*\|\s*(sh|bash|zsh)", // pipe download to shell
        r">\s*/dev/sd",              // write to disk device
        r"chmod.*777",               // overly permissive chmod
        r"chown.*-R\s+",             // recursive ownership change
        r"eval.*\$",                 // eval with variables
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid dangerous pattern"))
    .collect()
});

/// Determine the risk tier of a shell command.
///
/// Pure and deterministic: the same input always yields the same tier.
pub fn classify_command(command: &str) -> RiskTier {
    let command = command.trim();

    if command.is_empty() {
        return RiskTier::Dangerous;
    }

    // Dangerous patterns have the highest priority
    if DANGEROUS_PATTERNS.iter().any(|p| p.is_match(command)) {
        return RiskTier::Dangerous;
    }

    // First whitespace-delimited token is the program name
    let Some(first_word) = command.split_whitespace().next() else {
        return RiskTier::Dangerous;
    };

    if SAFE_COMMANDS.contains(&first_word) {
        return RiskTier::Safe;
    }

    if SAFE_PATTERNS.iter().any(|p| p.is_match(command)) {
        return RiskTier::Safe;
    }

    // Anything that might modify state needs confirmation
    RiskTier::NeedsConfirm
}
