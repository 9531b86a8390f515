//! Terminal I/O with colored formatting
//!
//! The console is also the interactive confirmation collaborator and the
//! turn observer: it renders permission prompts, command activity, and
//! results for the user.

use std::io::{self, Write};

use colored::*;

use crate::agent::{parse_confirmation, Confirmation, ConfirmationHandler, TurnObserver};
use crate::executor::PermissionSettings;
use crate::llm::Usage;
use crate::search::{KeyRotation, SearchResult};

/// Console handles all terminal I/O
pub struct Console {
    assistant_color: Color,
    command_color: Color,
}

impl Console {
    pub fn new() -> Self {
        Self {
            assistant_color: Color::Green,
            command_color: Color::Magenta,
        }
    }

    /// Print the interactive-mode banner
    pub fn print_banner(&self, model: &str, web_provider: Option<&str>) {
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", "  shellpilot - Interactive Mode".bright_blue().bold());
        println!("{}", "=".repeat(60).bright_blue());
        println!("Model: {}", model);
        if let Some(provider) = web_provider {
            println!("Web search: enabled (provider: {})", provider);
        }
        println!("Type /help for commands, /exit to quit");
        println!("Tip: End a line with \\ for multiline input");
        println!();
    }

    /// Read a line of input with the given prompt
    pub fn read_input(&self, prompt: &str) -> io::Result<String> {
        print!("{} ", prompt.cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF behaves like /exit
            return Ok("/exit".to_string());
        }
        Ok(input.trim_end_matches(['\n', '\r']).to_string())
    }

    pub fn print_assistant(&self, content: &str) {
        println!("{}", content.trim().color(self.assistant_color));
    }

    /// Print a chunk of a streaming response without a newline
    pub fn print_assistant_chunk(&self, chunk: &str) {
        print!("{}", chunk.color(self.assistant_color));
        let _ = io::stdout().flush();
    }

    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    pub fn println(&self) {
        println!();
    }

    /// Print the interactive command help
    pub fn print_help(&self) {
        println!();
        println!("Commands:");
        let entries = [
            ("/exit, /quit, /q", "Exit interactive mode"),
            ("/clear, /c", "Clear conversation history"),
            ("/help, /h", "Show this help"),
            ("/model [name]", "Show or switch the model"),
            ("/web <query>", "Search web and ask about results"),
            ("/web on", "Enable auto web search for all messages"),
            ("/web off", "Disable auto web search"),
            ("/web <provider>", "Switch provider (tavily, linkup, brave)"),
            ("/allow-dangerous", "Allow dangerous commands (with confirmation)"),
            ("/show-permissions", "Show command execution permissions"),
            ("/clear-allowlist", "Forget always-approved commands"),
        ];
        for (cmd, desc) in entries {
            println!("  {:<24} {}", cmd, desc);
        }
        println!();
    }

    /// Display the permission settings snapshot
    pub fn show_permission_settings(&self, settings: &PermissionSettings) {
        println!();
        println!("{}", "Command execution permissions".bold());
        println!(
            "  Auto-allow read-only commands: {}",
            on_off(settings.auto_allow_reads)
        );
        println!(
            "  Dangerous commands: {}",
            if settings.dangerous_enabled {
                "enabled (confirmation required)".yellow().to_string()
            } else {
                "blocked".green().to_string()
            }
        );
        println!("  Always-approved commands: {}", settings.allowlist_count);
        println!();
    }

    /// Display token usage statistics
    pub fn show_usage(&self, usage: &Usage) {
        println!("{}", "Tokens".bold());
        println!("  Input:  {}", usage.prompt_tokens);
        println!("  Output: {}", usage.completion_tokens);
        println!("  Total:  {}", usage.total_tokens);
    }

    /// Display available models, marking the current one
    pub fn show_models(&self, models: &[String], current: &str) {
        println!("Available models:");
        for m in models {
            if m == current {
                println!("  * {} (current)", m);
            } else {
                println!("    {}", m);
            }
        }
    }

    /// Display web search citations
    pub fn show_citations(&self, results: &[SearchResult]) {
        println!("{}", "Sources".bold());
        for (i, r) in results.iter().enumerate() {
            println!("[{}] {} - {}", i + 1, r.title, r.url);
        }
    }

    /// Report key rotations that happened during a search
    pub fn show_key_rotations(&self, provider: &str, rotations: &[KeyRotation]) {
        for r in rotations {
            eprintln!(
                "Note: {} API key {}/{} failed, switching to key {}/{}",
                provider, r.from_index, r.total, r.to_index, r.total
            );
        }
    }

    pub fn show_searching(&self, query: &str) {
        eprintln!("Searching web for: {}", query);
    }

    pub fn show_search_results(&self, count: usize) {
        eprintln!("Found {} results", count);
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

fn on_off(value: bool) -> ColoredString {
    if value {
        "on".green()
    } else {
        "off".red()
    }
}

impl ConfirmationHandler for Console {
    fn confirm(&self, command: &str, reasoning: &str) -> Confirmation {
        println!();
        println!("{}", "─".repeat(60).yellow());
        println!(
            "{} The assistant wants to run a command:",
            "Confirmation required".yellow().bold()
        );
        println!();
        println!("  {}", command.color(self.command_color).bold());
        println!("  {}", reasoning.bright_black());
        println!();
        println!("  [y] Run once   [a] Always allow this command   [n] Deny");
        println!("{}", "─".repeat(60).yellow());
        print!("{} ", "Your choice (y/n/a):".yellow().bold());
        let _ = io::stdout().flush();

        let mut input = String::new();
        let decision = match io::stdin().read_line(&mut input) {
            Ok(_) => parse_confirmation(&input),
            Err(_) => Confirmation::DENY,
        };

        if decision.allow {
            if decision.always {
                println!("{}", "Allowed (always for this session)".green());
            } else {
                println!("{}", "Allowed".green());
            }
        } else {
            println!("{}", "Denied".red());
        }
        println!();

        decision
    }
}

impl TurnObserver for Console {
    fn on_command_executing(&self, command: &str) {
        println!(
            "{} {}",
            "Running:".color(self.command_color).bold(),
            command
        );
    }

    fn on_command_blocked(&self, command: &str, reason: &str) {
        println!(
            "{} {}\n  {}",
            "Blocked:".red().bold(),
            command,
            reason.bright_black()
        );
    }

    fn on_command_denied(&self, command: &str) {
        tracing::debug!("User denied command: {}", command);
    }

    fn on_command_output(&self, output: &str) {
        if output.is_empty() {
            return;
        }
        // Truncate long output on screen; the model still sees all of it
        let display = if output.len() > 500 {
            let head: String = output.chars().take(500).collect();
            format!("{}...\n(output truncated)", head)
        } else {
            output.to_string()
        };
        println!("{}", display.bright_black());
    }

    fn on_command_failed(&self, _command: &str, detail: &str) {
        println!("{} {}", "Command error:".red().bold(), detail);
    }
}
