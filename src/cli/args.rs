//! Command-line arguments

use clap::Parser;

/// A CLI agent that proposes and executes shell commands with your approval
#[derive(Parser, Debug)]
#[command(
    name = "shellpilot",
    about = "An AI shell assistant with permission-gated command execution",
    long_about = "shellpilot is a command-line AI assistant that can run shell commands \
                  on your behalf. Every command is risk-classified; read-only commands \
                  run automatically, anything that modifies state asks first, and \
                  destructive commands are blocked unless explicitly enabled.\n\n\
                  Examples:\n  \
                  shellpilot \"What is using port 8080?\"\n  \
                  shellpilot -i                       # Interactive mode\n  \
                  shellpilot -w \"Latest Rust release\" # Search the web first"
)]
pub struct CliArgs {
    /// One-shot query (omit with --interactive)
    pub query: Option<String>,

    /// Interactive chat mode
    #[arg(short, long)]
    pub interactive: bool,

    /// Model name (defaults to the first entry in SHELLPILOT_MODELS)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Stream output in real-time
    #[arg(short, long)]
    pub stream: bool,

    /// Show token usage statistics
    #[arg(short, long)]
    pub usage: bool,

    /// Search the web first (requires a search provider key)
    #[arg(short, long)]
    pub web: bool,

    /// Show citations/sources from web search
    #[arg(short, long)]
    pub citations: bool,

    /// List available models
    #[arg(long)]
    pub list_models: bool,

    /// Mirror logs to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_one_shot() {
        let args = CliArgs::parse_from(["shellpilot", "-w", "what is rust"]);
        assert!(args.web);
        assert_eq!(args.query.as_deref(), Some("what is rust"));
        assert!(!args.interactive);
    }

    #[test]
    fn test_parse_interactive() {
        let args = CliArgs::parse_from(["shellpilot", "-i", "-m", "gpt-4o-mini"]);
        assert!(args.interactive);
        assert_eq!(args.model.as_deref(), Some("gpt-4o-mini"));
    }
}
