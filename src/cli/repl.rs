//! Interactive REPL and one-shot runner

use anyhow::{anyhow, Result};

use crate::agent::{Orchestrator, Session};
use crate::config::{Config, DEFAULT_SYSTEM_PROMPT};
use crate::core::AgentResult;
use crate::llm::{ChatClient, ChatMessage, ChatProvider};
use crate::search::{provider_for, SearchOutcome};

use super::console::Console;

/// Maximum history messages included when optimizing a search query
const MAX_HISTORY_FOR_OPTIMIZATION: usize = 10;
/// Maximum assistant message length before truncation during optimization
const MAX_MESSAGE_LEN_FOR_OPTIMIZATION: usize = 5000;

/// System prompt for turning a follow-up question into a search query
const QUERY_OPTIMIZATION_PROMPT: &str = "You are an expert search query optimizer. \
Transform the user's follow-up question into an effective web search query based on \
the conversation history.\n\n\
Instructions:\n\
1. Read the conversation history to understand the context\n\
2. Extract key entities, topics, and technical terms from the conversation\n\
3. Create a search query that is self-contained (no dangling pronouns), includes \
specific names and versions mentioned in the conversation, uses search-friendly \
keywords, and is concise (typically 3-8 words)\n\n\
Output ONLY the search query, nothing else. No quotes, no explanation.";

/// System prompt wrapper for one-shot web-grounded answers
fn web_search_prompt(search_context: &str) -> String {
    format!(
        "You are a helpful assistant. Use the following web search results to answer \
         the user's question.\nCite sources when possible using [1], [2], etc.\n\n\
         Web Search Results:\n{}\n\n\
         Instructions:\n\
         - Answer based on the search results above\n\
         - Be precise and concise\n\
         - If the search results don't contain relevant information, say so",
        search_context
    )
}

/// Web-context system message injected in interactive mode
fn web_context_message(search_context: &str) -> String {
    format!(
        "Web search results for additional context (cite using [1], [2], etc. if \
         relevant):\n\n{}",
        search_context
    )
}

/// Application driver owning the configuration, transport, and console
pub struct App {
    config: Config,
    client: ChatClient,
    console: Console,
    last_search: Option<SearchOutcome>,
}

impl App {
    pub fn new(config: Config) -> AgentResult<Self> {
        let client = ChatClient::new(&config)?;
        Ok(Self {
            config,
            client,
            console: Console::new(),
            last_search: None,
        })
    }

    /// Dispatch to interactive or one-shot mode
    pub async fn run(mut self, query: Option<String>) -> Result<()> {
        if self.config.interactive {
            return self.run_interactive().await;
        }
        match query {
            Some(query) => self.run_once(&query).await,
            None => Err(anyhow!("no query given; pass a query or use --interactive")),
        }
    }

    /// Answer a single query and exit. One-shot mode is plain question
    /// answering, optionally web-grounded; no commands are executed.
    async fn run_once(&mut self, query: &str) -> Result<()> {
        let system_prompt = if self.config.web_search {
            let context = self.perform_web_search(query).await?;
            web_search_prompt(&context)
        } else {
            DEFAULT_SYSTEM_PROMPT.to_string()
        };

        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(query),
        ];

        let usage = if self.config.stream {
            let console = &self.console;
            let final_frame = self
                .client
                .complete_stream(&messages, |chunk| console.print_assistant_chunk(chunk))
                .await?;
            self.console.println();
            final_frame.and_then(|f| f.usage)
        } else {
            let response = self.client.complete(&messages, &[]).await?;
            self.console.print_assistant(response.content());
            response.usage
        };

        if self.config.citations {
            self.show_citations();
        }

        if self.config.usage {
            if let Some(usage) = usage {
                self.console.println();
                self.console.show_usage(&usage);
            }
        }

        Ok(())
    }

    /// The interactive loop
    async fn run_interactive(&mut self) -> Result<()> {
        let web_provider = self
            .config
            .web_search
            .then(|| self.config.search_provider.name());
        self.console.print_banner(self.client.model(), web_provider);

        let mut session = Session::new(DEFAULT_SYSTEM_PROMPT);

        loop {
            let mut input = match self.console.read_input(">") {
                Ok(line) => line,
                Err(e) => {
                    self.console.print_error(&format!("Error reading input: {}", e));
                    continue;
                }
            };

            // Trailing backslash continues on the next line
            while input.trim_end().ends_with('\\') {
                let trimmed = input.trim_end();
                input = format!("{}\n", &trimmed[..trimmed.len() - 1]);
                match self.console.read_input("...") {
                    Ok(next) => input.push_str(&next),
                    Err(_) => break,
                }
            }

            let input = input.trim().to_string();
            if input.is_empty() {
                continue;
            }

            if input.starts_with('/') {
                if self.handle_command(&input, &mut session).await {
                    return Ok(());
                }
                continue;
            }

            if self.config.web_search {
                self.web_turn(&input, &mut session).await;
                continue;
            }

            self.console.println();
            self.chat_turn(&input, &mut session).await;
            self.console.println();
        }
    }

    /// Run one orchestrated turn, with ctrl-c wired to the session's
    /// cancellation token.
    async fn chat_turn(&self, input: &str, session: &mut Session) -> Option<String> {
        let orchestrator =
            Orchestrator::new(&self.client, &self.console).with_observer(&self.console);

        let cancel = session.cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        let result = orchestrator.run_turn(session, input).await;
        watcher.abort();

        if session.cancel.is_cancelled() {
            session.reset_cancel();
        }

        match result {
            Ok(content) => {
                if !content.is_empty() {
                    self.console.print_assistant(&content);
                }
                Some(content)
            }
            Err(e) => {
                self.console.print_error(&e.to_string());
                None
            }
        }
    }

    /// A web-grounded interactive turn: search, inject context, run the
    /// turn, then drop the context message from history.
    async fn web_turn(&mut self, query: &str, session: &mut Session) {
        // Rewrite follow-up questions into self-contained queries
        let optimized = if session.messages.len() > 1 {
            match self.optimize_search_query(query, session).await {
                Ok(optimized) => optimized,
                Err(e) => {
                    tracing::warn!("Query optimization failed: {}, using original", e);
                    query.to_string()
                }
            }
        } else {
            query.to_string()
        };

        let context = match self.perform_web_search(&optimized).await {
            Ok(context) => context,
            Err(e) => {
                self.console.print_error(&e.to_string());
                return;
            }
        };

        let context_index = session.messages.len();
        session
            .messages
            .push(ChatMessage::system(web_context_message(&context)));

        self.console.println();
        let outcome = self.chat_turn(query, session).await;

        // The search context is per-turn; keep only the exchange itself
        session.messages.remove(context_index);

        if outcome.is_some() && self.config.citations {
            self.console.println();
            self.show_citations();
        }
        self.console.println();
    }

    /// Ask the model to compress conversation context into a search query
    async fn optimize_search_query(&self, query: &str, session: &Session) -> Result<String> {
        let mut messages = vec![ChatMessage::system(QUERY_OPTIMIZATION_PROMPT)];

        // Skip the system prompt, keep the tail of the history
        let history: Vec<&ChatMessage> = session.messages[1..]
            .iter()
            .filter(|m| matches!(m, ChatMessage::User { .. } | ChatMessage::Assistant { .. }))
            .collect();
        let start = history.len().saturating_sub(MAX_HISTORY_FOR_OPTIMIZATION);

        for message in &history[start..] {
            match message {
                ChatMessage::User { content } => messages.push(ChatMessage::user(content)),
                ChatMessage::Assistant {
                    content: Some(content),
                    ..
                } => {
                    let mut content = content.clone();
                    if content.len() > MAX_MESSAGE_LEN_FOR_OPTIMIZATION {
                        content = format!(
                            "{}...",
                            content
                                .chars()
                                .take(MAX_MESSAGE_LEN_FOR_OPTIMIZATION)
                                .collect::<String>()
                        );
                    }
                    messages.push(ChatMessage::assistant(content));
                }
                _ => {}
            }
        }

        messages.push(ChatMessage::user(format!(
            "Generate a search query for: {}",
            query
        )));

        let response = self.client.complete(&messages, &[]).await?;
        let optimized = response
            .content()
            .trim()
            .trim_matches(['"', '\'', '`'])
            .to_string();

        if optimized.is_empty() {
            Ok(query.to_string())
        } else {
            Ok(optimized)
        }
    }

    /// Run the active search provider and return formatted context
    async fn perform_web_search(&mut self, query: &str) -> Result<String> {
        let provider = provider_for(&self.config)?;
        self.console.show_searching(query);

        let outcome = provider.search(query).await?;
        self.console
            .show_key_rotations(provider.name(), &outcome.rotations);
        self.console.show_search_results(outcome.results.len());

        let context = outcome.format_results_as_context();
        self.last_search = Some(outcome);
        Ok(context)
    }

    fn show_citations(&self) {
        if let Some(ref outcome) = self.last_search {
            if !outcome.results.is_empty() {
                self.console.show_citations(&outcome.results);
            }
        }
    }

    /// Handle a slash command. Returns true when the REPL should exit.
    async fn handle_command(&mut self, input: &str, session: &mut Session) -> bool {
        let (command, arg) = match input.split_once(' ') {
            Some((c, a)) => (c.to_ascii_lowercase(), a.trim().to_string()),
            None => (input.to_ascii_lowercase(), String::new()),
        };

        match command.as_str() {
            "/exit" | "/quit" | "/q" => {
                println!("Goodbye!");
                return true;
            }

            "/clear" | "/c" => {
                session.clear_conversation();
                println!("Conversation cleared.");
            }

            "/help" | "/h" => self.console.print_help(),

            "/model" => self.handle_model_command(&arg),

            "/web" => self.handle_web_command(&arg, session).await,

            "/allow-dangerous" => {
                session.policy.enable_dangerous();
                self.console
                    .print_system("Dangerous commands enabled for this session");
                self.console
                    .print_system("Note: You will still be asked to confirm before execution");
            }

            "/show-permissions" => {
                self.console
                    .show_permission_settings(&session.policy.settings());
            }

            "/clear-allowlist" => {
                session.policy.clear_allowlist();
                println!("Always-approved commands cleared.");
            }

            _ => {
                println!("Unknown command: {}", command);
                println!("Type /help for available commands");
            }
        }

        false
    }

    fn handle_model_command(&mut self, arg: &str) {
        if arg.is_empty() {
            println!("Current model: {}", self.client.model());
            if !self.config.available_models.is_empty() {
                println!("Available: {}", self.config.available_models_string());
            }
            return;
        }

        match self.config.set_model(arg) {
            Ok(()) => {
                self.client.set_model(arg);
                println!("Switched to model: {}", arg);
            }
            Err(e) => self.console.print_error(&e.to_string()),
        }
    }

    async fn handle_web_command(&mut self, arg: &str, session: &mut Session) {
        if arg.is_empty() {
            let status = if self.config.web_search {
                format!("on (provider: {})", self.config.search_provider)
            } else {
                "off".to_string()
            };
            println!("Web search: {}", status);
            println!("Available providers: tavily, linkup, brave");
            println!("Usage: /web <query> | /web on | /web off | /web <provider>");
            return;
        }

        match arg.to_ascii_lowercase().as_str() {
            "on" => match self.config.require_search_keys() {
                Ok(()) => {
                    self.config.web_search = true;
                    println!(
                        "Web search enabled (provider: {}).",
                        self.config.search_provider
                    );
                }
                Err(e) => self.console.print_error(&e.to_string()),
            },
            "off" => {
                self.config.web_search = false;
                println!("Web search disabled.");
            }
            provider @ ("tavily" | "linkup" | "brave") => {
                if let Ok(kind) = provider.parse() {
                    self.config.search_provider = kind;
                    println!("Web search provider changed to: {}", provider);
                }
            }
            _ => {
                // Anything else is a one-off search query
                self.web_turn(arg, session).await;
            }
        }
    }
}
