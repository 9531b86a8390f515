use clap::Parser;

use shellpilot::cli::{App, CliArgs, Console};
use shellpilot::config::{Config, ENV_MODELS};
use shellpilot::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let console = Console::new();

    let _log_guard = logging::init(args.verbose)?;
    tracing::info!("=== shellpilot starting ===");

    // --list-models only needs the model list, not a full config
    if args.list_models {
        let models: Vec<String> = std::env::var(ENV_MODELS)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();
        if models.is_empty() {
            println!("No models configured. Set {} environment variable.", ENV_MODELS);
            println!("Example: export {}=gpt-4o,gpt-4o-mini", ENV_MODELS);
            std::process::exit(1);
        }
        console.show_models(&models, &models[0]);
        return Ok(());
    }

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            console.print_error(&e.to_string());
            std::process::exit(1);
        }
    };

    if let Some(ref model) = args.model {
        if let Err(e) = config.set_model(model.clone()) {
            console.print_error(&e.to_string());
            std::process::exit(1);
        }
    }

    config.stream = args.stream;
    config.usage = args.usage;
    config.web_search = args.web;
    config.citations = args.citations;
    config.interactive = args.interactive;

    if config.web_search {
        if let Err(e) = config.require_search_keys() {
            console.print_error(&e.to_string());
            std::process::exit(1);
        }
    }

    tracing::info!(
        "Config: model={} interactive={} web_search={}",
        config.model,
        config.interactive,
        config.web_search
    );

    let app = App::new(config)?;
    let result = app.run(args.query).await;

    tracing::info!("=== shellpilot shutting down ===");
    result
}
