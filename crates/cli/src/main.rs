mod ui;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use timekeeper_engine::config::{self, Config, ProviderKind, Settings};
use timekeeper_engine::{providers, ConfigError, Conversation, LocalTools};
use timekeeper_shared::tools::toolbelts::clock;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "timekeeper")]
#[command(about = "Ask a language model what time it is around the world")]
#[command(version)]
struct Cli {
    /// Model provider: anthropic or gemini
    #[arg(long, short, env = "TIMEKEEPER_PROVIDER", default_value = "anthropic")]
    provider: ProviderKind,

    /// Override the provider's default model
    #[arg(long, env = "TIMEKEEPER_MODEL")]
    model: Option<String>,

    #[arg(long, env = "TIMEKEEPER_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Log engine activity to stderr
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Send a single message and print the answer
    Ask { message: String },
    /// Look up a city's local time without calling a model
    Time { city: String },
    /// List the supported cities
    Cities,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Before parsing, so .env values can feed the clap `env` fallbacks.
    let dotenv = config::load_dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dotenv {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Ok(None) => {}
        Err(e) => eprintln!("Warning: could not read .env file: {}", e),
    }

    let command = cli.command.unwrap_or(Commands::Chat);

    match &command {
        Commands::Cities => {
            for city in clock::CITY_ZONES {
                println!("{:<12} {}", city.name, city.zone.name());
            }
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Time { city } => {
            let outcome = timekeeper_shared::use_tool("get_current_time", &json!({ "city": city }));
            println!("{}", outcome.summary());
            return Ok(if outcome.is_error() { ExitCode::FAILURE } else { ExitCode::SUCCESS });
        }
        Commands::Chat | Commands::Ask { .. } => {}
    }

    let settings = Settings {
        provider: cli.provider,
        model: cli.model,
        max_tokens: cli.max_tokens,
    };

    let config = match Config::from_env(settings) {
        Ok(c) => c,
        Err(ConfigError::MissingApiKey { var }) => {
            eprintln!("Error: {} not found in environment variables.", var);
            eprintln!("Please set it in your .env file or environment.");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(provider = %config.provider, model = %config.model, "starting");

    let provider = providers::from_config(&config)?;
    let mut conversation = Conversation::new(provider, Box::new(LocalTools))
        .with_max_tool_rounds(config.max_tool_rounds);

    match command {
        Commands::Ask { message } => {
            if let Err(e) = ui::single_message(&mut conversation, &message, io::stdout()).await {
                eprintln!("Error: {}", e);
                return Ok(ExitCode::FAILURE);
            }
        }
        _ => {
            ui::interactive_chat(&mut conversation, io::stdin().lock(), io::stdout()).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
