//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and executes the
//! appropriate command; with no subcommand it launches the full-screen
//! chat interface.

pub mod say;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::HttpChatApi;
use crate::auth;
use crate::core::capabilities::CapabilityRegistry;
use crate::core::config::Config;
use crate::core::constants::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::core::session::ChatSession;
use crate::core::store::{EnvFallbackStore, KeyringStore, MemoryStore, SettingsStore};
use crate::ui;

#[derive(Parser)]
#[command(name = "causerie")]
#[command(about = "A terminal chat interface for OpenAI-compatible APIs")]
#[command(
    long_about = "Causerie is a full-screen terminal chat interface that talks to any \
OpenAI-compatible chat-completion API and can advertise optional tool capabilities \
to the assistant.\n\n\
Authentication:\n\
  Use 'causerie auth' to store your API key in the system keyring, or set the\n\
  OPENAI_API_KEY environment variable.\n\n\
Views:\n\
  Tab               Switch between Chat, Settings, and Tools\n\
  Enter             Send the message / save the focused field\n\
  Ctrl+N            Start a new conversation\n\
  Up/Down/Mouse     Scroll through chat history\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Chat-completion endpoint base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Ignore the keyring and use environment variables only
    #[arg(long, global = true)]
    pub env_only: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store an API key in the system keyring
    Auth,
    /// Remove the stored API key
    Deauth,
    /// Persist a default model in the config file
    SetModel {
        /// Model identifier, e.g. gpt-4o-mini
        model: String,
    },
    /// Send a single message and print the reply (no TUI)
    Say {
        /// The message to send
        prompt: Vec<String>,
    },
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Auth) => {
            init_tracing();
            auth::run_auth(build_store(args.env_only).as_ref())
        }
        Some(Commands::Deauth) => {
            init_tracing();
            auth::run_deauth(build_store(args.env_only).as_ref())
        }
        Some(Commands::SetModel { model }) => {
            init_tracing();
            let mut config = Config::load()?;
            config.set_default_model(model.as_str());
            config.save()?;
            println!("✅ Default model set to: {model}");
            Ok(())
        }
        Some(Commands::Say { ref prompt }) => {
            init_tracing();
            let store = build_store(args.env_only);
            let session = build_session(&args, store)?;
            say::run_say(prompt.clone(), session).await
        }
        None => {
            // The alternate screen owns stderr in TUI mode; tracing
            // stays uninitialized so nothing scribbles over it.
            let store = build_store(args.env_only);
            let session = build_session(&args, Arc::clone(&store))?;
            ui::run(session, store).await
        }
    }
}

/// Stderr subscriber for the TUI-less commands, filtered by RUST_LOG.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Settings store for this invocation: keyring-backed unless
/// `--env-only`, always with the environment overlay for the API key.
fn build_store(env_only: bool) -> Arc<dyn SettingsStore> {
    let inner: Arc<dyn SettingsStore> = if env_only {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(KeyringStore::new())
    };
    Arc::new(EnvFallbackStore::new(inner))
}

/// Assemble a session from config, CLI overrides, and the store.
fn build_session(args: &Args, store: Arc<dyn SettingsStore>) -> Result<ChatSession, Box<dyn Error>> {
    let config = Config::load()?;

    let model = args
        .model
        .clone()
        .or_else(|| config.default_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let backend = Arc::new(HttpChatApi::new(reqwest::Client::new(), base_url));
    let capabilities = CapabilityRegistry::load(Arc::clone(&store))?;

    Ok(ChatSession::new(store, backend, capabilities, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn say_collects_the_whole_prompt() {
        let args = Args::parse_from(["causerie", "say", "what", "is", "2+2"]);
        match args.command {
            Some(Commands::Say { prompt }) => {
                assert_eq!(prompt, vec!["what", "is", "2+2"]);
            }
            _ => panic!("expected say subcommand"),
        }
    }

    #[test]
    fn global_flags_apply_to_subcommands() {
        let args = Args::parse_from(["causerie", "--env-only", "say", "-m", "gpt-4o", "hi"]);
        assert!(args.env_only);
        assert_eq!(args.model.as_deref(), Some("gpt-4o"));
    }
}
