//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod broadcast;
pub mod channel;
pub mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

use relaycast::config::Config;
use relaycast::notification::{Role, DEFAULT_SOURCE_CHANNEL};

#[derive(Parser)]
#[command(name = "relaycast")]
#[command(version)]
#[command(about = "Broadcast conversation messages to every delivery channel", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.relaycast/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered channels and whether they can deliver
    Channels,
    /// Broadcast one message and print per-channel results
    Send {
        /// Conversation the message belongs to
        #[arg(long)]
        conversation: String,
        /// Message text
        #[arg(long)]
        content: String,
        /// Channel the message originated from
        #[arg(long, default_value = DEFAULT_SOURCE_CHANNEL)]
        source: String,
        /// Only deliver to these channels (comma-separated)
        #[arg(long, value_delimiter = ',')]
        target: Vec<String>,
        /// Deliver to the source channel too
        #[arg(long)]
        include_source: bool,
        /// Author role
        #[arg(long, value_enum, default_value_t = RoleArg::Assistant)]
        role: RoleArg,
        /// Audio clip URL to attach
        #[arg(long)]
        audio_url: Option<String>,
        /// Explicit message id (random UUID otherwise)
        #[arg(long)]
        message_id: Option<String>,
    },
    /// Run one chat turn: broadcast, echo a reply, broadcast the reply
    Chat {
        #[arg(long)]
        conversation: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value = DEFAULT_SOURCE_CHANNEL)]
        source: String,
    },
    /// Validate configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Check configuration for errors and warnings
    Check {
        /// File to check (overrides --config)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    User,
    Assistant,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::User => Role::User,
            RoleArg::Assistant => Role::Assistant,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    config.context("Failed to load configuration")
}

/// Entry point for the CLI.
pub async fn run() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logging follows the config file when it parses; defaults otherwise so
    // `config check` can still report on a broken file.
    let logging_cfg = load_config(cli.config.as_ref())
        .map(|c| c.logging)
        .unwrap_or_default();
    if let Err(e) = relaycast::utils::logging::init_logging(&logging_cfg) {
        eprintln!("Warning: {}", e);
    }

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Version) => {
            println!("relaycast {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Channels) => {
            let config = load_config(cli.config.as_ref())?;
            channel::cmd_channels(&config).await?;
        }
        Some(Commands::Send {
            conversation,
            content,
            source,
            target,
            include_source,
            role,
            audio_url,
            message_id,
        }) => {
            let config = load_config(cli.config.as_ref())?;
            let request = broadcast::SendRequest {
                conversation,
                content,
                source,
                targets: target,
                include_source,
                role: role.into(),
                audio_url,
                message_id,
            };
            broadcast::cmd_send(&config, request).await?;
        }
        Some(Commands::Chat {
            conversation,
            content,
            source,
        }) => {
            let config = load_config(cli.config.as_ref())?;
            broadcast::cmd_chat(&config, &conversation, &content, &source).await?;
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(action, cli.config).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_parses_targets() {
        let cli = Cli::try_parse_from([
            "relaycast",
            "send",
            "--conversation",
            "c1",
            "--content",
            "hi",
            "--target",
            "discord,whatsapp",
            "--role",
            "user",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Send {
                target,
                role,
                source,
                include_source,
                ..
            }) => {
                assert_eq!(target, vec!["discord", "whatsapp"]);
                assert!(matches!(role, RoleArg::User));
                assert_eq!(source, "web");
                assert!(!include_source);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["relaycast", "channels", "--config", "/tmp/rc.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/rc.json")));
    }
}
