use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

mod commands;
mod handlers;

#[derive(Parser)]
#[command(name = "buildbot")]
#[command(about = "Slack build bot webhook router")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, default_value = "buildbot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the event and interaction webhooks
    Serve {
        /// Port to bind, overriding the config file
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind, overriding the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Validate configuration and print the routing table
    CheckConfig {
        /// Also verify the bot token against the Web API
        #[arg(long)]
        verify_token: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let result = match cli.command {
        Some(Commands::Serve { port, bind }) => {
            commands::serve::run(&cli.config, port, bind).await
        }
        Some(Commands::CheckConfig { verify_token }) => {
            commands::check::run(&cli.config, verify_token).await
        }
        None => commands::serve::run(&cli.config, None, None).await,
    };

    if let Err(e) = result {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}
