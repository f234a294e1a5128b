//! Fellowship CLI - inspect sign-in and admin status against the site backend.

mod commands;
mod ui;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fellowship_core::Config;
use fellowship_core::config::LogFormat;

#[derive(Parser)]
#[command(name = "fellowship")]
#[command(about = "Fellowship - site identity and admin status")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and show the current auth state
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in, show the resolved identity and admin flag, then sign out
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Create an account, show the resolved identity, then sign out
    Signup {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Print every auth state change until Ctrl-C
    Watch,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show full configuration (secrets hidden)
    Show,

    /// Print the config file path
    Path,

    /// Validate configuration
    Validate,

    /// Write a new configuration file
    Init {
        /// Backend URL
        #[arg(long, env = "FELLOWSHIP_BACKEND_URL")]
        url: Option<String>,

        /// Backend anon key
        #[arg(long, env = "FELLOWSHIP_ANON_KEY", hide_env_values = true)]
        anon_key: Option<String>,

        /// Overwrite without asking
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool, config: &Config) {
    let filter = if verbose || config.settings.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so `status --json` stays machine readable
    let registry = tracing_subscriber::registry().with(filter);
    match config.settings.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A broken config must not stop `config validate` or `config init`
    let loaded = Config::load_default();
    init_logging(cli.verbose, loaded.as_ref().unwrap_or(&Config::default()));

    let command = cli.command.unwrap_or(Commands::Status { json: false });

    if let Commands::Config { action } = command {
        let action = match action {
            None | Some(ConfigCommands::Show) => commands::config::ConfigAction::Show,
            Some(ConfigCommands::Path) => commands::config::ConfigAction::Path,
            Some(ConfigCommands::Validate) => commands::config::ConfigAction::Validate,
            Some(ConfigCommands::Init {
                url,
                anon_key,
                force,
            }) => commands::config::ConfigAction::Init {
                url,
                anon_key,
                force,
            },
        };
        return commands::run_config(commands::config::ConfigArgs { action }).await;
    }

    let config = loaded?;

    match command {
        Commands::Status { json } => {
            let args = commands::status::StatusArgs { json };
            commands::run_status(&config, args).await?;
        }

        Commands::Login { email } => {
            let args = commands::account::LoginArgs { email };
            commands::run_login(&config, args).await?;
        }

        Commands::Signup { email, name } => {
            let args = commands::account::SignupArgs { email, name };
            commands::run_signup(&config, args).await?;
        }

        Commands::Watch => {
            commands::run_watch(&config).await?;
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}
