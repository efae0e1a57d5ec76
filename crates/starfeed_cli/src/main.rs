//! Starfeed CLI - command-line entry point for the sync engine.

mod commands;
mod config;
mod shutdown;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::limits::OutputFormat;

#[derive(Parser)]
#[command(name = "starfeed")]
#[command(version)]
#[command(about = "Release feeds for starred GitHub repositories")]
#[command(
    long_about = "Starfeed keeps a local copy of the repositories users have starred on GitHub \
and records every new release or tag of those repositories, notifying a WebSub hub \
when feeds change."
)]
#[command(after_long_help = r#"EXAMPLES
    Sync one user's starred repositories:
        $ starfeed sync stars --user 583231

    Sync one repository's versions:
        $ starfeed sync versions --repo 724712

    Sync everything, four items at a time:
        $ starfeed sync all-versions --concurrency 4

    Show which credential would be used:
        $ starfeed limits --output json

CONFIGURATION
    Starfeed reads configuration from:
      1. ~/.config/starfeed/config.toml (or $XDG_CONFIG_HOME/starfeed/config.toml)
      2. ./starfeed.toml
      3. Environment variables (STARFEED_* prefix, nested keys joined with __)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    STARFEED_DATABASE__URL              Database connection string
    STARFEED_GITHUB__CLIENT_ID          OAuth application client id
    STARFEED_GITHUB__CLIENT_SECRET      OAuth application client secret
    STARFEED_PUBLISHER__HUB_URL         WebSub hub to ping
    RUST_LOG                            Log filter (default: starfeed=info,starfeed_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Run synchronizers directly
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
    /// Show which credential would be selected and its remaining quota
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[derive(Subcommand)]
enum SyncAction {
    /// Sync the starred repositories of one user
    Stars {
        /// GitHub account id of the user
        #[arg(short, long)]
        user: i64,
    },
    /// Sync the versions of one repository
    Versions {
        /// GitHub id of the repository
        #[arg(short, long)]
        repo: i64,
    },
    /// Sync the starred repositories of every active user
    AllStars {
        /// Work items processed at once (default from config or 4)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Sync the versions of every active repository
    AllVersions {
        /// Work items processed at once (default from config or 4)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("starfeed=info,starfeed_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config = config::Config::load();
    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .ok_or("Could not determine the database URL, set STARFEED_DATABASE__URL")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Sync { action } => {
            let shutdown = shutdown::Shutdown::install();
            commands::sync::handle_sync(action, &config, &database_url, &shutdown).await?;
        }
        Commands::Limits { output } => {
            commands::limits::handle_limits(output, &config, &database_url).await?;
        }
    }

    Ok(())
}
