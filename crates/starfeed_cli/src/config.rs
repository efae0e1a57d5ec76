//! Configuration file support for starfeed.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `STARFEED_`, nested keys joined
//!    with `__`, e.g. `STARFEED_GITHUB__CLIENT_ID`)
//! 3. Local config file (`./starfeed.toml`)
//! 4. XDG config file (`~/.config/starfeed/config.toml`)
//! 5. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/starfeed/starfeed.db"  # optional, this is the default
//!
//! [github]
//! client_id = "Iv1.0123456789abcdef"
//! client_secret = "..."
//! listing = "rest"            # or "graphql"
//! requests_per_second = 10    # 0 disables client-side pacing
//!
//! [publisher]
//! hub_url = "https://pubsubhubbub.appspot.com/"
//! feed_url_template = "https://starfeed.example/{username}.atom"
//!
//! [worker]
//! concurrency = 4
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use starfeed::credentials::Credential;
use starfeed::github::{DEFAULT_REQUESTS_PER_SECOND, ListingKind};

const APP_NAME: &str = "starfeed";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub publisher: PublisherConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL. Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// OAuth application client id, used as the shared default credential.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Listing strategy for starred repositories and tags.
    pub listing: ListingKind,
    /// Client-side request pacing. Zero disables it.
    pub requests_per_second: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            listing: ListingKind::default(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

/// WebSub hub notification. Without a hub URL no pings are sent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub hub_url: Option<String>,
    /// Feed URL for one user, with `{username}` as placeholder.
    pub feed_url_template: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Work items processed concurrently by the bulk commands.
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: starfeed::DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let local_config = PathBuf::from("starfeed.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./starfeed.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // STARFEED_GITHUB__CLIENT_ID -> github.client_id
        builder = builder.add_source(
            Environment::with_prefix("STARFEED")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// The database URL, falling back to a SQLite file in the state directory.
    ///
    /// `mode=rwc` creates the file if it does not exist yet.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("starfeed.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// The shared application credential, when both halves are configured.
    pub fn app_credential(&self) -> Option<Credential> {
        match (&self.github.client_id, &self.github.client_secret) {
            (Some(client_id), Some(client_secret))
                if !client_id.is_empty() && !client_secret.is_empty() =>
            {
                Some(Credential::App {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// On Linux, `$XDG_STATE_HOME/starfeed` or `~/.local/state/starfeed`.
    /// Elsewhere, the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
