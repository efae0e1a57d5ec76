use clap::ValueEnum;

use starfeed::{Identity, Quota, THRESHOLD_APP, THRESHOLD_USER};

use crate::commands::shared::{build_selector, open_store};
use crate::config::Config;

/// Output format for the limits display.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Show the credential the next unit of work would use.
pub(crate) async fn handle_limits(
    output: OutputFormat,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url).await?;
    let selector = build_selector(config, store);

    let display = match selector.find().await? {
        Some(client) => CredentialDisplay::new(&client.identity, client.quota),
        None => CredentialDisplay::none(),
    };
    display.print(output)?;
    Ok(())
}

#[derive(Debug, Clone, serde::Serialize, tabled::Tabled)]
pub(crate) struct CredentialDisplay {
    #[tabled(rename = "Credential")]
    pub credential: String,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Threshold")]
    pub threshold: String,
    #[tabled(rename = "Usable")]
    pub usable: bool,
}

impl CredentialDisplay {
    pub(crate) fn new(identity: &Identity, quota: Quota) -> Self {
        let threshold = match identity {
            Identity::App => THRESHOLD_APP,
            Identity::User { .. } => THRESHOLD_USER,
        };
        Self {
            credential: identity.to_string(),
            remaining: quota.to_string(),
            threshold: threshold.to_string(),
            usable: quota.is_usable(),
        }
    }

    pub(crate) fn none() -> Self {
        Self {
            credential: "none".to_string(),
            remaining: "-".to_string(),
            threshold: "-".to_string(),
            usable: false,
        }
    }

    pub(crate) fn print(self, format: OutputFormat) -> Result<(), serde_json::Error> {
        match format {
            OutputFormat::Table => {
                let mut table = tabled::Table::new(vec![self]);
                table.with(tabled::settings::Style::rounded());
                println!("{}", table);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&self)?);
            }
        }
        Ok(())
    }
}
