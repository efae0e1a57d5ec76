//! Wiring shared by the commands that talk to GitHub.

use std::sync::Arc;
use std::time::Duration;

use starfeed::github::ApiRateLimiter;
use starfeed::publisher::USERNAME_PLACEHOLDER;
use starfeed::{
    CredentialSelector, DbStore, Engine, GitHubClientFactory, NullPublisher, Publisher,
    ReqwestTransport, Store, SyncOptions, WebSubPublisher,
};

use crate::config::Config;

const HUB_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect and bring the schema up to date.
pub(crate) async fn open_store(
    database_url: &str,
) -> Result<Arc<DbStore>, Box<dyn std::error::Error>> {
    let db = starfeed::connect_and_migrate(database_url).await?;
    Ok(Arc::new(DbStore::new(db)))
}

pub(crate) fn build_selector(config: &Config, store: Arc<dyn Store>) -> CredentialSelector {
    let rps = config.github.requests_per_second;
    let limiter = (rps > 0).then(|| ApiRateLimiter::new(rps));
    let factory = GitHubClientFactory::new(config.github.listing, limiter);

    let app = config.app_credential();
    if app.is_none() {
        tracing::info!("No application credential configured, using user tokens only");
    }

    CredentialSelector::new(store, Arc::new(factory), app)
}

pub(crate) fn build_publisher(
    config: &Config,
    store: Arc<dyn Store>,
) -> Result<Arc<dyn Publisher>, Box<dyn std::error::Error>> {
    let publisher = &config.publisher;
    let (Some(hub_url), Some(template)) = (&publisher.hub_url, &publisher.feed_url_template)
    else {
        if publisher.hub_url.is_some() {
            tracing::warn!(
                "publisher.hub_url is set without publisher.feed_url_template, hub pings disabled"
            );
        }
        return Ok(Arc::new(NullPublisher));
    };

    if !template.contains(USERNAME_PLACEHOLDER) {
        return Err(format!(
            "publisher.feed_url_template must contain {USERNAME_PLACEHOLDER}: {template}"
        )
        .into());
    }

    let transport = ReqwestTransport::with_timeout(HUB_TIMEOUT)?;
    Ok(Arc::new(WebSubPublisher::new(
        store,
        Arc::new(transport),
        hub_url.clone(),
        template.clone(),
    )))
}

pub(crate) fn build_engine(
    config: &Config,
    store: Arc<DbStore>,
) -> Result<Engine, Box<dyn std::error::Error>> {
    let store: Arc<dyn Store> = store;
    let selector = build_selector(config, Arc::clone(&store));
    let publisher = build_publisher(config, Arc::clone(&store))?;
    Ok(Engine::new(
        store,
        Arc::new(selector),
        publisher,
        SyncOptions::default(),
    ))
}
