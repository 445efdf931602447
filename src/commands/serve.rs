use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use buildbot_slack_dispatch::{
    serve, DedupGate, DispatchConfig, DispatchError, DispatchLogger, Dispatcher,
    MemoryDedupStore, SlackApiClient,
};

use crate::handlers;

pub async fn run(
    config_path: &Path,
    port: Option<u16>,
    bind: Option<String>,
) -> Result<(), DispatchError> {
    let mut config = DispatchConfig::load(Some(config_path))?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind_address = bind;
    }

    let bot_token = config.bot_token.as_deref().ok_or_else(|| {
        DispatchError::Config("a bot token is required to serve (set bot_token or SLACK_TOKEN)".to_string())
    })?;
    let api = Arc::new(SlackApiClient::new(bot_token)?);

    let table = Arc::new(handlers::routing_table(api.clone())?);

    let dedup = match config.dedup_table.as_deref() {
        Some(name) => {
            tracing::info!(
                table = %name,
                policy = ?config.dedup_failure_policy,
                retention_secs = config.dedup_retention_secs,
                "Deduplication enabled (in-process store)"
            );
            let store = MemoryDedupStore::new(name)
                .with_ttl(Duration::from_secs(config.dedup_retention_secs));
            DedupGate::new(Arc::new(store)).with_failure_policy(config.dedup_failure_policy)
        }
        None => {
            tracing::warn!("No dedup table configured, redelivered events will be dispatched again");
            DedupGate::disabled()
        }
    };
    let logger = Arc::new(DispatchLogger::new(config.dispatch_log.clone()));

    let dispatcher = Dispatcher::new(config, table)
        .with_dedup(dedup)
        .with_logger(logger)
        .with_notifier(api);

    println!("✓ Starting buildbot on {}", dispatcher.config().listen_addr());
    serve(Arc::new(dispatcher)).await
}
