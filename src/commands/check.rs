use std::path::Path;
use std::sync::Arc;

use buildbot_slack_dispatch::{DispatchConfig, DispatchError, SlackApiClient};

use crate::handlers;

pub async fn run(config_path: &Path, verify_token: bool) -> Result<(), DispatchError> {
    let config = DispatchConfig::load(Some(config_path))?;
    report(&config, verify_token).await
}

async fn report(config: &DispatchConfig, verify_token: bool) -> Result<(), DispatchError> {
    println!("✓ Configuration valid");
    println!("  listen:            {}", config.listen_addr());
    println!("  event path:        {}", config.event_path);
    println!("  interaction path:  {}", config.interaction_path);
    println!("  max body:          {} bytes", config.max_body_bytes);
    println!(
        "  signing secret:    {}",
        if config.signing_secret.is_some() { "configured" } else { "not set" }
    );
    println!(
        "  dedup table:       {}",
        config.dedup_table.as_deref().unwrap_or("disabled")
    );
    if config.dedup_table.is_some() {
        println!(
            "  dedup retention:   {}s (in-process)",
            config.dedup_retention_secs
        );
    }
    if let Some(ref path) = config.dispatch_log {
        println!("  dispatch log:      {}", path.display());
    }

    let bot_token = config.bot_token.as_deref().ok_or_else(|| {
        DispatchError::Config(
            "no bot token set (set bot_token or SLACK_TOKEN); `serve` will refuse to start"
                .to_string(),
        )
    })?;
    let api = Arc::new(SlackApiClient::new(bot_token)?);

    let table = handlers::routing_table(api.clone())?;
    println!();
    println!("Mention commands (match order):");
    for pattern in table.command_patterns() {
        println!("  {}", pattern);
    }
    println!(
        "Interaction bindings: {} legacy, {} block",
        table.legacy_action_count(),
        table.block_action_count()
    );

    if verify_token {
        let auth = api.auth_test().await?;
        println!();
        println!(
            "✓ Bot token accepted for workspace \"{}\" as {}",
            auth.team.as_deref().unwrap_or("unknown"),
            auth.user.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}
