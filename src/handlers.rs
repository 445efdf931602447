//! The bot's own commands and button callbacks.

use std::sync::Arc;

use async_trait::async_trait;
use buildbot_slack_dispatch::{
    ActionRecord, DispatchError, InteractionEvent, InteractionHandler, MentionEvent,
    MentionHandler, RoutingTable, SlackApiClient,
};
use serde_json::{json, Value};

pub const PING_COMMAND: &str = r"<@.+> ping(.*)";
pub const HELP_COMMAND: &str = r"<@.+> help";
pub const ACCEPT_OR_REJECT: &str = "accept_or_reject";

const USAGE: &str = "Commands:\n\
    • `@buildbot ping [text]`: echo the text (or `pong`) and ask to accept or reject\n\
    • `@buildbot help`: show this message";

/// Register every binding in match order.
pub fn routing_table(api: Arc<SlackApiClient>) -> Result<RoutingTable, DispatchError> {
    RoutingTable::builder()
        .mention(PING_COMMAND, PingHandler { api: api.clone() })
        .legacy_action(ACCEPT_OR_REJECT, ChoiceHandler { api: api.clone() })
        .mention(HELP_COMMAND, HelpHandler { api })
        .build()
}

struct PingHandler {
    api: Arc<SlackApiClient>,
}

#[async_trait]
impl MentionHandler for PingHandler {
    async fn handle(&self, event: &MentionEvent, captures: &[String]) -> Result<(), DispatchError> {
        let reply = ping_reply(captures);
        self.api
            .post_message(
                &event.channel,
                &reply,
                event.thread_ts.as_deref(),
                Some(accept_or_reject_attachment()),
            )
            .await?;
        Ok(())
    }
}

struct ChoiceHandler {
    api: Arc<SlackApiClient>,
}

#[async_trait]
impl InteractionHandler for ChoiceHandler {
    async fn handle(
        &self,
        event: &InteractionEvent,
        action: &ActionRecord,
    ) -> Result<(), DispatchError> {
        let (Some(channel), Some(ts)) = (event.channel.as_deref(), event.message_ts.as_deref())
        else {
            return Err(DispatchError::Handler(
                "choice has no originating message".to_string(),
            ));
        };
        let text = choice_text(&event.user.id, &action.value)?;
        self.api.update_message(channel, ts, &text, None).await?;
        tracing::info!(user = %event.user.id, choice = %action.value, "Choice recorded");
        Ok(())
    }
}

struct HelpHandler {
    api: Arc<SlackApiClient>,
}

#[async_trait]
impl MentionHandler for HelpHandler {
    async fn handle(&self, event: &MentionEvent, _captures: &[String]) -> Result<(), DispatchError> {
        self.api
            .post_ephemeral(&event.channel, &event.user, USAGE)
            .await?;
        Ok(())
    }
}

/// The text after `ping`, or `pong` when there is none.
fn ping_reply(captures: &[String]) -> String {
    match captures.get(1).map(|s| s.trim()) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => "pong".to_string(),
    }
}

fn accept_or_reject_attachment() -> Value {
    json!([{
        "fallback": "Accept or reject",
        "callback_id": ACCEPT_OR_REJECT,
        "color": "#3AA3E3",
        "actions": [
            { "name": "accept", "text": "Accept", "type": "button", "value": "accept" },
            { "name": "reject", "text": "Reject", "type": "button", "value": "reject", "style": "danger" }
        ]
    }])
}

fn choice_text(user: &str, value: &str) -> Result<String, DispatchError> {
    let verb = match value {
        "accept" => "accepted",
        "reject" => "rejected",
        other => {
            return Err(DispatchError::Handler(format!(
                "unexpected choice value: {}",
                other
            )))
        }
    };
    Ok(format!("<@{}> {}", user, verb))
}
