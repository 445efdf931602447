//! Inbound payload parsing.
//!
//! Turns raw webhook bodies into typed [`InboundEnvelope`]s: Events API JSON
//! on the event path (url_verification, event_callback/app_mention) and the
//! URL-encoded `payload=` form on the interaction path (interactive_message,
//! block_actions).

use serde::Deserialize;
use serde_json::Value;

use crate::error::DispatchError;
use crate::signature::tokens_match;
use crate::types::{
    ActionRecord, InboundEnvelope, InteractionEvent, InteractionKind, MentionEvent,
    ParsedEnvelope, UserRef,
};

/// Form field that carries the JSON interaction payload.
pub const INTERACTION_PAYLOAD_FIELD: &str = "payload";

/// Top-level Events API envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventEnvelope {
    UrlVerification {
        #[serde(default)]
        token: String,
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        token: String,
        event: Value,
    },
    #[serde(other)]
    Other,
}

/// The inner event of an `event_callback` envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CallbackEvent {
    AppMention {
        user: String,
        channel: String,
        text: String,
        ts: String,
        #[serde(default)]
        thread_ts: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct InteractionForm {
    payload: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    callback_id: String,
    #[serde(default)]
    trigger_id: String,
    #[serde(default)]
    response_url: Option<String>,
    #[serde(default)]
    user: RawUser,
    #[serde(default)]
    channel: Option<RawChannel>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    original_message: Option<RawMessage>,
    #[serde(default)]
    message_ts: Option<String>,
    #[serde(default)]
    actions: Option<Vec<RawAction>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawUser {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(default)]
    action_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    action_ts: Option<String>,
    #[serde(default)]
    selected_option: Option<RawOption>,
    #[serde(default)]
    selected_options: Option<Vec<RawOption>>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    #[serde(default)]
    value: Option<String>,
}

/// Parse an Events API body.
///
/// The outer verification token is checked for both the handshake and
/// callback events; a mismatch yields [`DispatchError::TokenMismatch`], which
/// callers acknowledge without dispatching.
pub fn parse_event(
    body: &[u8],
    verification_token: &str,
) -> Result<ParsedEnvelope, DispatchError> {
    let raw_body = String::from_utf8_lossy(body).into_owned();
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| DispatchError::MalformedPayload(format!("invalid JSON: {}", e)))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DispatchError::MalformedPayload("missing envelope type".to_string()))?
        .to_string();

    let parsed: EventEnvelope = serde_json::from_value(value)
        .map_err(|e| DispatchError::MalformedPayload(format!("{} envelope: {}", kind, e)))?;

    let envelope = match parsed {
        EventEnvelope::UrlVerification { token, challenge } => {
            check_token(verification_token, &token)?;
            InboundEnvelope::EndpointChallenge { challenge }
        }
        EventEnvelope::EventCallback { token, event } => {
            check_token(verification_token, &token)?;
            parse_callback_event(event)?
        }
        EventEnvelope::Other => InboundEnvelope::Unrecognized { kind },
    };

    Ok(ParsedEnvelope { envelope, raw_body })
}

fn parse_callback_event(event: Value) -> Result<InboundEnvelope, DispatchError> {
    let inner_kind = event
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DispatchError::MalformedPayload("missing inner event type".to_string()))?
        .to_string();

    let event: CallbackEvent = serde_json::from_value(event).map_err(|e| {
        DispatchError::MalformedPayload(format!("{} event: {}", inner_kind, e))
    })?;

    Ok(match event {
        CallbackEvent::AppMention {
            user,
            channel,
            text,
            ts,
            thread_ts,
        } => InboundEnvelope::Mention(MentionEvent {
            user,
            channel,
            text,
            ts,
            thread_ts,
        }),
        CallbackEvent::Other => InboundEnvelope::Unrecognized {
            kind: format!("event_callback/{}", inner_kind),
        },
    })
}

fn check_token(expected: &str, provided: &str) -> Result<(), DispatchError> {
    if tokens_match(expected, provided) {
        Ok(())
    } else {
        Err(DispatchError::TokenMismatch)
    }
}

/// Parse an interaction body (`application/x-www-form-urlencoded`).
///
/// The payload's own token is not checked here; the interaction router
/// checks it before any lookup.
pub fn parse_interaction(body: &[u8]) -> Result<ParsedEnvelope, DispatchError> {
    let raw_body = String::from_utf8_lossy(body).into_owned();
    let form: InteractionForm = serde_urlencoded::from_bytes(body)
        .map_err(|e| DispatchError::MalformedPayload(format!("invalid form body: {}", e)))?;
    let payload = form.payload.ok_or_else(|| {
        DispatchError::MalformedPayload(format!(
            "form has no '{}' field",
            INTERACTION_PAYLOAD_FIELD
        ))
    })?;

    let raw: RawInteraction = serde_json::from_str(&payload)
        .map_err(|e| DispatchError::MalformedPayload(format!("interaction payload: {}", e)))?;

    let kind = match raw.kind.as_str() {
        "interactive_message" => InteractionKind::LegacyAction,
        "block_actions" => InteractionKind::BlockAction,
        other => {
            return Ok(ParsedEnvelope {
                envelope: InboundEnvelope::Unrecognized {
                    kind: format!("interaction/{}", other),
                },
                raw_body,
            })
        }
    };

    let actions: Vec<ActionRecord> = raw
        .actions
        .unwrap_or_default()
        .into_iter()
        .map(|a| action_record(kind, a))
        .collect();

    if kind == InteractionKind::LegacyAction && actions.is_empty() {
        return Err(DispatchError::MalformedPayload(
            "interactive_message without action records".to_string(),
        ));
    }

    let message_ts = raw
        .message
        .and_then(|m| m.ts)
        .or_else(|| raw.original_message.and_then(|m| m.ts))
        .or(raw.message_ts);

    let event = InteractionEvent {
        kind,
        callback_id: raw.callback_id,
        token: raw.token,
        trigger_id: raw.trigger_id,
        user: UserRef {
            id: raw.user.id,
            name: raw.user.name.or(raw.user.username).unwrap_or_default(),
        },
        channel: raw.channel.map(|c| c.id),
        message_ts,
        response_url: raw.response_url,
        actions,
    };

    Ok(ParsedEnvelope {
        envelope: InboundEnvelope::Interaction(event),
        raw_body,
    })
}

fn action_record(kind: InteractionKind, raw: RawAction) -> ActionRecord {
    // Attachment buttons identify themselves by `name`, Block Kit elements by `action_id`.
    let action_id = match kind {
        InteractionKind::LegacyAction => raw.name.or(raw.action_id),
        InteractionKind::BlockAction => raw.action_id.or(raw.name),
    }
    .unwrap_or_default();

    let value = raw
        .value
        .or_else(|| raw.selected_option.and_then(|o| o.value))
        .or_else(|| {
            raw.selected_options
                .and_then(|opts| opts.into_iter().next())
                .and_then(|o| o.value)
        })
        .unwrap_or_default();

    ActionRecord {
        action_id,
        value,
        action_ts: raw.action_ts,
    }
}
