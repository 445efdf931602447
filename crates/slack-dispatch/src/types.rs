use serde::{Deserialize, Serialize};

/// Top-level classification of an inbound webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEnvelope {
    /// Endpoint-verification handshake; the challenge must be echoed verbatim.
    EndpointChallenge { challenge: String },
    /// The bot was addressed in a channel message.
    Mention(MentionEvent),
    /// A user clicked an interactive component posted by the bot.
    Interaction(InteractionEvent),
    /// A well-formed payload of a kind nobody routes. Logged and acknowledged.
    Unrecognized { kind: String },
}

/// A parsed envelope together with the body it came from, kept for logging
/// and replay.
#[derive(Debug, Clone)]
pub struct ParsedEnvelope {
    pub envelope: InboundEnvelope,
    pub raw_body: String,
}

/// An `app_mention` event. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionEvent {
    pub user: String,
    pub channel: String,
    pub text: String,
    /// Event timestamp; doubles as the dedup key.
    pub ts: String,
    pub thread_ts: Option<String>,
}

impl MentionEvent {
    /// Message text as matched against command patterns.
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    pub fn dedup_key(&self) -> Option<String> {
        if self.ts.is_empty() {
            None
        } else {
            Some(format!("mention:{}", self.ts))
        }
    }
}

/// Shape of an interaction payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// `interactive_message`: attachment buttons, dispatched by callback id.
    LegacyAction,
    /// `block_actions`: Block Kit elements, dispatched per action id.
    BlockAction,
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionKind::LegacyAction => write!(f, "legacy_action"),
            InteractionKind::BlockAction => write!(f, "block_action"),
        }
    }
}

/// The user who triggered an interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
}

/// An interactive-component callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub callback_id: String,
    /// Verification token carried inside the payload itself.
    pub token: String,
    pub trigger_id: String,
    pub user: UserRef,
    pub channel: Option<String>,
    /// Timestamp of the message that carried the component.
    pub message_ts: Option<String>,
    pub response_url: Option<String>,
    /// Raw action records in payload order.
    pub actions: Vec<ActionRecord>,
}

impl InteractionEvent {
    /// Trigger id, falling back to the first action timestamp.
    pub fn dedup_key(&self) -> Option<String> {
        if !self.trigger_id.is_empty() {
            return Some(format!("interaction:{}", self.trigger_id));
        }
        self.actions
            .iter()
            .find_map(|a| a.action_ts.as_deref())
            .map(|ts| format!("interaction:{}", ts))
    }
}

/// A single action within an interaction payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Block action id, or the attachment action `name` for legacy payloads.
    pub action_id: String,
    pub value: String,
    pub action_ts: Option<String>,
}

/// Route taken by a handler invocation, as recorded in dispatch logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Mention,
    LegacyAction,
    BlockAction,
}

impl From<InteractionKind> for RouteKind {
    fn from(kind: InteractionKind) -> Self {
        match kind {
            InteractionKind::LegacyAction => RouteKind::LegacyAction,
            InteractionKind::BlockAction => RouteKind::BlockAction,
        }
    }
}

/// Signing headers lifted off an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSignature {
    pub timestamp: Option<String>,
    pub signature: Option<String>,
}

/// A structured record of one handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub ts: chrono::DateTime<chrono::Utc>,
    pub route: RouteKind,
    pub binding: String,
    pub user: String,
    pub channel: String,
    pub success: bool,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
}
