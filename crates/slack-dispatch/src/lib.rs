//! Slack webhook ingestion, verification and dispatch.
//!
//! Turns inbound event and interaction callbacks into at most one validated,
//! deduplicated handler invocation each, and always answers with exactly one
//! acknowledgement.
//!
//! # Pipeline
//! - [`envelope`] parses raw bodies into typed envelopes
//! - [`dedup`] claims a key per delivery so redeliveries are skipped
//! - [`routing`] selects handlers from a table frozen at startup
//! - [`finalizer`] guarantees a single [`Ack`], even if a handler panics
//!
//! The `server` feature (default) adds the axum webhook surface and a Web API
//! client for replies.

pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod finalizer;
pub mod logging;
pub mod routing;
pub mod signature;
pub mod traits;
pub mod types;

#[cfg(feature = "server")]
pub mod slack;

pub use config::DispatchConfig;
pub use dedup::{
    DedupDecision, DedupGate, DedupStore, InsertOutcome, MemoryDedupStore, StoreFailurePolicy,
    DEFAULT_RETENTION,
};
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use finalizer::Ack;
pub use logging::DispatchLogger;
pub use routing::{RoutingTable, RoutingTableBuilder};
pub use traits::{InteractionHandler, MentionHandler, UnknownCommandNotifier};
pub use types::{
    ActionRecord, DispatchRecord, InboundEnvelope, InteractionEvent, InteractionKind,
    MentionEvent, ParsedEnvelope, RequestSignature, RouteKind, UserRef,
};

#[cfg(feature = "server")]
pub use slack::{router, serve, SlackApiClient};
