//! Request pipeline: verify, parse, dedup, route, invoke, acknowledge.
//!
//! [`Dispatcher::handle_event`] and [`Dispatcher::handle_interaction`] each
//! return exactly one [`Ack`]. Handlers are awaited inline, one at a time;
//! no lock is held while they run.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::Instrument;

use crate::config::DispatchConfig;
use crate::dedup::{DedupDecision, DedupGate};
use crate::envelope::{parse_event, parse_interaction};
use crate::error::DispatchError;
use crate::finalizer::{finalize, panic_message, Ack};
use crate::logging::DispatchLogger;
use crate::routing::RoutingTable;
use crate::signature::verify_request;
use crate::traits::UnknownCommandNotifier;
use crate::types::{InboundEnvelope, InteractionEvent, MentionEvent, RequestSignature, RouteKind};

pub struct Dispatcher {
    config: DispatchConfig,
    table: Arc<RoutingTable>,
    dedup: DedupGate,
    logger: Arc<DispatchLogger>,
    notifier: Option<Arc<dyn UnknownCommandNotifier>>,
}

impl Dispatcher {
    /// A dispatcher with deduplication disabled and a tracing-only logger.
    pub fn new(config: DispatchConfig, table: Arc<RoutingTable>) -> Self {
        Self {
            config,
            table,
            dedup: DedupGate::disabled(),
            logger: Arc::new(DispatchLogger::default()),
            notifier: None,
        }
    }

    pub fn with_dedup(mut self, dedup: DedupGate) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_logger(mut self, logger: Arc<DispatchLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn UnknownCommandNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn logger(&self) -> &Arc<DispatchLogger> {
        &self.logger
    }

    /// Handle a POST to the event path.
    pub async fn handle_event(&self, signature: &RequestSignature, body: &[u8]) -> Ack {
        let span = tracing::info_span!("event", request_id = %uuid::Uuid::new_v4());
        finalize(self.event_pipeline(signature, body))
            .instrument(span)
            .await
    }

    /// Handle a POST to the interaction path.
    pub async fn handle_interaction(&self, signature: &RequestSignature, body: &[u8]) -> Ack {
        let span = tracing::info_span!("interaction", request_id = %uuid::Uuid::new_v4());
        finalize(self.interaction_pipeline(signature, body))
            .instrument(span)
            .await
    }

    async fn event_pipeline(&self, signature: &RequestSignature, body: &[u8]) -> Ack {
        if !self.signature_ok(signature, body) {
            return Ack::Empty;
        }

        let parsed = match parse_event(body, &self.config.verification_token) {
            Ok(parsed) => parsed,
            Err(DispatchError::TokenMismatch) => {
                tracing::warn!("Event verification token mismatch, dropping");
                return Ack::Empty;
            }
            Err(e) if e.is_client_error() => {
                tracing::warn!(error = %e, "Rejecting malformed event body");
                return Ack::BadRequest;
            }
            Err(e) => {
                tracing::error!(error = %e, "Event parsing failed");
                return Ack::Empty;
            }
        };

        match parsed.envelope {
            InboundEnvelope::EndpointChallenge { challenge } => {
                tracing::info!("Answering endpoint verification challenge");
                Ack::Challenge(challenge)
            }
            InboundEnvelope::Mention(event) => {
                self.dispatch_mention(&event).await;
                Ack::Empty
            }
            InboundEnvelope::Unrecognized { kind } => {
                tracing::debug!(kind = %kind, body = %parsed.raw_body, "Ignoring unrecognized event");
                Ack::Empty
            }
            InboundEnvelope::Interaction(_) => {
                tracing::warn!("Interaction payload on the event path, ignoring");
                Ack::Empty
            }
        }
    }

    async fn interaction_pipeline(&self, signature: &RequestSignature, body: &[u8]) -> Ack {
        if !self.signature_ok(signature, body) {
            return Ack::Empty;
        }

        let parsed = match parse_interaction(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unparseable interaction");
                return Ack::Empty;
            }
        };

        match parsed.envelope {
            InboundEnvelope::Interaction(event) => self.dispatch_interaction(&event).await,
            InboundEnvelope::Unrecognized { kind } => {
                tracing::debug!(kind = %kind, body = %parsed.raw_body, "Ignoring unrecognized interaction");
            }
            other => {
                tracing::warn!(envelope = ?other, "Unexpected envelope on the interaction path");
            }
        }
        Ack::Empty
    }

    fn signature_ok(&self, signature: &RequestSignature, body: &[u8]) -> bool {
        let Some(secret) = self.config.signing_secret.as_deref() else {
            return true;
        };
        match verify_request(secret, signature, body) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Request signature rejected, dropping");
                false
            }
        }
    }

    async fn dispatch_mention(&self, event: &MentionEvent) {
        let key = event.dedup_key();
        let decision = self.dedup.ensure(key.as_deref()).await;
        if decision != DedupDecision::Proceed {
            tracing::debug!(?decision, ts = %event.ts, "Mention not dispatched");
            return;
        }

        let Some(command) = self.table.route_mention(event.trimmed_text()) else {
            tracing::info!(user = %event.user, channel = %event.channel, text = %event.trimmed_text(), "No command matched");
            self.notify_unknown(event).await;
            return;
        };

        tracing::info!(
            user = %event.user,
            channel = %event.channel,
            binding = %command.pattern,
            "Dispatching mention"
        );
        self.invoke(
            RouteKind::Mention,
            command.pattern,
            &event.user,
            &event.channel,
            command.handler.handle(event, &command.captures),
        )
        .await;
    }

    async fn dispatch_interaction(&self, event: &InteractionEvent) {
        let route = match self
            .table
            .route_interaction(event, &self.config.verification_token)
        {
            Ok(route) => route,
            Err(DispatchError::TokenMismatch) => {
                tracing::warn!(user = %event.user.id, "Interaction verification token mismatch, dropping");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Interaction not routable");
                return;
            }
        };

        for id in &route.unmatched {
            tracing::info!(kind = %event.kind, id = %id, "No binding for interaction");
        }
        if route.dispatches.is_empty() {
            return;
        }

        let key = event.dedup_key();
        let decision = self.dedup.ensure(key.as_deref()).await;
        if decision != DedupDecision::Proceed {
            tracing::debug!(?decision, trigger_id = %event.trigger_id, "Interaction not dispatched");
            return;
        }

        let channel = event.channel.as_deref().unwrap_or_default();
        for dispatch in &route.dispatches {
            tracing::info!(
                user = %event.user.id,
                channel = %channel,
                binding = %dispatch.binding,
                "Dispatching interaction"
            );
            self.invoke(
                event.kind.into(),
                dispatch.binding,
                &event.user.id,
                channel,
                dispatch.handler.handle(event, dispatch.action),
            )
            .await;
        }
    }

    async fn notify_unknown(&self, event: &MentionEvent) {
        if !self.config.notify_unknown_commands {
            return;
        }
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.notify_unknown(event).await {
            tracing::warn!(user = %event.user, error = %e, "Failed to send unknown command notice");
        }
    }

    /// Await one handler and log its outcome. A panic is caught here so
    /// later records in the same payload still run.
    async fn invoke<F>(&self, route: RouteKind, binding: &str, user: &str, channel: &str, call: F)
    where
        F: Future<Output = Result<(), DispatchError>>,
    {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(call).catch_unwind().await;
        let duration_ms = Some(started.elapsed().as_millis() as u64);

        let (success, error) = match outcome {
            Ok(Ok(())) => (true, None),
            Ok(Err(e)) => (false, Some(e.to_string())),
            Err(panic) => (
                false,
                Some(format!("handler panicked: {}", panic_message(panic.as_ref()))),
            ),
        };

        let record =
            DispatchLogger::entry(route, binding, user, channel, success, duration_ms, error);
        self.logger.log(&record).await;
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .field("dedup", &self.dedup)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::dedup::test_support::BrokenStore;
    use crate::dedup::{MemoryDedupStore, StoreFailurePolicy};
    use crate::routing::test_support::{CallLog, Panicking};
    use crate::routing::RoutingTableBuilder;
    use crate::signature::compute_signature;

    const TOKEN: &str = "verif-token";
    const PING: &str = r"<@.+> ping(.*)";

    fn config() -> DispatchConfig {
        DispatchConfig {
            verification_token: TOKEN.to_string(),
            ..DispatchConfig::default()
        }
    }

    fn dispatcher(builder: RoutingTableBuilder) -> Dispatcher {
        Dispatcher::new(config(), Arc::new(builder.build().unwrap()))
    }

    fn deduped(builder: RoutingTableBuilder) -> Dispatcher {
        dispatcher(builder).with_dedup(DedupGate::new(Arc::new(MemoryDedupStore::new("test"))))
    }

    fn no_sig() -> RequestSignature {
        RequestSignature::default()
    }

    fn mention_body(text: &str, ts: &str) -> Vec<u8> {
        json!({
            "token": TOKEN,
            "type": "event_callback",
            "event": {
                "type": "app_mention",
                "user": "U1",
                "channel": "C1",
                "text": text,
                "ts": ts
            }
        })
        .to_string()
        .into_bytes()
    }

    fn interaction_body(payload: serde_json::Value) -> Vec<u8> {
        serde_urlencoded::to_string(vec![("payload", payload.to_string())])
            .unwrap()
            .into_bytes()
    }

    fn block_payload(trigger: &str, action_ids: &[&str]) -> serde_json::Value {
        let actions: Vec<_> = action_ids
            .iter()
            .enumerate()
            .map(|(i, id)| json!({"action_id": id, "value": format!("v{}", i)}))
            .collect();
        json!({
            "type": "block_actions",
            "token": TOKEN,
            "trigger_id": trigger,
            "user": {"id": "U2", "name": "bob"},
            "channel": {"id": "C2"},
            "actions": actions
        })
    }

    #[derive(Default)]
    struct RecordingNotifier {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UnknownCommandNotifier for RecordingNotifier {
        async fn notify_unknown(&self, event: &MentionEvent) -> Result<(), DispatchError> {
            self.texts.lock().unwrap().push(event.text.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn challenge_is_echoed_verbatim() {
        let d = dispatcher(RoutingTable::builder());
        let body = json!({"token": TOKEN, "type": "url_verification", "challenge": "abc123"});
        let ack = d.handle_event(&no_sig(), body.to_string().as_bytes()).await;
        assert_eq!(ack, Ack::Challenge("abc123".to_string()));
        assert_eq!(ack.body(), "abc123");
        assert_eq!(ack.status_code(), 200);
    }

    #[tokio::test]
    async fn challenge_with_wrong_token_is_not_echoed() {
        let d = dispatcher(RoutingTable::builder());
        let body = json!({"token": "wrong", "type": "url_verification", "challenge": "abc123"});
        let ack = d.handle_event(&no_sig(), body.to_string().as_bytes()).await;
        assert_eq!(ack, Ack::Empty);
    }

    #[tokio::test]
    async fn malformed_event_is_bad_request() {
        let d = dispatcher(RoutingTable::builder());
        assert_eq!(d.handle_event(&no_sig(), b"not json").await, Ack::BadRequest);
        assert_eq!(d.handle_event(&no_sig(), b"{}").await, Ack::BadRequest);
    }

    #[tokio::test]
    async fn mention_dispatches_with_captures() {
        let log = CallLog::default();
        let d = dispatcher(RoutingTable::builder().mention(PING, log.handler("ping")));

        let ack = d
            .handle_event(&no_sig(), &mention_body("  <@UBOT> ping hello ", "1.0"))
            .await;

        assert_eq!(ack, Ack::Empty);
        assert_eq!(
            log.calls(),
            vec![(
                "ping".to_string(),
                vec!["<@UBOT> ping hello".to_string(), " hello".to_string()]
            )]
        );
        assert_eq!(d.logger().dispatch_count().await, 1);
    }

    #[tokio::test]
    async fn unmatched_mention_invokes_nothing_and_notifies() {
        let log = CallLog::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let d = dispatcher(RoutingTable::builder().mention(PING, log.handler("ping")))
            .with_notifier(notifier.clone());

        let ack = d
            .handle_event(&no_sig(), &mention_body("<@UBOT> deploy", "1.0"))
            .await;

        assert_eq!(ack, Ack::Empty);
        assert!(log.calls().is_empty());
        assert_eq!(*notifier.texts.lock().unwrap(), ["<@UBOT> deploy"]);
        assert_eq!(d.logger().dispatch_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_command_notice_can_be_disabled() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut config = config();
        config.notify_unknown_commands = false;
        let d = Dispatcher::new(config, Arc::new(RoutingTable::builder().build().unwrap()))
            .with_notifier(notifier.clone());

        d.handle_event(&no_sig(), &mention_body("<@UBOT> deploy", "1.0"))
            .await;
        assert!(notifier.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn redelivered_mention_runs_once() {
        let log = CallLog::default();
        let d = deduped(RoutingTable::builder().mention(PING, log.handler("ping")));

        let body = mention_body("<@UBOT> ping", "1700000000.000100");
        assert_eq!(d.handle_event(&no_sig(), &body).await, Ack::Empty);
        assert_eq!(d.handle_event(&no_sig(), &body).await, Ack::Empty);
        assert_eq!(log.calls().len(), 1);

        d.handle_event(&no_sig(), &mention_body("<@UBOT> ping", "1700000000.000200"))
            .await;
        assert_eq!(log.calls().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_redeliveries_run_once() {
        let log = CallLog::default();
        let d = Arc::new(deduped(
            RoutingTable::builder().mention(PING, log.handler("ping")),
        ));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let d = d.clone();
            tasks.push(tokio::spawn(async move {
                d.handle_event(&RequestSignature::default(), &mention_body("<@UBOT> ping", "9.9"))
                    .await
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), Ack::Empty);
        }
        assert_eq!(log.calls().len(), 1);
    }

    #[tokio::test]
    async fn dedup_store_failure_follows_policy() {
        let log = CallLog::default();
        let closed = dispatcher(RoutingTable::builder().mention(PING, log.handler("closed")))
            .with_dedup(DedupGate::new(Arc::new(BrokenStore)));
        assert_eq!(
            closed
                .handle_event(&no_sig(), &mention_body("<@UBOT> ping", "1.0"))
                .await,
            Ack::Empty
        );
        assert!(log.calls().is_empty());

        let open = dispatcher(RoutingTable::builder().mention(PING, log.handler("open")))
            .with_dedup(
                DedupGate::new(Arc::new(BrokenStore))
                    .with_failure_policy(StoreFailurePolicy::FailOpen),
            );
        open.handle_event(&no_sig(), &mention_body("<@UBOT> ping", "1.0"))
            .await;
        assert_eq!(log.labels(), ["open"]);
    }

    #[tokio::test]
    async fn interaction_dedup_store_failure_follows_policy() {
        let log = CallLog::default();
        let body = interaction_body(block_payload("t7", &["approve"]));

        let closed = dispatcher(RoutingTable::builder().block_action("approve", log.handler("closed")))
            .with_dedup(DedupGate::new(Arc::new(BrokenStore)));
        assert_eq!(closed.handle_interaction(&no_sig(), &body).await, Ack::Empty);
        assert!(log.calls().is_empty());
        assert_eq!(closed.logger().dispatch_count().await, 0);

        let open = dispatcher(RoutingTable::builder().block_action("approve", log.handler("open")))
            .with_dedup(
                DedupGate::new(Arc::new(BrokenStore))
                    .with_failure_policy(StoreFailurePolicy::FailOpen),
            );
        assert_eq!(open.handle_interaction(&no_sig(), &body).await, Ack::Empty);
        assert_eq!(log.labels(), ["open"]);
    }

    #[tokio::test]
    async fn unconfigured_token_rejects_tokenless_payloads() {
        let log = CallLog::default();
        let table = RoutingTable::builder()
            .mention(PING, log.handler("ping"))
            .block_action("approve", log.handler("approve"))
            .build()
            .unwrap();
        let d = Dispatcher::new(DispatchConfig::default(), Arc::new(table));

        let mention = json!({
            "type": "event_callback",
            "event": {"type": "app_mention", "user": "U1", "channel": "C1", "text": "<@UBOT> ping", "ts": "1.0"}
        });
        assert_eq!(
            d.handle_event(&no_sig(), mention.to_string().as_bytes()).await,
            Ack::Empty
        );

        let challenge = json!({"type": "url_verification", "challenge": "forged"});
        assert_eq!(
            d.handle_event(&no_sig(), challenge.to_string().as_bytes()).await,
            Ack::Empty
        );

        let mut payload = block_payload("t8", &["approve"]);
        payload.as_object_mut().unwrap().remove("token");
        assert_eq!(
            d.handle_interaction(&no_sig(), &interaction_body(payload)).await,
            Ack::Empty
        );

        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn event_callback_with_wrong_token_is_dropped() {
        let log = CallLog::default();
        let d = dispatcher(RoutingTable::builder().mention(PING, log.handler("ping")));
        let body = json!({
            "token": "forged",
            "type": "event_callback",
            "event": {"type": "app_mention", "user": "U1", "channel": "C1", "text": "<@UBOT> ping", "ts": "1.0"}
        });

        let ack = d.handle_event(&no_sig(), body.to_string().as_bytes()).await;
        assert_eq!(ack, Ack::Empty);
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_event_is_acknowledged() {
        let log = CallLog::default();
        let d = dispatcher(RoutingTable::builder().mention(".*", log.handler("all")));
        let body = json!({
            "token": TOKEN,
            "type": "event_callback",
            "event": {"type": "reaction_added", "user": "U1"}
        });
        assert_eq!(
            d.handle_event(&no_sig(), body.to_string().as_bytes()).await,
            Ack::Empty
        );
        assert_eq!(
            d.handle_event(&no_sig(), br#"{"type":"app_rate_limited"}"#).await,
            Ack::Empty
        );
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn block_actions_dispatch_only_bound_record() {
        let log = CallLog::default();
        let d = dispatcher(RoutingTable::builder().block_action("approve", log.handler("approve")));

        let body = interaction_body(block_payload("t1", &["reject", "approve", "later"]));
        assert_eq!(d.handle_interaction(&no_sig(), &body).await, Ack::Empty);

        assert_eq!(
            log.calls(),
            vec![(
                "approve".to_string(),
                vec!["approve".to_string(), "v1".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn legacy_action_uses_first_record() {
        let log = CallLog::default();
        let d = dispatcher(
            RoutingTable::builder().legacy_action("accept_or_reject", log.handler("choice")),
        );
        let payload = json!({
            "type": "interactive_message",
            "token": TOKEN,
            "callback_id": "accept_or_reject",
            "trigger_id": "t2",
            "user": {"id": "U2", "name": "bob"},
            "channel": {"id": "C2"},
            "original_message": {"ts": "5.5"},
            "actions": [
                {"name": "accept", "value": "accept"},
                {"name": "reject", "value": "reject"}
            ]
        });

        d.handle_interaction(&no_sig(), &interaction_body(payload))
            .await;
        assert_eq!(
            log.calls(),
            vec![(
                "choice".to_string(),
                vec!["accept".to_string(), "accept".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn interaction_with_wrong_token_is_dropped() {
        let log = CallLog::default();
        let d = dispatcher(RoutingTable::builder().block_action("approve", log.handler("approve")));
        let mut payload = block_payload("t3", &["approve"]);
        payload["token"] = json!("forged");

        let ack = d
            .handle_interaction(&no_sig(), &interaction_body(payload))
            .await;
        assert_eq!(ack, Ack::Empty);
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_interaction_is_still_acknowledged() {
        let d = dispatcher(RoutingTable::builder());
        assert_eq!(d.handle_interaction(&no_sig(), b"nothing=here").await, Ack::Empty);
        assert_eq!(
            d.handle_interaction(&no_sig(), b"payload=%7Bbroken").await,
            Ack::Empty
        );
    }

    #[tokio::test]
    async fn redelivered_interaction_runs_once() {
        let log = CallLog::default();
        let d = deduped(RoutingTable::builder().block_action("approve", log.handler("approve")));
        let body = interaction_body(block_payload("trig-1", &["approve"]));

        d.handle_interaction(&no_sig(), &body).await;
        d.handle_interaction(&no_sig(), &body).await;
        assert_eq!(log.calls().len(), 1);
    }

    #[tokio::test]
    async fn panicking_handler_still_acknowledges_and_logs_failure() {
        let d = dispatcher(RoutingTable::builder().mention(PING, Panicking));

        let ack = d
            .handle_event(&no_sig(), &mention_body("<@UBOT> ping", "1.0"))
            .await;
        assert_eq!(ack, Ack::Empty);
        assert_eq!(d.logger().dispatch_count().await, 1);
        assert_eq!(d.logger().failure_count().await, 1);
    }

    #[tokio::test]
    async fn panic_in_one_block_record_does_not_stop_the_next() {
        let log = CallLog::default();
        let d = dispatcher(
            RoutingTable::builder()
                .block_action("explode", Panicking)
                .block_action("approve", log.handler("approve")),
        );

        let body = interaction_body(block_payload("t4", &["explode", "approve"]));
        assert_eq!(d.handle_interaction(&no_sig(), &body).await, Ack::Empty);
        assert_eq!(log.labels(), ["approve"]);
        assert_eq!(d.logger().dispatch_count().await, 2);
        assert_eq!(d.logger().failure_count().await, 1);
    }

    #[tokio::test]
    async fn handler_error_is_logged_not_retried() {
        let log = CallLog::default();
        let d = dispatcher(RoutingTable::builder().mention(PING, log.failing("ping")));

        d.handle_event(&no_sig(), &mention_body("<@UBOT> ping", "1.0"))
            .await;
        assert_eq!(log.calls().len(), 1);
        assert_eq!(d.logger().failure_count().await, 1);
    }

    #[tokio::test]
    async fn signing_secret_gates_both_paths() {
        let log = CallLog::default();
        let mut config = config();
        config.signing_secret = Some("shh".to_string());
        let table = RoutingTable::builder()
            .mention(PING, log.handler("ping"))
            .block_action("approve", log.handler("approve"))
            .build()
            .unwrap();
        let d = Dispatcher::new(config, Arc::new(table));

        let event = mention_body("<@UBOT> ping", "1.0");
        let interaction = interaction_body(block_payload("t5", &["approve"]));

        assert_eq!(d.handle_event(&no_sig(), &event).await, Ack::Empty);
        assert_eq!(d.handle_interaction(&no_sig(), &interaction).await, Ack::Empty);
        assert!(log.calls().is_empty());

        let signed = |body: &[u8]| {
            let timestamp = chrono::Utc::now().timestamp().to_string();
            RequestSignature {
                signature: Some(compute_signature("shh", &timestamp, body).unwrap()),
                timestamp: Some(timestamp),
            }
        };
        d.handle_event(&signed(&event), &event).await;
        d.handle_interaction(&signed(&interaction), &interaction)
            .await;
        assert_eq!(log.labels(), ["ping", "approve"]);
    }

    #[tokio::test]
    async fn every_request_yields_one_ack() {
        let log = CallLog::default();
        let d = deduped(
            RoutingTable::builder()
                .mention(PING, Panicking)
                .mention(".*", log.failing("fallback"))
                .block_action("approve", Panicking),
        );

        let events: Vec<(Vec<u8>, u16)> = vec![
            (b"".to_vec(), 400),
            (b"[1,2]".to_vec(), 400),
            (mention_body("<@UBOT> ping", "1.0"), 200),
            (mention_body("<@UBOT> ping", "1.0"), 200),
            (mention_body("anything", "2.0"), 200),
            (
                json!({"token": TOKEN, "type": "url_verification", "challenge": "c"})
                    .to_string()
                    .into_bytes(),
                200,
            ),
        ];
        for (body, status) in events {
            assert_eq!(d.handle_event(&no_sig(), &body).await.status_code(), status);
        }

        let interactions: Vec<Vec<u8>> = vec![
            b"".to_vec(),
            b"payload=".to_vec(),
            interaction_body(block_payload("t6", &["approve"])),
            interaction_body(json!({"type": "view_submission", "token": TOKEN})),
        ];
        for body in interactions {
            assert_eq!(d.handle_interaction(&no_sig(), &body).await, Ack::Empty);
        }
    }
}
