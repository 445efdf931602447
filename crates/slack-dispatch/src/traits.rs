use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DispatchError;
use crate::types::{ActionRecord, InteractionEvent, MentionEvent};

/// Handler bound to a mention command pattern.
///
/// `captures` is the full regex submatch list: index 0 is the whole match,
/// later indices are the parenthesized groups (empty when a group did not
/// participate). Handlers are side-effecting; the returned result is only
/// used for uniform logging, never for retries.
#[async_trait]
pub trait MentionHandler: Send + Sync {
    async fn handle(&self, event: &MentionEvent, captures: &[String])
        -> Result<(), DispatchError>;
}

/// Handler bound to a callback id (legacy actions) or action id (block actions).
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    async fn handle(
        &self,
        event: &InteractionEvent,
        action: &ActionRecord,
    ) -> Result<(), DispatchError>;
}

/// Tells a user that their mention matched no command.
#[async_trait]
pub trait UnknownCommandNotifier: Send + Sync {
    async fn notify_unknown(&self, event: &MentionEvent) -> Result<(), DispatchError>;
}

#[async_trait]
impl<T: MentionHandler + ?Sized> MentionHandler for Arc<T> {
    async fn handle(&self, event: &MentionEvent, captures: &[String]) -> Result<(), DispatchError> {
        (**self).handle(event, captures).await
    }
}

#[async_trait]
impl<T: InteractionHandler + ?Sized> InteractionHandler for Arc<T> {
    async fn handle(
        &self,
        event: &InteractionEvent,
        action: &ActionRecord,
    ) -> Result<(), DispatchError> {
        (**self).handle(event, action).await
    }
}
