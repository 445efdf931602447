use std::sync::Arc;

use super::RoutingTable;
use crate::error::DispatchError;
use crate::signature::tokens_match;
use crate::traits::InteractionHandler;
use crate::types::{ActionRecord, InteractionEvent, InteractionKind};

/// A callback id or action id and its handler.
pub struct CallbackBinding {
    pub(super) id: String,
    pub(super) handler: Arc<dyn InteractionHandler>,
}

impl CallbackBinding {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// One handler invocation selected for an interaction.
pub struct InteractionDispatch<'a> {
    pub binding: &'a str,
    pub handler: &'a Arc<dyn InteractionHandler>,
    pub action: &'a ActionRecord,
}

/// Outcome of routing an interaction: the invocations to make, in payload
/// order, and the ids that had no binding.
#[derive(Default)]
pub struct InteractionRoute<'a> {
    pub dispatches: Vec<InteractionDispatch<'a>>,
    pub unmatched: Vec<&'a str>,
    /// Extra action records dropped from a legacy payload.
    pub ignored_records: usize,
}

impl RoutingTable {
    /// Select the handlers for an interaction.
    ///
    /// The payload token must equal `verification_token` before any lookup.
    /// Legacy actions dispatch once by callback id using the first action
    /// record; block actions dispatch once per record by that record's
    /// action id, skipping unbound ids.
    pub fn route_interaction<'a>(
        &'a self,
        event: &'a InteractionEvent,
        verification_token: &str,
    ) -> Result<InteractionRoute<'a>, DispatchError> {
        if !tokens_match(verification_token, &event.token) {
            return Err(DispatchError::TokenMismatch);
        }

        let mut route = InteractionRoute::default();
        match event.kind {
            InteractionKind::LegacyAction => {
                let first = event.actions.first().ok_or_else(|| {
                    DispatchError::MalformedPayload(
                        "legacy action without action records".to_string(),
                    )
                })?;
                if event.actions.len() > 1 {
                    route.ignored_records = event.actions.len() - 1;
                    tracing::warn!(
                        callback_id = %event.callback_id,
                        records = event.actions.len(),
                        "Legacy action carried more than one action record, using the first"
                    );
                }
                match self.legacy_actions.get(&event.callback_id) {
                    Some(binding) => route.dispatches.push(InteractionDispatch {
                        binding: &binding.id,
                        handler: &binding.handler,
                        action: first,
                    }),
                    None => route.unmatched.push(&event.callback_id),
                }
            }
            InteractionKind::BlockAction => {
                for action in &event.actions {
                    match self.block_actions.get(&action.action_id) {
                        Some(binding) => route.dispatches.push(InteractionDispatch {
                            binding: &binding.id,
                            handler: &binding.handler,
                            action,
                        }),
                        None => route.unmatched.push(&action.action_id),
                    }
                }
            }
        }

        Ok(route)
    }
}
