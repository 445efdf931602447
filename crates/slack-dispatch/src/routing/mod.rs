//! Routing tables.
//!
//! Bindings are accumulated by [`RoutingTableBuilder`] during startup and
//! frozen into an immutable [`RoutingTable`]. Request tasks share the frozen
//! table behind an `Arc`; nothing mutates it afterwards, so lookups take no
//! locks.

mod command;
mod interaction;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;

use crate::error::DispatchError;
use crate::traits::{InteractionHandler, MentionHandler};

pub use command::{CommandBinding, CommandMatch};
pub use interaction::{CallbackBinding, InteractionDispatch, InteractionRoute};

/// The frozen set of all bindings.
pub struct RoutingTable {
    commands: Vec<CommandBinding>,
    legacy_actions: HashMap<String, CallbackBinding>,
    block_actions: HashMap<String, CallbackBinding>,
}

impl RoutingTable {
    pub fn builder() -> RoutingTableBuilder {
        RoutingTableBuilder::new()
    }

    /// Command patterns in match order.
    pub fn command_patterns(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(CommandBinding::pattern)
    }

    pub fn legacy_action_count(&self) -> usize {
        self.legacy_actions.len()
    }

    pub fn block_action_count(&self) -> usize {
        self.block_actions.len()
    }
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTable")
            .field("commands", &self.command_patterns().collect::<Vec<_>>())
            .field("legacy_actions", &self.legacy_actions.keys().collect::<Vec<_>>())
            .field("block_actions", &self.block_actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Accumulates bindings at startup. Registering the same pattern or id twice
/// makes [`build`](RoutingTableBuilder::build) fail.
#[derive(Default)]
pub struct RoutingTableBuilder {
    commands: Vec<(String, Arc<dyn MentionHandler>)>,
    legacy_actions: Vec<(String, Arc<dyn InteractionHandler>)>,
    block_actions: Vec<(String, Arc<dyn InteractionHandler>)>,
}

impl RoutingTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a regex over the trimmed mention text. Earlier registrations win
    /// when several patterns match.
    pub fn mention<H>(mut self, pattern: impl Into<String>, handler: H) -> Self
    where
        H: MentionHandler + 'static,
    {
        self.commands.push((pattern.into(), Arc::new(handler)));
        self
    }

    /// Bind an attachment callback id (`interactive_message` payloads).
    pub fn legacy_action<H>(mut self, callback_id: impl Into<String>, handler: H) -> Self
    where
        H: InteractionHandler + 'static,
    {
        self.legacy_actions
            .push((callback_id.into(), Arc::new(handler)));
        self
    }

    /// Bind a Block Kit action id (`block_actions` payloads).
    pub fn block_action<H>(mut self, action_id: impl Into<String>, handler: H) -> Self
    where
        H: InteractionHandler + 'static,
    {
        self.block_actions.push((action_id.into(), Arc::new(handler)));
        self
    }

    /// Compile every pattern and freeze the table.
    pub fn build(self) -> Result<RoutingTable, DispatchError> {
        let mut seen = HashSet::new();
        let mut commands = Vec::with_capacity(self.commands.len());
        for (pattern, handler) in self.commands {
            if !seen.insert(pattern.clone()) {
                return Err(DispatchError::DuplicateBinding {
                    table: "mention",
                    id: pattern,
                });
            }
            let regex = Regex::new(&pattern).map_err(|source| DispatchError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            commands.push(CommandBinding {
                pattern,
                regex,
                handler,
            });
        }

        let table = RoutingTable {
            commands,
            legacy_actions: index_callbacks("legacy action", self.legacy_actions)?,
            block_actions: index_callbacks("block action", self.block_actions)?,
        };

        tracing::info!(
            commands = table.commands.len(),
            legacy_actions = table.legacy_actions.len(),
            block_actions = table.block_actions.len(),
            "Routing table frozen"
        );

        Ok(table)
    }
}

fn index_callbacks(
    table: &'static str,
    bindings: Vec<(String, Arc<dyn InteractionHandler>)>,
) -> Result<HashMap<String, CallbackBinding>, DispatchError> {
    use std::collections::hash_map::Entry;

    let mut index = HashMap::with_capacity(bindings.len());
    for (id, handler) in bindings {
        match index.entry(id) {
            Entry::Occupied(entry) => {
                return Err(DispatchError::DuplicateBinding {
                    table,
                    id: entry.key().clone(),
                })
            }
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                entry.insert(CallbackBinding { id, handler });
            }
        }
    }
    Ok(index)
}
