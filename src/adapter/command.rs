//! Vehicle adapter commands.
//!
//! Commands are fire-and-forget: the sender never waits for a result.
//! A [`CommandRegistry`] maps each [`CommandKind`] to the handler an
//! adapter registered for it; commands of a kind nobody registered are
//! ignored.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// A command for a vehicle adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterCommand {
    /// Place the vehicle at `position`.
    InitPosition { position: String },
    /// Advance the vehicle by one step (single-step mode).
    Trigger,
}

impl AdapterCommand {
    /// Creates an `InitPosition` command.
    pub fn init_position(position: impl Into<String>) -> Self {
        Self::InitPosition {
            position: position.into(),
        }
    }

    /// The command's kind.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::InitPosition { .. } => CommandKind::InitPosition,
            Self::Trigger => CommandKind::Trigger,
        }
    }
}

/// Discriminant of [`AdapterCommand`], used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// [`AdapterCommand::InitPosition`].
    InitPosition,
    /// [`AdapterCommand::Trigger`].
    Trigger,
}

/// Handles one kind of command.
pub type CommandHandler = Arc<dyn Fn(&AdapterCommand) + Send + Sync>;

/// Accepts fire-and-forget commands.
pub trait CommandSink: Send + Sync {
    /// Executes `command`.
    fn execute(&self, command: &AdapterCommand);
}

/// Kind → handler table.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: RwLock<HashMap<CommandKind, CommandHandler>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any previous handler.
    pub fn register<F>(&self, kind: CommandKind, handler: F)
    where
        F: Fn(&AdapterCommand) + Send + Sync + 'static,
    {
        debug!(?kind, "Command handler registered");
        self.handlers.write().insert(kind, Arc::new(handler));
    }

    /// Removes the handler for `kind`.
    pub fn unregister(&self, kind: CommandKind) -> bool {
        self.handlers.write().remove(&kind).is_some()
    }

    /// Whether a handler is registered for `kind`.
    pub fn handles(&self, kind: CommandKind) -> bool {
        self.handlers.read().contains_key(&kind)
    }
}

impl CommandSink for CommandRegistry {
    fn execute(&self, command: &AdapterCommand) {
        // Clone out so a handler may touch the registry.
        let handler = self.handlers.read().get(&command.kind()).cloned();
        match handler {
            Some(handler) => handler(command),
            None => trace!(kind = ?command.kind(), "No handler, command ignored"),
        }
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<String> = self
            .handlers
            .read()
            .keys()
            .map(|k| format!("{k:?}"))
            .collect();
        kinds.sort();
        f.debug_struct("CommandRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_dispatch_by_kind() {
        let registry = CommandRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.register(CommandKind::InitPosition, move |cmd| {
            if let AdapterCommand::InitPosition { position } = cmd {
                sink.lock().push(position.clone());
            }
        });

        registry.execute(&AdapterCommand::init_position("P1"));
        registry.execute(&AdapterCommand::init_position("P2"));

        assert_eq!(*seen.lock(), vec!["P1", "P2"]);
    }

    #[test]
    fn test_unregistered_kind_is_noop() {
        let registry = CommandRegistry::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = hits.clone();
        registry.register(CommandKind::InitPosition, move |_| *counter.lock() += 1);

        registry.execute(&AdapterCommand::Trigger);

        assert_eq!(*hits.lock(), 0);
        assert!(!registry.handles(CommandKind::Trigger));
        assert!(registry.unregister(CommandKind::InitPosition));
        registry.execute(&AdapterCommand::init_position("P1"));
        assert_eq!(*hits.lock(), 0);
    }

    #[test]
    fn test_command_json_shape() {
        let json = serde_json::to_string(&AdapterCommand::init_position("P7")).unwrap();
        assert_eq!(json, r#"{"kind":"init_position","position":"P7"}"#);
        let back: AdapterCommand = serde_json::from_str(r#"{"kind":"trigger"}"#).unwrap();
        assert_eq!(back, AdapterCommand::Trigger);
        assert_eq!(back.kind(), CommandKind::Trigger);
    }
}
