//! Per-conversation turn history.
//!
//! [`ConversationStore`] maps an opaque conversation key to its
//! [`Conversation`]. The map is sharded ([`DashMap`]) so different
//! conversations never contend; each conversation sits behind its own
//! async mutex so one `converse` call can hold it across the provider
//! round trip.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::HistoryError;
use crate::gateway::config::GatewayConfig;
use crate::gateway::message::{Role, Turn};

/// Ordered turn history for one conversation.
///
/// When a persona is configured the first turn is the system turn; it is
/// never duplicated, reordered, or trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    id: String,
    turns: Vec<Turn>,
    max_turns: Option<usize>,
}

impl Conversation {
    /// Creates a conversation, seeded with `system_prompt` if given.
    #[must_use]
    pub fn new(id: impl Into<String>, system_prompt: Option<&str>, max_turns: Option<usize>) -> Self {
        Self {
            id: id.into(),
            turns: system_prompt.map(Turn::system).into_iter().collect(),
            max_turns,
        }
    }

    /// Conversation key.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All turns, system turn first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns including the system turn.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if there are no turns at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn has_system(&self) -> bool {
        self.turns.first().is_some_and(|t| t.role() == Role::System)
    }

    /// Applies the history cap to the turns already recorded, then appends
    /// a user or assistant turn.
    ///
    /// The cap bounds the earlier context sent alongside the new turn, so a
    /// cap of 2 still carries the previous question and answer.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SystemTurn`] for a system turn.
    pub fn push(&mut self, turn: Turn) -> Result<(), HistoryError> {
        if turn.role() == Role::System {
            return Err(HistoryError::SystemTurn {
                id: self.id.clone(),
            });
        }
        self.trim();
        self.turns.push(turn);
        Ok(())
    }

    /// Drops everything except the system turn.
    pub fn reset(&mut self) {
        let keep = usize::from(self.has_system());
        self.turns.truncate(keep);
    }

    /// Drops the oldest non-system turns beyond the cap. Retained history
    /// always opens with a user turn, so an odd cap keeps whole pairs.
    fn trim(&mut self) {
        let Some(cap) = self.max_turns else {
            return;
        };
        let start = usize::from(self.has_system());
        let excess = (self.turns.len() - start).saturating_sub(cap);
        if excess == 0 {
            return;
        }
        let before = self.turns.len();
        self.turns.drain(start..start + excess);
        while self
            .turns
            .get(start)
            .is_some_and(|t| t.role() == Role::Assistant)
        {
            self.turns.remove(start);
        }
        let dropped = before - self.turns.len();
        debug!(id = %self.id, dropped, remaining = self.turns.len(), "Trimmed conversation history");
    }
}

/// In-memory store of conversations, created lazily per key.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: DashMap<String, Arc<Mutex<Conversation>>>,
    system_prompt: Option<String>,
    max_turns: Option<usize>,
}

impl ConversationStore {
    /// Creates a store. A blank `system_prompt` means no system turn.
    #[must_use]
    pub fn new(system_prompt: Option<String>, max_turns: Option<usize>) -> Self {
        Self {
            conversations: DashMap::new(),
            system_prompt: system_prompt.filter(|p| !p.trim().is_empty()),
            max_turns,
        }
    }

    /// Creates a store using the configured persona and history cap.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(Some(config.system_prompt.clone()), config.max_history_turns)
    }

    /// Returns the shared handle for `id`, creating the conversation if absent.
    fn handle(&self, id: &str) -> Arc<Mutex<Conversation>> {
        if let Some(existing) = self.conversations.get(id) {
            return Arc::clone(existing.value());
        }
        let entry = self.conversations.entry(id.to_string()).or_insert_with(|| {
            debug!(id, "Creating conversation");
            Arc::new(Mutex::new(Conversation::new(
                id,
                self.system_prompt.as_deref(),
                self.max_turns,
            )))
        });
        Arc::clone(entry.value())
    }

    /// Returns a snapshot of the conversation, creating it if absent.
    pub async fn get(&self, id: &str) -> Conversation {
        self.handle(id).lock().await.clone()
    }

    /// Returns a snapshot of an existing conversation without creating one.
    pub async fn snapshot(&self, id: &str) -> Option<Conversation> {
        let handle = self.conversations.get(id).map(|e| Arc::clone(e.value()))?;
        let conversation = handle.lock().await.clone();
        Some(conversation)
    }

    /// Appends a turn to the conversation.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::SystemTurn`] for a system turn.
    pub async fn append(&self, id: &str, turn: Turn) -> Result<(), HistoryError> {
        self.handle(id).lock().await.push(turn)
    }

    /// Resets the conversation to its system turn (or to empty).
    pub async fn reset(&self, id: &str) {
        self.handle(id).lock().await.reset();
        debug!(id, "Conversation reset");
    }

    /// Locks the conversation for exclusive use until the guard drops.
    ///
    /// Holding the guard across a provider call serialises every
    /// mutation for `id`; other ids are unaffected.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<Conversation> {
        self.handle(id).lock_owned().await
    }

    /// Number of known conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Returns `true` if no conversation has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Returns `true` if a conversation exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }
}
