use crate::core::message::Message;
use crate::core::store::Store;
use std::ops::Deref;
use std::sync::Arc;
use uuid::Uuid;

/// Default ceiling on the number of messages a [`Chat`] retains.
pub const MAX_HISTORY_LENGTH: usize = 1000;

/// An immutable snapshot of a chat's history.
///
/// Snapshots share the chat's buffer until the chat is written to again, at
/// which point the chat copies; a snapshot never observes later writes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct History(Arc<Vec<Message>>);

impl History {
    pub fn to_vec(&self) -> Vec<Message> {
        self.0.as_ref().clone()
    }
}

impl Deref for History {
    type Target = [Message];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Message>> for History {
    fn from(messages: Vec<Message>) -> Self {
        History(Arc::new(messages))
    }
}

/// The state of a conversation: a bounded history and a [`Store`].
#[derive(Debug)]
pub struct Chat {
    id: Uuid,
    history: Arc<Vec<Message>>,
    store: Store,
    limit: usize,
    // history[offset_unique..] has not been merged into a parent chat yet
    offset_unique: usize,
}

impl Default for Chat {
    fn default() -> Self {
        Self::new()
    }
}

impl Chat {
    /// Creates a chat with an empty history and a fresh store.
    pub fn new() -> Self {
        Chat {
            id: Uuid::new_v4(),
            history: Arc::new(Vec::new()),
            store: Store::new(),
            limit: MAX_HISTORY_LENGTH,
            offset_unique: 0,
        }
    }

    /// Caps the history at `limit` messages (at least 2).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(2);
        self
    }

    /// Seeds the chat with an existing store, e.g. one prepared by the caller.
    pub fn with_store(mut self, store: Store) -> Self {
        self.store = store;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> History {
        History(Arc::clone(&self.history))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn history_limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn write(&mut self, message: Message) {
        let history = Arc::make_mut(&mut self.history);
        history.push(message);

        if history.len() >= self.limit {
            let keep = self.limit / 2;
            let dropped = history.len() - keep;
            history.drain(..dropped);
            self.offset_unique = self.offset_unique.saturating_sub(dropped);
            log::debug!(
                "chat {}: history reached {} messages, dropped the oldest {}",
                self.id,
                self.limit,
                dropped
            );
        }
    }

    pub(crate) fn trim(&mut self) {
        log::debug!("chat {}: trimming {} messages", self.id, self.history.len());
        self.history = Arc::new(Vec::new());
        self.offset_unique = 0;
    }

    /// A branch-local copy: same store, private history, nothing unique yet.
    pub(crate) fn fork(&self) -> Chat {
        Chat {
            id: self.id,
            history: Arc::clone(&self.history),
            store: self.store.clone(),
            limit: self.limit,
            offset_unique: self.history.len(),
        }
    }

    /// Messages written since this chat was forked.
    pub(crate) fn unique_messages(&self) -> &[Message] {
        &self.history[self.offset_unique..]
    }
}
