//! Pending-reply correlation table.

use std::collections::HashMap;

use crate::bridge::protocol::MsgId;

/// Callback invoked with the reply payload of a correlated request.
pub type ReplyCallback = Box<dyn FnOnce(serde_json::Value) + Send + 'static>;

/// Outstanding requests awaiting replies, keyed by correlation token.
///
/// An entry lives from registration until the matching reply resolves it or
/// the pool is cleared. Clearing drops callbacks without invoking them: a
/// request pending at clear time stays unresolved forever, even if its
/// reply shows up later.
#[derive(Default)]
pub struct ReplyPool {
    pending: HashMap<MsgId, ReplyCallback>,
}

impl ReplyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `msg_id`.
    ///
    /// # Panics
    ///
    /// Panics if the token is already registered. Tokens are generator
    /// produced, so a collision is a programmer error, not an operational
    /// condition.
    pub fn register(&mut self, msg_id: MsgId, callback: ReplyCallback) {
        let previous = self.pending.insert(msg_id, callback);
        assert!(previous.is_none(), "duplicate correlation token: {msg_id}");
    }

    /// Resolve `msg_id`: invoke its callback with `payload` and remove the
    /// entry, exactly once.
    ///
    /// Returns `false` when the token is unknown — a reply for a request
    /// that was never sent, was already resolved, or was dropped by a
    /// clear.
    pub fn resolve(&mut self, msg_id: &MsgId, payload: serde_json::Value) -> bool {
        match self.pending.remove(msg_id) {
            Some(callback) => {
                callback(payload);
                true
            }
            None => false,
        }
    }

    /// Drop a registered entry without invoking it, e.g. when the post that
    /// followed registration failed.
    pub fn discard(&mut self, msg_id: &MsgId) {
        let _ = self.pending.remove(msg_id);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn contains(&self, msg_id: &MsgId) -> bool {
        self.pending.contains_key(msg_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
