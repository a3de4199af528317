//! Inbound demultiplexing: replies to the correlation table, everything
//! else to the listener registry.

pub mod correlation;
pub mod listeners;

pub use correlation::{ReplyCallback, ReplyPool};
pub use listeners::{ChannelEvent, EventCallback, ListenerRegistry, Subscription};

use crate::bridge::protocol::{ChannelEventKind, ChannelItem, InboundMessage, MsgId, Reply};

/// The dispatch core: one per controller, never shared across instances.
///
/// Both tables are owned here and only ever touched from one logical thread
/// of control; callbacks run synchronously, inline with delivery.
#[derive(Default)]
pub struct MessageCenter {
    replies: ReplyPool,
    listeners: ListenerRegistry,
}

impl MessageCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies_mut(&mut self) -> &mut ReplyPool {
        &mut self.replies
    }

    pub fn listeners_mut(&mut self) -> &mut ListenerRegistry {
        &mut self.listeners
    }

    /// Single inbound entry point.
    ///
    /// A bare lifecycle item broadcasts on its own kind. A transported data
    /// object tagged as a reply resolves through the correlation table and
    /// never reaches listeners, matched or not. Any other data object
    /// broadcasts on `message` (the carrier event) and again on its
    /// embedded `type` when it has one — the two matching paths are not
    /// mutually exclusive, so one item may fan out twice.
    pub fn handle(&mut self, item: ChannelItem) {
        match item {
            ChannelItem::Lifecycle(kind) => {
                tracing::trace!(event = kind.as_str(), "Channel lifecycle event");
                let payload = ChannelEvent::Lifecycle(kind);
                self.listeners.broadcast(kind.as_str(), &payload);
            }
            ChannelItem::Message(value) => match InboundMessage::classify(value) {
                InboundMessage::Reply(reply) => self.handle_reply(reply),
                InboundMessage::Event(value) => {
                    let embedded = value
                        .get("type")
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_owned);
                    let payload = ChannelEvent::Data(value);
                    self.listeners
                        .broadcast(ChannelEventKind::Message.as_str(), &payload);
                    if let Some(event) = embedded {
                        self.listeners.broadcast(&event, &payload);
                    }
                }
            },
        }
    }

    fn handle_reply(&mut self, reply: Reply) {
        let Some(raw_id) = reply.msg_id else {
            tracing::warn!("Reply without msg_id, dropping");
            return;
        };
        match MsgId::parse(&raw_id) {
            Ok(msg_id) => {
                if !self.replies.resolve(&msg_id, reply.payload) {
                    tracing::warn!(%msg_id, "Not a registered reply, dropping");
                }
            }
            Err(e) => {
                tracing::warn!(msg_id = %raw_id, error = %e, "Reply with malformed msg_id, dropping");
            }
        }
    }

    /// Drop every pending reply and listener. Used at endpoint teardown;
    /// nothing registered before the clear is ever invoked after it.
    pub fn clear(&mut self) {
        self.replies.clear();
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn reply_item(msg_id: &MsgId, payload: serde_json::Value) -> ChannelItem {
        ChannelItem::Message(json!({
            "type": "reply",
            "msg_id": msg_id.to_string(),
            "payload": payload,
        }))
    }

    #[test]
    fn reply_resolves_pending_request_exactly_once() {
        let mut center = MessageCenter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let id = MsgId::new();

        let calls_in = Arc::clone(&calls);
        center.replies_mut().register(
            id,
            Box::new(move |payload| {
                assert_eq!(payload, json!(0));
                calls_in.fetch_add(1, Ordering::SeqCst);
            }),
        );

        center.handle(reply_item(&id, json!(0)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Duplicate reply with the same token is dropped.
        center.handle(reply_item(&id, json!(0)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stray_reply_invokes_nothing() {
        let mut center = MessageCenter::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_in = Arc::clone(&fired);
        let _ = center.listeners_mut().add(
            "message",
            Box::new(move |_| {
                fired_in.fetch_add(1, Ordering::SeqCst);
            }),
        );

        // Unknown token: warned and dropped, never broadcast to listeners.
        center.handle(reply_item(&MsgId::new(), json!(1)));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_reply_token_is_dropped() {
        let mut center = MessageCenter::new();
        center.handle(ChannelItem::Message(json!({
            "type": "reply",
            "msg_id": "not-a-uuid",
            "payload": 1,
        })));
        center.handle(ChannelItem::Message(json!({"type": "reply"})));
    }

    #[test]
    fn typed_event_reaches_matching_listener_with_payload() {
        let mut center = MessageCenter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_in = Arc::clone(&seen);
        let _ = center.listeners_mut().add(
            "status",
            Box::new(move |event| {
                seen_in
                    .lock()
                    .unwrap()
                    .push(event.as_data().cloned().unwrap());
            }),
        );

        let body = json!({"type": "status", "level": "warning", "message": "slow"});
        center.handle(ChannelItem::Message(body.clone()));
        assert_eq!(*seen.lock().unwrap(), vec![body]);

        // Same shape under a different type never reaches the listener.
        center.handle(ChannelItem::Message(
            json!({"type": "other", "level": "warning", "message": "slow"}),
        ));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn data_object_fans_out_to_carrier_and_embedded_type() {
        let mut center = MessageCenter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for event in ["message", "status"] {
            let log_in = Arc::clone(&log);
            let tag = event.to_string();
            let _ = center.listeners_mut().add(
                event,
                Box::new(move |_| {
                    log_in.lock().unwrap().push(tag.clone());
                }),
            );
        }

        center.handle(ChannelItem::Message(
            json!({"type": "status", "level": "info", "message": "up"}),
        ));

        assert_eq!(*log.lock().unwrap(), vec!["message", "status"]);
    }

    #[test]
    fn untyped_data_object_fans_out_to_carrier_only() {
        let mut center = MessageCenter::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let fired_in = Arc::clone(&fired);
        let _ = center.listeners_mut().add(
            "message",
            Box::new(move |_| {
                fired_in.fetch_add(1, Ordering::SeqCst);
            }),
        );

        center.handle(ChannelItem::Message(json!({"bytes": 42})));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lifecycle_event_broadcasts_on_its_kind() {
        let mut center = MessageCenter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_in = Arc::clone(&seen);
        let _ = center.listeners_mut().add(
            "crash",
            Box::new(move |event| {
                match event {
                    ChannelEvent::Lifecycle(kind) => seen_in.lock().unwrap().push(*kind),
                    ChannelEvent::Data(_) => panic!("lifecycle event delivered as data"),
                };
            }),
        );

        center.handle(ChannelItem::Lifecycle(ChannelEventKind::Crash));
        center.handle(ChannelItem::Lifecycle(ChannelEventKind::Load));

        assert_eq!(*seen.lock().unwrap(), vec![ChannelEventKind::Crash]);
    }

    #[test]
    fn clear_empties_both_tables() {
        let mut center = MessageCenter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let id = MsgId::new();

        let calls_in = Arc::clone(&calls);
        center.replies_mut().register(
            id,
            Box::new(move |_| {
                calls_in.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let calls_in = Arc::clone(&calls);
        let _ = center.listeners_mut().add(
            "status",
            Box::new(move |_| {
                calls_in.fetch_add(1, Ordering::SeqCst);
            }),
        );

        center.clear();

        // Late reply and fresh event after the clear invoke nothing.
        center.handle(reply_item(&id, json!(0)));
        center.handle(ChannelItem::Message(json!({"type": "status"})));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
