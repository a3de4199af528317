//! Channel endpoint: owns the transport attachment and the dispatch core.
//!
//! All inbound traffic funnels through one reader task into
//! [`MessageCenter::handle`]; reply and event callbacks run inline on that
//! task, so a slow callback stalls subsequent dispatch. That is a design
//! constraint, not a bug — callers defer expensive work themselves.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::bridge::protocol::{MsgId, OutboundMessage};
use crate::bridge::transport::{ModuleTransport, TransportError};
use crate::dispatch::{EventCallback, MessageCenter, ReplyCallback, Subscription};

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// No transport attached, or the endpoint was already torn down.
    #[error("no module attached")]
    Detached,
    #[error("failed to encode command argument: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Lock the dispatch core, recovering from poisoning.
///
/// A listener callback that panicked must not wedge later dispatch; the
/// tables themselves stay consistent across any partial broadcast.
fn lock_center(center: &Mutex<MessageCenter>) -> MutexGuard<'_, MessageCenter> {
    match center.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct TransportLink {
    transport: Box<dyn ModuleTransport>,
    reader: Option<tokio::task::JoinHandle<()>>,
}

/// Send/receive boundary around the module transport.
///
/// The endpoint generates correlation tokens for posts that expect a reply
/// and owns the single receive handler that feeds the dispatcher.
pub struct ChannelEndpoint {
    center: Arc<Mutex<MessageCenter>>,
    link: Option<TransportLink>,
}

impl ChannelEndpoint {
    pub fn new() -> Self {
        Self {
            center: Arc::new(Mutex::new(MessageCenter::new())),
            link: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    /// Attach a transport and start routing its inbound items through the
    /// dispatcher.
    pub fn attach(&mut self, mut transport: Box<dyn ModuleTransport>) {
        debug_assert!(self.link.is_none(), "endpoint already attached");

        let reader = transport.take_inbound().map(|mut inbound| {
            let center = Arc::clone(&self.center);
            tokio::spawn(async move {
                while let Some(item) = inbound.recv().await {
                    lock_center(&center).handle(item);
                }
                tracing::debug!("Inbound channel closed, reader exiting");
            })
        });
        if reader.is_none() {
            tracing::warn!("Transport handed out no inbound receiver, nothing will be delivered");
        }

        self.link = Some(TransportLink { transport, reader });
    }

    /// Post a command at the module.
    ///
    /// When `callback` is supplied, a correlation token is generated and
    /// registered before the post is issued, so a reply can never arrive
    /// ahead of its table entry. Without a callback no token is generated
    /// and no reply is ever routed for this post.
    pub async fn send(
        &self,
        cmd: &str,
        arg: serde_json::Value,
        callback: Option<ReplyCallback>,
    ) -> Result<(), SendError> {
        let Some(link) = self.link.as_ref() else {
            tracing::debug!(cmd, "Send on detached endpoint rejected");
            return Err(SendError::Detached);
        };

        let mut message = OutboundMessage::new(cmd, arg);
        let msg_id = callback.map(|cb| {
            let id = MsgId::new();
            lock_center(&self.center).replies_mut().register(id, cb);
            id
        });
        message.msg_id = msg_id;

        if let Err(e) = link.transport.post(message).await {
            // The post never left, so the registration must not linger as a
            // forever-pending request.
            if let Some(id) = msg_id {
                lock_center(&self.center).replies_mut().discard(&id);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Register a listener; the returned handle is the removal key.
    pub fn on(&self, event: impl Into<String>, callback: EventCallback) -> Subscription {
        lock_center(&self.center).listeners_mut().add(event, callback)
    }

    /// Remove one listener registration. Misses are silent.
    pub fn off(&self, subscription: Subscription) -> bool {
        lock_center(&self.center).listeners_mut().remove(subscription)
    }

    /// Detach the transport and drop every pending reply and listener.
    ///
    /// Delivery stops before the tables are cleared, so a request pending
    /// at teardown never has its callback invoked — even when a late reply
    /// with its token is already queued.
    pub async fn teardown(&mut self) {
        if let Some(mut link) = self.link.take() {
            if let Some(reader) = link.reader.take() {
                reader.abort();
                let _ = reader.await;
            }
            if let Err(e) = link.transport.detach().await {
                tracing::warn!(error = %e, "Transport detach failed");
            }
        }
        lock_center(&self.center).clear();
    }
}

impl Default for ChannelEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChannelEndpoint {
    fn drop(&mut self) {
        // Async teardown is preferred; this is the fallback so no reader
        // task survives an endpoint dropped without one.
        if let Some(link) = self.link.take() {
            if let Some(reader) = link.reader {
                reader.abort();
            }
        }
    }
}
