//! Channel transport to the native module process.
//!
//! The dispatch core never talks to a process directly; it sees a
//! [`ModuleTransport`]: a one-way `post` plus a receiver of inbound
//! [`ChannelItem`]s. The production implementation spawns the module binary
//! and frames JSON over its stdio; tests substitute an in-memory transport.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

use super::codec::JsonCodec;
use super::protocol::{ChannelEventKind, ChannelItem, OutboundMessage};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to spawn module process: {0}")]
    Spawn(String),
    #[error("channel io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One-way-post boundary to the module instance.
#[async_trait]
pub trait ModuleTransport: Send {
    /// Fire a command at the module. No reply is read here; replies come
    /// back through the inbound receiver like any other channel item.
    async fn post(&self, message: OutboundMessage) -> Result<(), TransportError>;

    /// Hand out the inbound receiver. Yields `Some` exactly once; the
    /// endpoint takes it at attach time and owns delivery from then on.
    fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<ChannelItem>>;

    /// Stop the module side of the channel and release its resources.
    async fn detach(&mut self) -> Result<(), TransportError>;
}

/// Spawn strategy for the native module process.
pub trait ModuleSpawner: Send + Sync {
    fn spawn(&self) -> Result<Child, TransportError>;
}

/// Spawner running a module binary with piped stdio.
pub struct BinarySpawner {
    program: PathBuf,
    args: Vec<String>,
}

impl BinarySpawner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl ModuleSpawner for BinarySpawner {
    fn spawn(&self) -> Result<Child, TransportError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            // Scoped release: if the transport is dropped without a detach,
            // the module process must not outlive it.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::Spawn(e.to_string()))?;
        Ok(child)
    }
}

type ChannelWriter = Arc<tokio::sync::Mutex<FramedWrite<ChildStdin, JsonCodec<OutboundMessage>>>>;

/// Transport over a spawned module subprocess: framed JSON on stdin/stdout.
///
/// Process lifecycle maps onto the raw channel events: `loadstart` when the
/// spawn begins, `load` and `loadend` once the stdio channel is up, `error`
/// on a malformed frame, `crash` when stdout closes unexpectedly.
pub struct ChildModuleTransport {
    child: Child,
    writer: ChannelWriter,
    inbound: Option<mpsc::UnboundedReceiver<ChannelItem>>,
    reader: tokio::task::JoinHandle<()>,
}

impl ChildModuleTransport {
    /// Spawn the module process and start framing its stdout.
    ///
    /// Lifecycle events queue in the inbound channel until an endpoint takes
    /// the receiver, so nothing is lost before attach.
    pub fn spawn(spawner: &dyn ModuleSpawner) -> Result<Self, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ChannelItem::Lifecycle(ChannelEventKind::Loadstart));

        let mut child = spawner.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Spawn("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Spawn("stdout not captured".to_string()))?;

        tracing::debug!("Module process spawned");
        let _ = tx.send(ChannelItem::Lifecycle(ChannelEventKind::Load));
        let _ = tx.send(ChannelItem::Lifecycle(ChannelEventKind::Loadend));

        let writer = FramedWrite::new(stdin, JsonCodec::<OutboundMessage>::new());
        let mut frames = FramedRead::new(stdout, JsonCodec::<serde_json::Value>::new());

        let reader = tokio::spawn(async move {
            loop {
                match frames.next().await {
                    Some(Ok(value)) => {
                        if tx.send(ChannelItem::Message(value)).is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Malformed frame from module");
                        let _ = tx.send(ChannelItem::Lifecycle(ChannelEventKind::Error));
                    }
                    None => {
                        tracing::debug!("Module stdout closed");
                        let _ = tx.send(ChannelItem::Lifecycle(ChannelEventKind::Crash));
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child,
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            inbound: Some(rx),
            reader,
        })
    }
}

#[async_trait]
impl ModuleTransport for ChildModuleTransport {
    async fn post(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.send(message).await?;
        Ok(())
    }

    fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<ChannelItem>> {
        self.inbound.take()
    }

    async fn detach(&mut self) -> Result<(), TransportError> {
        self.reader.abort();
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "Module process already exited");
        }
        let _ = self.child.wait().await;
        tracing::debug!("Module process detached");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport so dispatch and facade logic can be exercised
    //! without a real module process.

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::bridge::protocol::{ChannelItem, OutboundMessage};

    use super::{ModuleTransport, TransportError};

    pub(crate) struct TestTransport {
        posts: Arc<Mutex<Vec<OutboundMessage>>>,
        inbound: Option<mpsc::UnboundedReceiver<ChannelItem>>,
        fail_posts: bool,
    }

    /// Test-side handle: inject inbound items, inspect outbound posts.
    #[derive(Clone)]
    pub(crate) struct TestChannel {
        pub(crate) tx: mpsc::UnboundedSender<ChannelItem>,
        posts: Arc<Mutex<Vec<OutboundMessage>>>,
    }

    impl TestChannel {
        pub(crate) fn posts(&self) -> Vec<OutboundMessage> {
            self.posts.lock().unwrap().clone()
        }

        pub(crate) fn last_post(&self) -> OutboundMessage {
            self.posts
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("no posts recorded")
        }
    }

    impl TestTransport {
        pub(crate) fn new() -> (Self, TestChannel) {
            Self::with_fail_posts(false)
        }

        pub(crate) fn with_fail_posts(fail_posts: bool) -> (Self, TestChannel) {
            let (tx, rx) = mpsc::unbounded_channel();
            let posts = Arc::new(Mutex::new(Vec::new()));
            let transport = Self {
                posts: Arc::clone(&posts),
                inbound: Some(rx),
                fail_posts,
            };
            (transport, TestChannel { tx, posts })
        }
    }

    #[async_trait]
    impl ModuleTransport for TestTransport {
        async fn post(&self, message: OutboundMessage) -> Result<(), TransportError> {
            if self.fail_posts {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "test transport closed",
                )));
            }
            self.posts.lock().unwrap().push(message);
            Ok(())
        }

        fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<ChannelItem>> {
            self.inbound.take()
        }

        async fn detach(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }
}
