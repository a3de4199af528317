//! Controller facade for the embedded module.
//!
//! Thin layer over [`ChannelEndpoint`]: one method per module command plus
//! the `on`/`off` subscription surface and the load/unload lifecycle.

use crate::bridge::transport::{ChildModuleTransport, ModuleSpawner, ModuleTransport, TransportError};
use crate::dispatch::{ChannelEvent, ReplyCallback, Subscription};
use crate::endpoint::{ChannelEndpoint, SendError};
use crate::profile::ConnectProfile;

/// Command names understood by the native module.
///
/// The dispatch core treats command names as opaque strings; only the
/// facade knows this vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Sweep,
    Version,
    ListCipher,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Sweep => "sweep",
            Self::Version => "version",
            Self::ListCipher => "list_cipher",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller for one embedded module instance.
///
/// Owns its endpoint exclusively; two controllers never share correlation
/// or listener state.
pub struct ModuleController {
    endpoint: ChannelEndpoint,
}

impl ModuleController {
    pub fn new() -> Self {
        Self {
            endpoint: ChannelEndpoint::new(),
        }
    }

    /// Spawn the module process and attach its channel.
    pub fn load(&mut self, spawner: &dyn ModuleSpawner) -> Result<(), TransportError> {
        let transport = ChildModuleTransport::spawn(spawner)?;
        self.endpoint.attach(Box::new(transport));
        Ok(())
    }

    /// Attach an already-built transport (alternative channels, tests).
    pub fn attach(&mut self, transport: Box<dyn ModuleTransport>) {
        self.endpoint.attach(transport);
    }

    /// Tear the module down: detach the transport and drop every pending
    /// reply and listener.
    pub async fn unload(&mut self) {
        self.endpoint.teardown().await;
    }

    pub fn is_loaded(&self) -> bool {
        self.endpoint.is_attached()
    }

    /// Subscribe to an event type — a raw channel kind (`load`, `crash`,
    /// `message`, ...) or an application type such as `status`.
    pub fn on(
        &self,
        event: impl Into<String>,
        callback: impl FnMut(&ChannelEvent) + Send + 'static,
    ) -> Subscription {
        self.endpoint.on(event, Box::new(callback))
    }

    /// Drop one subscription. Misses are silent; a listener registered
    /// twice needs two `off` calls.
    pub fn off(&self, subscription: Subscription) -> bool {
        self.endpoint.off(subscription)
    }

    /// Post a raw command. The typed methods below are preferred.
    pub async fn send(
        &self,
        cmd: Command,
        arg: serde_json::Value,
        callback: Option<ReplyCallback>,
    ) -> Result<(), SendError> {
        self.endpoint.send(cmd.as_str(), arg, callback).await
    }

    /// Connect to the remote server described by `profile`. The module
    /// acknowledges with `0` on success.
    pub async fn connect(
        &self,
        profile: &ConnectProfile,
        callback: Option<ReplyCallback>,
    ) -> Result<(), SendError> {
        let arg = serde_json::to_value(profile)?;
        self.send(Command::Connect, arg, callback).await
    }

    pub async fn disconnect(&self, callback: Option<ReplyCallback>) -> Result<(), SendError> {
        self.send(Command::Disconnect, serde_json::Value::Null, callback)
            .await
    }

    /// Reap connections idle past the profile timeout.
    pub async fn sweep(&self, callback: Option<ReplyCallback>) -> Result<(), SendError> {
        self.send(Command::Sweep, serde_json::Value::Null, callback)
            .await
    }

    /// Ask the module for its version; it replies `{"version": "..."}`.
    pub async fn version(&self, callback: Option<ReplyCallback>) -> Result<(), SendError> {
        self.send(Command::Version, serde_json::Value::Null, callback)
            .await
    }

    /// Ask the module for its supported cipher names.
    pub async fn list_ciphers(&self, callback: Option<ReplyCallback>) -> Result<(), SendError> {
        self.send(Command::ListCipher, serde_json::Value::Null, callback)
            .await
    }
}

impl Default for ModuleController {
    fn default() -> Self {
        Self::new()
    }
}
