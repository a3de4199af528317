//! shadowlet: controller runtime for an embedded shadowsocks proxy module.
//!
//! The module runs out of process; this crate owns its lifecycle and turns
//! the one-way-post channel into asynchronous request/response pairs
//! (correlated by generated tokens) and event broadcasts (raw channel
//! lifecycle kinds and application-level typed messages).

pub mod bridge;
mod controller;
pub mod dispatch;
mod endpoint;
mod profile;
mod version;

pub use bridge::protocol::{
    ChannelEventKind, ChannelItem, InboundMessage, MsgId, OutboundMessage, Reply, StatusEvent,
    StatusLevel,
};
pub use bridge::transport::{
    BinarySpawner, ChildModuleTransport, ModuleSpawner, ModuleTransport, TransportError,
};
pub use controller::{Command, ModuleController};
pub use dispatch::{
    ChannelEvent, EventCallback, ListenerRegistry, MessageCenter, ReplyCallback, ReplyPool,
    Subscription,
};
pub use endpoint::{ChannelEndpoint, SendError};
pub use profile::ConnectProfile;
pub use version::{SHADOWLET_VERSION, VersionInfo};
