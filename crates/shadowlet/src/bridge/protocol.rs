//! Wire protocol types for controller-module communication.
//!
//! Everything the module channel carries is JSON. Outbound traffic is a
//! command post `{cmd, arg, msg_id?}`; inbound traffic is either a raw
//! channel lifecycle event (no payload envelope) or a transported data
//! object — a correlated reply or a typed application event.

use serde::{Deserialize, Serialize};

/// Correlation token for an outbound request that expects a reply.
///
/// UUID v4 — statistically unique for the lifetime of one controller, so a
/// token is never reused and never collides with an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgId(uuid::Uuid);

impl MsgId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        let uuid = uuid::Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }
}

impl Default for MsgId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MsgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound command post.
///
/// `msg_id` is present iff a reply callback was registered for this post;
/// a post without one never has a reply routed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub cmd: String,
    pub arg: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<MsgId>,
}

impl OutboundMessage {
    pub fn new(cmd: impl Into<String>, arg: serde_json::Value) -> Self {
        Self {
            cmd: cmd.into(),
            arg,
            msg_id: None,
        }
    }

    pub fn with_msg_id(mut self, msg_id: MsgId) -> Self {
        self.msg_id = Some(msg_id);
        self
    }
}

/// Raw channel lifecycle event kinds.
///
/// These carry no payload envelope; `message` is the carrier event whose
/// body holds the structured inbound payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelEventKind {
    Loadstart,
    Progress,
    Error,
    Abort,
    Load,
    Loadend,
    Crash,
    Message,
}

impl ChannelEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loadstart => "loadstart",
            Self::Progress => "progress",
            Self::Error => "error",
            Self::Abort => "abort",
            Self::Load => "load",
            Self::Loadend => "loadend",
            Self::Crash => "crash",
            Self::Message => "message",
        }
    }
}

impl std::fmt::Display for ChannelEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound item as the dispatcher sees it.
///
/// The transport adapter decides the variant, so the dispatch core never
/// has to sniff whether an item is a bare channel notification or a
/// transported data object.
#[derive(Debug, Clone)]
pub enum ChannelItem {
    /// Bare channel-level notification, only a type.
    Lifecycle(ChannelEventKind),
    /// Data object carried by a `message` event.
    Message(serde_json::Value),
}

/// Reply envelope: `{"type": "reply", "msg_id": ..., "payload": ...}`.
///
/// `msg_id` is kept raw here; the dispatcher reports malformed or missing
/// tokens as unmatched replies.
#[derive(Debug, Clone)]
pub struct Reply {
    pub msg_id: Option<String>,
    pub payload: serde_json::Value,
}

/// A transported data object, classified.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Reply(Reply),
    Event(serde_json::Value),
}

impl InboundMessage {
    /// Structural classification: a data object is a reply iff it is tagged
    /// `"type": "reply"`. Everything else — including objects without a
    /// `type` field at all — is an application event.
    pub fn classify(value: serde_json::Value) -> Self {
        let tagged_reply = value.get("type").and_then(serde_json::Value::as_str) == Some("reply");
        if tagged_reply {
            let msg_id = value
                .get("msg_id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned);
            let payload = value
                .get("payload")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            return Self::Reply(Reply { msg_id, payload });
        }
        Self::Event(value)
    }
}

/// Application-level status event body, carried under `"type": "status"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub level: StatusLevel,
    pub message: String,
}

impl StatusEvent {
    /// Event type string to subscribe with.
    pub const TYPE: &'static str = "status";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Success,
    Info,
    Warning,
    Danger,
}
