//! Connection profile carried by the `connect` command.

use serde::{Deserialize, Serialize};

/// Remote server profile the module connects with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectProfile {
    pub server: String,
    pub server_port: u16,
    /// Local SOCKS5 port the module listens on.
    pub local_port: u16,
    /// Cipher method name, e.g. `aes-256-cfb`. Validated by the module,
    /// which answers `list_cipher` with the names it supports.
    pub method: String,
    pub password: String,
    /// Idle connection timeout in seconds; the `sweep` command reaps
    /// connections idle longer than this.
    pub timeout: u32,
}

impl ConnectProfile {
    pub const DEFAULT_TIMEOUT: u32 = 300;

    pub fn new(
        server: impl Into<String>,
        server_port: u16,
        local_port: u16,
        method: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            server_port,
            local_port,
            method: method.into(),
            password: password.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }
}
