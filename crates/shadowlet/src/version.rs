//! Version information for shadowlet.

/// Shadowlet version from Cargo.toml
pub const SHADOWLET_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Controller version plus the native module's reported version, when
/// known (the module answers the `version` command with `{"version": ...}`).
#[derive(Debug, Clone, serde::Serialize)]
pub struct VersionInfo {
    /// Shadowlet controller version.
    pub shadowlet: &'static str,
    /// Native module version, if the module has reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            shadowlet: SHADOWLET_VERSION,
            module: None,
        }
    }
}

impl VersionInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, version: String) -> Self {
        self.module = Some(version);
        self
    }
}
