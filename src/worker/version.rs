//! Version tags and generation naming.
//!
//! Every deployment supplies a release fingerprint (build timestamp or
//! content hash); the tag derived from it is embedded in generation
//! names, so a new deployment is guaranteed a fully distinct set of
//! names and activation invalidates everything from prior versions —
//! no per-asset cache busting required.

use sha2::{Digest, Sha256};

const TAG_HEX_LEN: usize = 12;

/// Role a generation plays: install-time critical assets or runtime
/// opportunistic captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationRole {
    Critical,
    Dynamic,
}

impl GenerationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationRole::Critical => "critical",
            GenerationRole::Dynamic => "dynamic",
        }
    }
}

/// Version identifier scoped to one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag(String);

impl VersionTag {
    /// Derive a tag from a release fingerprint string.
    pub fn from_release(release: &str) -> Self {
        let digest = Sha256::digest(release.as_bytes());
        Self(hex::encode(digest)[..TAG_HEX_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the generation holding `role` content for this version.
    pub fn generation_name(&self, role: GenerationRole) -> String {
        format!("{}-v{}", role.as_str(), self.0)
    }

    /// Whether a generation name belongs to this version.
    pub fn owns(&self, generation_name: &str) -> bool {
        generation_name
            .rsplit_once("-v")
            .is_some_and(|(_, tag)| tag == self.0)
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
