//! Mount naming.
//!
//! Every secret engine the broker manages lives under the `/cf/` prefix of
//! the vault's path space. A [`Mount`] describes one such location and
//! resolves it to its absolute path deterministically, so that the mount
//! coordinator can diff desired mounts against the vault's mount table.

use serde::{Deserialize, Serialize};

/// The secret engine kind backing a mount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretEngine {
    /// Generic key/value secret storage.
    Kv,
    /// Transit encryption-as-a-service.
    Transit,
}

impl SecretEngine {
    /// The engine type name used when mounting against the vault API.
    pub fn engine_type(self) -> &'static str {
        match self {
            Self::Kv => "generic",
            Self::Transit => "transit",
        }
    }

    /// The trailing path segment for mounts of this engine.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Kv => "secret",
            Self::Transit => "transit",
        }
    }
}

/// A single logical mount request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mount {
    /// A mount at a fixed location under `/cf/`.
    Absolute { path: String, engine: SecretEngine },
    /// A mount scoped to an org, space, or instance guid, optionally
    /// prefixed with a human-readable name.
    Scoped {
        name: String,
        guid: String,
        engine: SecretEngine,
    },
}

impl Mount {
    /// A fixed mount under `/cf/<path>`, backed by the KV engine.
    pub fn absolute(path: impl Into<String>) -> Self {
        Self::Absolute {
            path: path.into(),
            engine: SecretEngine::Kv,
        }
    }

    /// A guid-only scoped mount.
    pub fn scoped(guid: impl Into<String>, engine: SecretEngine) -> Self {
        Self::Scoped {
            name: String::new(),
            guid: guid.into(),
            engine,
        }
    }

    /// A scoped mount carrying a human-readable name prefix.
    pub fn named(name: impl Into<String>, guid: impl Into<String>, engine: SecretEngine) -> Self {
        Self::Scoped {
            name: name.into(),
            guid: guid.into(),
            engine,
        }
    }

    /// The engine kind backing this mount.
    pub fn engine(&self) -> SecretEngine {
        match self {
            Self::Absolute { engine, .. } | Self::Scoped { engine, .. } => *engine,
        }
    }

    /// Resolve the absolute mount path, always with a leading slash.
    ///
    /// Scoped mounts resolve to `/cf/<guid>/<segment>` or, when named, to
    /// `/cf/<name>-<guid>/<segment>`. The mount coordinator strips the
    /// surrounding slashes before comparing against the vault's mount table.
    pub fn path(&self) -> String {
        match self {
            Self::Absolute { path, .. } => format!("/cf/{path}"),
            Self::Scoped { name, guid, engine } => {
                let base = if name.is_empty() {
                    guid.clone()
                } else {
                    format!("{name}-{guid}")
                };
                format!("/cf/{}/{}", base, engine.path_segment())
            }
        }
    }
}

impl std::fmt::Display for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}
