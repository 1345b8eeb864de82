//! Session records for the credential vault.

use crate::core::{now, Timestamp};
use crate::vault::cipher::SealedSecret;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Opaque session identifier: 256 bits of entropy, URL-safe base64.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an identifier received over the wire.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a fresh unguessable identifier.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let mut bytes = [0u8; 32];
        csprng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Get the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caller's temporary right to use one connection credential.
///
/// Deliberately not serializable: the sealed secret must never leave the
/// vault except through [`SessionMetadata`].
#[derive(Clone, Debug)]
pub struct Session {
    /// Session identifier
    pub id: SessionId,
    /// Owning caller
    pub caller_id: String,
    /// Encrypted connection string
    pub sealed_connection: SealedSecret,
    /// Provider label
    pub provider: String,
    /// Creation time
    pub created_at: Timestamp,
    /// Last successful access
    pub last_accessed: Timestamp,
}

impl Session {
    /// True when the session has sat idle longer than the given window.
    pub fn idle_longer_than(&self, window: chrono::Duration) -> bool {
        now().signed_duration_since(self.last_accessed) > window
    }

    /// The secret-free public view.
    pub fn metadata(&self) -> SessionMetadata {
        SessionMetadata {
            session_id: self.id.as_str().to_string(),
            provider: self.provider.clone(),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
        }
    }
}

/// Secret-free session view returned by `describe`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session identifier
    pub session_id: String,
    /// Provider label
    pub provider: String,
    /// Creation time
    pub created_at: Timestamp,
    /// Last successful access
    pub last_accessed: Timestamp,
}
