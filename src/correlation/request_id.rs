//! Request identifiers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide sequence for request IDs.
/// Relaxed ordering is enough: only uniqueness matters, not synchronization.
static REQUEST_ID_SEQ: AtomicU64 = AtomicU64::new(1);

/// Opaque token correlating an event with its response.
///
/// Generated IDs have the shape `<unix-nanos>-<sequence>`; the sequence alone
/// makes them unique for the lifetime of the process. IDs received from
/// outside are accepted as arbitrary strings and simply fail to match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new unique request ID.
    pub fn generate() -> Self {
        let seq = REQUEST_ID_SEQ.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(format!("{}-{}", nanos, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
