//! Presence: who is currently reachable, as tracked via the broker's
//! retained last-will records in the real transport, and as modeled
//! in-memory here.

use serde::{Deserialize, Serialize};

/// What a clone publishes (retained) to announce itself, and what the
/// broker republishes as a last-will when the connection drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub address: String,
    pub online: bool,
}

impl PresenceRecord {
    pub fn online(address: impl Into<String>) -> Self {
        PresenceRecord {
            address: address.into(),
            online: true,
        }
    }

    pub fn offline(address: impl Into<String>) -> Self {
        PresenceRecord {
            address: address.into(),
            online: false,
        }
    }
}
