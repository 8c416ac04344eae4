//! Versioned wire envelopes: the delta message clones exchange, and a
//! generic envelope other crates (`cg-remotes`) wrap their own payloads in.
//!
//! Follows the teacher's `SyncWireMessage` pattern: a small fixed version
//! number checked on decode, constructors instead of public fields where a
//! field needs validating, plain accessors otherwise.

use crate::clock::TreeClock;
use crate::error::{CoreError, Result};
use crate::ids::{CloneId, Tid};
use serde::{Deserialize, Serialize};

/// Current wire format version. Bumped whenever the envelope shape changes
/// in a way old clones can't decode.
pub const WIRE_VERSION: u32 = 1;

/// A reified delete: one (subject, predicate, object) statement being
/// retracted, plus every TID that ever asserted it, so a delete can outlive
/// any single transaction that contributed to the value being removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReifiedDelete {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub tids: Vec<Tid>,
}

/// The unit of replication: a transaction's net effect on the dataset, tagged
/// with the TID that dedups it and the tree-clock time it was produced at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeltaMessage {
    version: u32,
    pub tid: Tid,
    pub clone_id: CloneId,
    pub time: TreeClock,
    pub inserts: Vec<serde_json::Value>,
    pub deletes: Vec<ReifiedDelete>,
}

impl DeltaMessage {
    pub fn new(
        tid: Tid,
        clone_id: CloneId,
        time: TreeClock,
        inserts: Vec<serde_json::Value>,
        deletes: Vec<ReifiedDelete>,
    ) -> Self {
        DeltaMessage {
            version: WIRE_VERSION,
            tid,
            clone_id,
            time,
            inserts,
            deletes,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(CoreError::from)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let msg: DeltaMessage = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::invalid_wire_format(e.to_string()))?;
        if msg.version != WIRE_VERSION {
            return Err(CoreError::UnsupportedVersion {
                found: msg.version,
                expected: WIRE_VERSION,
            });
        }
        Ok(msg)
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// Generic versioned envelope for request/reply and streaming payloads
/// defined downstream (presence records, snapshot chunks, revup entries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    version: u32,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Envelope {
            version: WIRE_VERSION,
            payload,
        }
    }
}

impl<T> Envelope<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(CoreError::from)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let env: Envelope<T> = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::invalid_wire_format(e.to_string()))?;
        if env.version != WIRE_VERSION {
            return Err(CoreError::UnsupportedVersion {
                found: env.version,
                expected: WIRE_VERSION,
            });
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_message_round_trips() {
        let msg = DeltaMessage::new(
            Tid::new(),
            CloneId::new("clone-a"),
            TreeClock::genesis().tick(),
            vec![serde_json::json!({"@id": "s1", "p": "v"})],
            vec![],
        );
        let bytes = msg.encode().unwrap();
        let decoded = DeltaMessage::decode(&bytes).unwrap();
        assert_eq!(msg, decoded);
        assert!(!decoded.is_empty());
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let msg = DeltaMessage::new(Tid::new(), CloneId::new("c"), TreeClock::genesis(), vec![], vec![]);
        let mut value: serde_json::Value = serde_json::to_value(&msg).unwrap();
        value["version"] = serde_json::json!(9999);
        let bytes = serde_json::to_vec(&value).unwrap();
        let err = DeltaMessage::decode(&bytes).unwrap_err();
        assert_eq!(err.category(), "unsupported_version");
    }

    #[test]
    fn envelope_round_trips_arbitrary_payload() {
        let env = Envelope::new(vec!["a".to_string(), "b".to_string()]);
        let bytes = env.encode().unwrap();
        let decoded: Envelope<Vec<String>> = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded.payload, vec!["a".to_string(), "b".to_string()]);
    }
}
