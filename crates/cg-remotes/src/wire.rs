//! Point-to-point frame shapes for request/reply and streamed transfers.
//! Domain broadcasts skip this envelope entirely — they're just an encoded
//! `DeltaMessage` published straight to the domain topic.

use cg_core::TreeClock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestKind {
    /// A brand-new clone asking any online peer to fork off an identity.
    NewClock,
    Snapshot,
    Revup { since: TreeClock },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReplyBody {
    NewClock { time: TreeClock },
    StreamStarted { stream_id: Uuid },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamFrame {
    Next(Vec<u8>),
    Complete,
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RemoteFrame {
    Request { correlation: Uuid, body: Vec<u8> },
    Reply { correlation: Uuid, body: Vec<u8> },
    StreamItem { stream_id: Uuid, seq: u64, item: StreamFrame },
}
