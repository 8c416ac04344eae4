//! Remoting protocol: genesis election, presence, round-robin request/reply
//! with timeout, and FIFO-ordered streamed snapshot/revup transfers, all
//! over a pluggable [`Transport`].

#![forbid(unsafe_code)]

pub mod error;
pub mod presence;
pub mod remotes;
pub mod transport;
pub mod wire;

pub use error::RemotesError;
pub use presence::PresenceRecord;
pub use remotes::{RemoteEvent, Remotes};
pub use transport::{InboundMessage, MemoryBus, MemoryTransport, Transport};
pub use wire::{ReplyBody, RequestKind};
