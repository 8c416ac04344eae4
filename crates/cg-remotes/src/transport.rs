//! The `Transport` boundary: the pluggable pub/sub layer `cg-remotes`
//! consumes, plus an in-memory multi-clone test double good enough to
//! exercise genesis election, presence, request/reply, and streaming.
//!
//! Grounded on the teacher's `BroadcasterHandler`: a shared `Arc` hub holding
//! `RwLock`-guarded peer/mailbox state that every connected handle reads and
//! writes, with no real network in between.

use crate::error::{RemotesError, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// A message delivered to a connected transport handle: either a broadcast
/// (`topic` set) or a point-to-point send (`topic` is `None`).
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub from: String,
    pub topic: Option<String>,
    pub payload: Vec<u8>,
}

/// The pluggable transport layer. `cg-remotes` only ever reaches for this
/// trait, never a concrete broker client, the same separation the teacher's
/// `aura-transport` crate documents as swappable backends.
#[async_trait]
pub trait Transport: Send + Sync {
    /// This handle's own address.
    fn address(&self) -> &str;

    /// Broadcast `payload` to every other connected address. Never echoed
    /// back to the sender.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Send `payload` directly to one address.
    async fn send_to(&self, peer: &str, payload: Vec<u8>) -> Result<()>;

    /// Pull the next inbound message, waiting if none is queued yet.
    async fn recv(&self) -> Option<InboundMessage>;

    /// Every other address currently marked present.
    fn visible_peers(&self) -> Vec<String>;

    /// Retained "first hello wins" election: the first candidate offered
    /// wins and every later caller — including the winner itself — gets the
    /// same bytes back.
    fn elect_genesis(&self, candidate: Vec<u8>) -> Vec<u8>;
}

struct BusState {
    mailboxes: RwLock<HashMap<String, mpsc::UnboundedSender<InboundMessage>>>,
    presence: RwLock<std::collections::HashSet<String>>,
    genesis: Mutex<Option<Vec<u8>>>,
}

/// Shared in-memory hub connecting every [`MemoryTransport`] handle minted
/// from it. Cheap to clone; all handles share the same underlying state.
#[derive(Clone)]
pub struct MemoryBus {
    state: Arc<BusState>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        MemoryBus {
            state: Arc::new(BusState {
                mailboxes: RwLock::new(HashMap::new()),
                presence: RwLock::new(std::collections::HashSet::new()),
                genesis: Mutex::new(None),
            }),
        }
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        MemoryBus::default()
    }

    /// Connect a new clone at `address`, returning its transport handle.
    /// Marks presence online immediately; dropping the handle marks it
    /// offline again, simulating a broker last-will.
    pub fn connect(&self, address: impl Into<String>) -> MemoryTransport {
        let address = address.into();
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.mailboxes.write().insert(address.clone(), tx);
        self.state.presence.write().insert(address.clone());
        debug!(%address, "connected to memory bus");
        MemoryTransport {
            bus: self.clone(),
            address,
            inbox: tokio::sync::Mutex::new(rx),
        }
    }
}

/// A single clone's handle onto a [`MemoryBus`].
pub struct MemoryTransport {
    bus: MemoryBus,
    address: String,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<InboundMessage>>,
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.bus.state.mailboxes.write().remove(&self.address);
        self.bus.state.presence.write().remove(&self.address);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let mailboxes = self.bus.state.mailboxes.read();
        for (addr, tx) in mailboxes.iter() {
            if addr == &self.address {
                continue; // echo suppression by publisher address
            }
            let _ = tx.send(InboundMessage {
                from: self.address.clone(),
                topic: Some(topic.to_string()),
                payload: payload.clone(),
            });
        }
        Ok(())
    }

    async fn send_to(&self, peer: &str, payload: Vec<u8>) -> Result<()> {
        let mailboxes = self.bus.state.mailboxes.read();
        match mailboxes.get(peer) {
            Some(tx) => {
                tx.send(InboundMessage {
                    from: self.address.clone(),
                    topic: None,
                    payload,
                })
                .map_err(|_| RemotesError::transport(format!("peer {peer} disconnected")))?;
                Ok(())
            }
            None => Err(RemotesError::transport(format!("peer {peer} not connected"))),
        }
    }

    async fn recv(&self) -> Option<InboundMessage> {
        self.inbox.lock().await.recv().await
    }

    fn visible_peers(&self) -> Vec<String> {
        self.bus
            .state
            .presence
            .read()
            .iter()
            .filter(|a| *a != &self.address)
            .cloned()
            .collect()
    }

    fn elect_genesis(&self, candidate: Vec<u8>) -> Vec<u8> {
        let mut slot = self.bus.state.genesis.lock();
        if slot.is_none() {
            *slot = Some(candidate);
        }
        slot.clone().expect("just set if absent")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_others_but_not_self() {
        let bus = MemoryBus::new();
        let a = bus.connect("a");
        let b = bus.connect("b");

        a.publish("domain", b"hello".to_vec()).await.unwrap();
        let msg = b.recv().await.unwrap();
        assert_eq!(msg.from, "a");
        assert_eq!(msg.payload, b"hello");

        // a did not receive its own broadcast
        assert!(a.visible_peers().contains(&"b".to_string()));
    }

    #[tokio::test]
    async fn send_to_is_point_to_point() {
        let bus = MemoryBus::new();
        let a = bus.connect("a");
        let b = bus.connect("b");
        let c = bus.connect("c");

        a.send_to("b", b"direct".to_vec()).await.unwrap();
        let msg = b.recv().await.unwrap();
        assert_eq!(msg.topic, None);
        assert_eq!(msg.from, "a");
        let _ = c;
    }

    #[tokio::test]
    async fn genesis_election_first_hello_wins() {
        let bus = MemoryBus::new();
        let a = bus.connect("a");
        let b = bus.connect("b");

        let first = a.elect_genesis(b"a-candidate".to_vec());
        let second = b.elect_genesis(b"b-candidate".to_vec());
        assert_eq!(first, second);
        assert_eq!(first, b"a-candidate".to_vec());
    }

    #[tokio::test]
    async fn dropping_a_handle_removes_presence() {
        let bus = MemoryBus::new();
        let a = bus.connect("a");
        {
            let b = bus.connect("b");
            assert!(a.visible_peers().contains(&"b".to_string()));
            drop(b);
        }
        assert!(!a.visible_peers().contains(&"b".to_string()));
    }
}
