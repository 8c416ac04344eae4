//! `CloneEngine`: orchestrates local transactions, inbound deltas, bootstrap,
//! and the online/offline lifecycle over a [`SuSetDataset`] and a
//! [`Remotes`] facade. Owns the [`CloneConfig`].

use crate::config::{CloneConfig, ConstraintConfig};
use crate::error::{EngineError, Result};
use cg_constraint::{CheckList, Constraint, SingleValued, Triple};
use cg_core::{CloneId, DeltaMessage, Tid, TreeClock, TripleId};
use cg_dataset::{GraphStore, KvStore, MeldUpdate, Patch, Snapshot, SuSetDataset};
use cg_journal::JournalEntry;
use cg_remotes::{RemoteEvent, Remotes, RemotesError, ReplyBody, RequestKind, Transport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Remotes(RemotesError::Serialization(e))
    }
}

impl From<cg_core::CoreError> for EngineError {
    fn from(e: cg_core::CoreError) -> Self {
        EngineError::Dataset(cg_dataset::DatasetError::Wire(e))
    }
}

/// Where a clone is in its lifecycle. Only [`EngineState::Online`] clones may
/// safely serve peer requests from their own dataset — a bootstrapping clone
/// has nothing trustworthy to answer with yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Offline,
    Bootstrapping,
    Online,
}

/// One chunk of a streamed snapshot transfer, framed separately from
/// [`Snapshot`] itself so the wire payload can be split across several
/// stream items sized by `snapshot_batch_size`, rather than serialized whole.
#[derive(Debug, Serialize, Deserialize)]
enum SnapshotChunk {
    Meta {
        time: TreeClock,
        tid_contributors: Vec<(TripleId, Vec<Tid>)>,
        all_tids: Vec<Tid>,
    },
    Triples(Vec<Triple>),
}

fn reassemble_snapshot(chunks: Vec<Vec<u8>>) -> Result<Snapshot> {
    let mut time = None;
    let mut tid_contributors = Vec::new();
    let mut all_tids = Vec::new();
    let mut triples = Vec::new();
    for bytes in chunks {
        match serde_json::from_slice(&bytes)? {
            SnapshotChunk::Meta {
                time: t,
                tid_contributors: c,
                all_tids: a,
            } => {
                time = Some(t);
                tid_contributors = c;
                all_tids = a;
            }
            SnapshotChunk::Triples(mut t) => triples.append(&mut t),
        }
    }
    Ok(Snapshot {
        time: time.ok_or(EngineError::BootstrapUnavailable)?,
        triples,
        tid_contributors,
        all_tids,
    })
}

/// Orchestrates one clone: local writes, inbound remote traffic, bootstrap,
/// and lifecycle state, over a [`SuSetDataset`] and a [`Remotes`] transport
/// facade.
pub struct CloneEngine<G: GraphStore, C: Constraint, K: KvStore, T: Transport> {
    config: CloneConfig,
    dataset: SuSetDataset<G, C, K>,
    remotes: Remotes<T>,
    state: EngineState,
}

impl<G: GraphStore, K: KvStore, T: Transport> CloneEngine<G, CheckList, K, T> {
    /// Construct a clone whose constraint list is driven entirely by
    /// `config.constraints`, the common case — a hand-assembled `CheckList`
    /// is only needed when a constraint has no configuration-representable
    /// form.
    pub fn from_config(config: CloneConfig, graph: G, kv: K, transport: Arc<T>) -> Self {
        let mut list = CheckList::new();
        for c in &config.constraints {
            list = match c {
                ConstraintConfig::SingleValued { property } => list.push(SingleValued::new(property.clone())),
            };
        }
        Self::new(config, graph, list, kv, transport)
    }
}

impl<G: GraphStore, C: Constraint, K: KvStore, T: Transport> CloneEngine<G, C, K, T> {
    /// Construct a clone in [`EngineState::Offline`], with a placeholder
    /// genesis identity that [`CloneEngine::bootstrap`] will replace unless
    /// this clone turns out to be the genesis clone itself.
    pub fn new(config: CloneConfig, graph: G, constraint: C, kv: K, transport: Arc<T>) -> Self {
        crate::logging::init_logging(&config.log_level);
        let clone_id = CloneId::new(config.id.clone());
        CloneEngine {
            dataset: SuSetDataset::new(clone_id, TreeClock::genesis(), graph, constraint, kv),
            remotes: Remotes::new(transport),
            config,
            state: EngineState::Offline,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn time(&self) -> &TreeClock {
        self.dataset.time()
    }

    /// Read-only access to committed state, for querying outside of a
    /// transaction.
    pub fn graph(&self) -> &G {
        self.dataset.graph()
    }

    /// Bring this clone online: first acquires the storage directory's
    /// exclusive lock, failing startup outright if another process already
    /// holds it. A genesis clone claims the identity
    /// directly. Configuring more than one clone as genesis within the same
    /// domain is a deployment error the election can't resolve on its own —
    /// every genesis candidate is the same bit pattern, so there is nothing
    /// distinguishing for `elect_genesis` to compare. Everyone else asks an
    /// online peer to fork off a fresh identity and catches up via revup or,
    /// failing that, a snapshot.
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.dataset.kv().require_lock().await.map_err(|_| EngineError::StorageLocked)?;

        if self.config.genesis {
            self.remotes.elect_genesis(&TreeClock::genesis())?;
            info!(clone = %self.config.id, "starting as genesis, online");
            self.state = EngineState::Online;
            return Ok(());
        }
        self.join_existing().await
    }

    async fn join_existing(&mut self) -> Result<()> {
        self.state = EngineState::Bootstrapping;

        let reply = self.remotes.request(RequestKind::NewClock, self.config.send_timeout()).await?;
        let granted = match reply {
            ReplyBody::NewClock { time } => time,
            _ => return Err(EngineError::BootstrapUnavailable),
        };
        let since = granted.clone();
        self.dataset.set_time(granted);

        let reply = self
            .remotes
            .request(RequestKind::Revup { since: since.clone() }, self.config.send_timeout())
            .await?;
        match reply {
            ReplyBody::StreamStarted { stream_id } => {
                let chunks = self.remotes.receive_stream(stream_id).await?;
                self.replay_revup_chunks(chunks).await?;
            }
            ReplyBody::Unavailable { .. } => {
                let reply = self.remotes.request(RequestKind::Snapshot, self.config.send_timeout()).await?;
                match reply {
                    ReplyBody::StreamStarted { stream_id } => {
                        let chunks = self.remotes.receive_stream(stream_id).await?;
                        let snapshot = reassemble_snapshot(chunks)?;
                        self.dataset.apply_snapshot(snapshot);
                    }
                    _ => return Err(EngineError::BootstrapUnavailable),
                }
            }
            _ => return Err(EngineError::BootstrapUnavailable),
        }

        info!(clone = %self.config.id, ticks = self.dataset.time().ticks(), "bootstrap complete, online");
        self.state = EngineState::Online;
        Ok(())
    }

    async fn replay_revup_chunks(&mut self, chunks: Vec<Vec<u8>>) -> Result<()> {
        for bytes in chunks {
            let entries: Vec<JournalEntry> = serde_json::from_slice(&bytes)?;
            for entry in entries {
                let delta = DeltaMessage::decode(&entry.payload)?;
                if let Some(outcome) = self.dataset.apply(delta)? {
                    if let Some(repair) = outcome.repair {
                        self.remotes.publish_delta(&self.config.domain, &repair).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Commit a local write and publish the resulting delta to the domain
    /// topic.
    pub async fn transact(&mut self, patch: Patch) -> Result<DeltaMessage> {
        if self.state != EngineState::Online {
            return Err(EngineError::Closed);
        }
        let delta = self.dataset.transact(patch)?;
        self.remotes.publish_delta(&self.config.domain, &delta).await?;
        Ok(delta)
    }

    /// Pull and act on the next inbound remote event: apply a broadcast
    /// delta (publishing any repair it forced), or serve a peer's bootstrap
    /// request. Returns the net local effect of an applied delta, if any.
    pub async fn poll_once(&mut self) -> Result<Option<MeldUpdate>> {
        let event = self.remotes.poll_once().await?;
        match event {
            None => Ok(None),
            Some(RemoteEvent::Delta(msg)) => match self.dataset.apply(msg)? {
                Some(outcome) => {
                    if let Some(repair) = &outcome.repair {
                        self.remotes.publish_delta(&self.config.domain, repair).await?;
                    }
                    Ok(Some(outcome.update))
                }
                None => Ok(None),
            },
            Some(RemoteEvent::Request { from, correlation, kind }) => {
                self.serve_request(from, correlation, kind).await?;
                Ok(None)
            }
        }
    }

    async fn serve_request(&mut self, from: String, correlation: Uuid, kind: RequestKind) -> Result<()> {
        if self.state != EngineState::Online {
            self.remotes
                .reply(&from, correlation, ReplyBody::Unavailable { reason: "not yet online".into() })
                .await?;
            return Ok(());
        }
        match kind {
            RequestKind::NewClock => {
                let (keep, granted) = self.dataset.time().fork();
                self.dataset.set_time(keep);
                self.remotes.reply(&from, correlation, ReplyBody::NewClock { time: granted }).await?;
            }
            RequestKind::Snapshot => {
                let snapshot = self.dataset.take_snapshot();
                let stream_id = Uuid::new_v4();
                self.remotes.reply(&from, correlation, ReplyBody::StreamStarted { stream_id }).await?;
                let mut chunks = vec![serde_json::to_vec(&SnapshotChunk::Meta {
                    time: snapshot.time,
                    tid_contributors: snapshot.tid_contributors,
                    all_tids: snapshot.all_tids,
                })?];
                for batch in snapshot.triples.chunks(self.config.snapshot_batch_size.max(1)) {
                    chunks.push(serde_json::to_vec(&SnapshotChunk::Triples(batch.to_vec()))?);
                }
                self.remotes.stream_to(&from, stream_id, chunks).await?;
            }
            RequestKind::Revup { since } => match self.dataset.operations_since(&since) {
                Some(entries) => {
                    let entries: Vec<JournalEntry> = entries.cloned().collect();
                    let stream_id = Uuid::new_v4();
                    self.remotes.reply(&from, correlation, ReplyBody::StreamStarted { stream_id }).await?;
                    let mut chunks = Vec::new();
                    for batch in entries.chunks(self.config.snapshot_batch_size.max(1)) {
                        chunks.push(serde_json::to_vec(batch)?);
                    }
                    self.remotes.stream_to(&from, stream_id, chunks).await?;
                }
                None => {
                    self.remotes
                        .reply(
                            &from,
                            correlation,
                            ReplyBody::Unavailable { reason: "no shared history, snapshot required".into() },
                        )
                        .await?;
                }
            },
        }
        Ok(())
    }
}
