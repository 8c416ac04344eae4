//! The full-state transfer used to bootstrap a new or far-behind clone,
//! bypassing the journal entirely.

use cg_constraint::Triple;
use cg_core::{Tid, TreeClock, TripleId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: TreeClock,
    pub triples: Vec<Triple>,
    pub tid_contributors: Vec<(TripleId, Vec<Tid>)>,
    pub all_tids: Vec<Tid>,
}
