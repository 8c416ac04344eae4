//! The shapes a transaction moves through: the `Patch` a caller requests,
//! and the `MeldUpdate` notification subscribers receive once it (and any
//! constraint repair) has actually landed.

use cg_constraint::Triple;
use serde::{Deserialize, Serialize};

/// What a caller asks `transact` to do: insert some JSON-LD subject maps,
/// retract some already-resolved triples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Patch {
    pub inserts: Vec<serde_json::Value>,
    pub deletes: Vec<Triple>,
}

/// The net effect actually committed — after flattening, after any
/// constraint repair — delivered to local subscribers of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeldUpdate {
    pub inserts: Vec<Triple>,
    pub deletes: Vec<Triple>,
}

impl MeldUpdate {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }
}
