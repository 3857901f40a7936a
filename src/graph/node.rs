// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Nodes: named owners of an ordered set of datums

use super::DatumId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to a node; never reused within a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Datum that every node carries for its name
pub const NAME_DATUM: &str = "name";

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: String,
    /// Insertion-ordered datums; the name datum is always first
    datums: Vec<(String, DatumId)>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            datums: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Label of the node type, e.g. `"Circle"`
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn datum(&self, name: &str) -> Option<DatumId> {
        self.datums
            .iter()
            .find_map(|(n, id)| (n == name).then_some(*id))
    }

    pub fn name_datum(&self) -> Option<DatumId> {
        self.datum(NAME_DATUM)
    }

    pub fn datums(&self) -> impl Iterator<Item = (&str, DatumId)> + '_ {
        self.datums.iter().map(|(n, id)| (n.as_str(), *id))
    }

    pub fn datum_ids(&self) -> impl Iterator<Item = DatumId> + '_ {
        self.datums.iter().map(|(_, id)| *id)
    }

    pub(crate) fn push_datum(&mut self, name: impl Into<String>, id: DatumId) {
        self.datums.push((name.into(), id));
    }
}
