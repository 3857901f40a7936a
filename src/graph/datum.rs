// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Datums: reactive value cells owned by nodes

use super::{ConnectionId, DatumType, Graph, InputMode, InputPolicy, NodeId, Value};
use crate::error::EvalError;
use crate::name::Name;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable handle to a datum; never reused within a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatumId(pub(crate) u64);

impl DatumId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DatumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// Host function computing a datum from its node's other datums
pub type DatumFn = Arc<dyn Fn(&mut Graph, NodeId) -> Result<Value, EvalError> + Send + Sync>;

/// Where a datum's value comes from when nothing is connected to it
#[derive(Clone)]
pub enum DatumSource {
    Formula(String),
    Function(DatumFn),
}

impl fmt::Debug for DatumSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatumSource::Formula(text) => f.debug_tuple("Formula").field(text).finish(),
            DatumSource::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Declaration of a datum to add to a node
#[derive(Debug, Clone)]
pub struct DatumSpec {
    pub name: String,
    pub ty: DatumType,
    pub source: DatumSource,
    pub input: InputMode,
}

impl DatumSpec {
    pub fn formula(name: impl Into<String>, ty: DatumType, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            source: DatumSource::Formula(text.into()),
            input: InputMode::None,
        }
    }

    pub fn function(
        name: impl Into<String>,
        ty: DatumType,
        f: impl Fn(&mut Graph, NodeId) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            source: DatumSource::Function(Arc::new(f)),
            input: InputMode::None,
        }
    }

    pub fn single_input(mut self) -> Self {
        self.input = InputMode::Single;
        self
    }

    pub fn multi_input(mut self, combiner: super::Combiner) -> Self {
        self.input = InputMode::Multi(combiner);
        self
    }
}

/// A single reactive cell.
///
/// The cached value survives evaluation errors: an invalid datum keeps its
/// last good value for display and reports the error on read.
#[derive(Debug)]
pub struct Datum {
    pub(crate) name: Name,
    pub(crate) node: NodeId,
    pub(crate) ty: DatumType,
    pub(crate) source: DatumSource,
    pub(crate) value: Option<Value>,
    pub(crate) error: Option<EvalError>,
    pub(crate) stale: bool,
    pub(crate) input: InputPolicy,
    pub(crate) outputs: Vec<ConnectionId>,
    /// Datums that read this one during their last recomputation
    pub(crate) listeners: AHashSet<DatumId>,
    /// Datums this one read during its last recomputation
    pub(crate) sources: AHashSet<DatumId>,
}

impl Datum {
    pub(crate) fn new(name: Name, node: NodeId, ty: DatumType, source: DatumSource, input: InputPolicy) -> Self {
        Self {
            name,
            node,
            ty,
            source,
            value: None,
            error: None,
            stale: true,
            input,
            outputs: Vec::new(),
            listeners: AHashSet::new(),
            sources: AHashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn ty(&self) -> DatumType {
        self.ty
    }

    /// Formula text, or `None` for function-backed datums
    pub fn formula(&self) -> Option<&str> {
        match &self.source {
            DatumSource::Formula(text) => Some(text),
            DatumSource::Function(_) => None,
        }
    }

    /// Last computed value, without recomputing
    pub fn cached(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&EvalError> {
        self.error.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn input(&self) -> &InputPolicy {
        &self.input
    }

    pub fn outputs(&self) -> &[ConnectionId] {
        &self.outputs
    }

    pub fn listeners(&self) -> impl Iterator<Item = DatumId> + '_ {
        self.listeners.iter().copied()
    }

    pub fn sources(&self) -> impl Iterator<Item = DatumId> + '_ {
        self.sources.iter().copied()
    }

    pub(crate) fn result(&self) -> Result<Value, EvalError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.value
            .clone()
            .ok_or_else(|| EvalError::Parse(format!("'{}' has not been evaluated", self.name)))
    }
}
