// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! The reactive graph: node/datum/connection arenas and the evaluation protocol
//!
//! Datums recompute lazily. Reading a datum while another one is being
//! recomputed registers the reader as a listener; a later change marks every
//! transitive listener stale without recomputing it.

use super::formula::{self, FunctionRegistry};
use super::node::NAME_DATUM;
use super::script::run_script;
use super::{
    Combiner, Connection, ConnectionId, Datum, DatumId, DatumSource, DatumSpec, DatumType,
    EvaluationContext, GraphEvent, InputPolicy, Link, Node, NodeId, NodeRegistry, Subject,
    SubscriptionId, Value,
};
use crate::config::EngineConfig;
use crate::error::{EvalError, EvalErrorKind, GraphError};
use crate::geometry::Expression;
use crate::kernel::Snapshot;
use crate::name::Name;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// How a datum obtains its value on the next recomputation
enum Plan {
    Single(DatumId),
    Multi(Vec<DatumId>, Combiner),
    Own(DatumSource),
}

/// A graph of nodes, datums and connections.
///
/// All access is single-threaded and reentrant: host functions receive
/// `&mut Graph` and read other datums through [`Graph::value`].
#[derive(Debug)]
pub struct Graph {
    registry: NodeRegistry,
    datums: AHashMap<DatumId, Datum>,
    connections: AHashMap<ConnectionId, Connection>,
    context: EvaluationContext,
    observers: Subject<GraphEvent>,
    functions: Arc<FunctionRegistry>,
    config: EngineConfig,
    next_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            registry: NodeRegistry::new(),
            datums: AHashMap::new(),
            connections: AHashMap::new(),
            context: EvaluationContext::new(),
            observers: Subject::new(),
            functions: Arc::new(FunctionRegistry::standard(&config)),
            config,
            next_id: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub(crate) fn function_table(&self) -> Arc<FunctionRegistry> {
        Arc::clone(&self.functions)
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Create a node with a unique name and its `name` datum
    pub fn add_node(&mut self, kind: &str, name: &str) -> Result<NodeId, GraphError> {
        let name = Name::new(name)?;
        if self.node_names().any(|n| n == name.as_str()) {
            return Err(GraphError::NameTaken(name.into()));
        }

        let id = NodeId(self.next_id());
        self.registry.insert(Node::new(id, kind));
        let label = Name::new(NAME_DATUM)?;
        self.insert_datum(
            id,
            label,
            DatumType::Name,
            DatumSource::Formula(name.to_string()),
            InputPolicy::None,
        );

        debug!(node = %id, kind, name = %name, "Node added");
        self.observers.emit(&GraphEvent::NodeAdded { node: id });
        self.retry_invalid();
        Ok(id)
    }

    /// Extend a node with another datum
    pub fn add_datum(&mut self, node: NodeId, spec: DatumSpec) -> Result<DatumId, GraphError> {
        let name = Name::new(spec.name)?;
        let owner = self
            .registry
            .get(node)
            .ok_or(GraphError::UnknownNode(node.raw()))?;
        if owner.datum(name.as_str()).is_some() {
            return Err(GraphError::DuplicateDatum(name.into()));
        }

        let id = self.insert_datum(node, name, spec.ty, spec.source, spec.input.into());
        self.retry_invalid();
        Ok(id)
    }

    fn insert_datum(
        &mut self,
        node: NodeId,
        name: Name,
        ty: DatumType,
        source: DatumSource,
        input: InputPolicy,
    ) -> DatumId {
        let id = DatumId(self.next_id());
        if let Some(owner) = self.registry.get_mut(node) {
            owner.push_datum(name.as_str(), id);
        }
        trace!(datum = %id, node = %node, name = %name, ty = %ty, "Datum added");
        self.datums.insert(id, Datum::new(name, node, ty, source, input));
        id
    }

    /// Delete a node, its datums and every connection touching them
    pub fn delete_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        let owned: Vec<DatumId> = self
            .registry
            .get(node)
            .ok_or(GraphError::UnknownNode(node.raw()))?
            .datum_ids()
            .collect();

        let mut edges: Vec<ConnectionId> = owned
            .iter()
            .filter_map(|id| self.datums.get(id))
            .flat_map(|d| {
                d.outputs
                    .iter()
                    .copied()
                    .chain(d.input.links().iter().map(|l| l.connection))
                    .collect::<Vec<_>>()
            })
            .collect();
        edges.sort();
        edges.dedup();
        for connection in edges {
            self.disconnect(connection)?;
        }

        let mut orphaned = Vec::new();
        for id in &owned {
            let Some(datum) = self.datums.remove(id) else {
                continue;
            };
            for source in &datum.sources {
                if let Some(s) = self.datums.get_mut(source) {
                    s.listeners.remove(id);
                }
            }
            orphaned.extend(datum.listeners.iter().copied());
        }
        for listener in &orphaned {
            if let Some(d) = self.datums.get_mut(listener) {
                for id in &owned {
                    d.sources.remove(id);
                }
            }
        }

        self.registry.remove(node);
        debug!(node = %node, datums = owned.len(), "Node deleted");
        self.observers.emit(&GraphEvent::NodeDeleted { node });

        for listener in orphaned {
            if self.datums.contains_key(&listener) {
                self.invalidate(listener);
            }
        }
        self.retry_invalid();
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.registry.get(id)
    }

    /// Live nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.registry.iter()
    }

    pub fn node_count(&self) -> usize {
        self.registry.len()
    }

    /// Current text of a node's name datum
    pub fn node_name(&self, node: NodeId) -> Option<&str> {
        let id = self.registry.get(node)?.name_datum()?;
        self.datums.get(&id)?.formula()
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.registry.ids().iter().filter_map(|id| self.node_name(*id))
    }

    /// First node whose name text matches, without registering a dependency
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.registry
            .ids()
            .iter()
            .copied()
            .find(|id| self.node_name(*id) == Some(name))
    }

    /// `prefix` plus the lowest integer suffix no live node uses
    pub fn unique_name(&self, prefix: &str) -> String {
        NodeRegistry::unique_name(prefix, self.node_names())
    }

    /// Resolve a node by name from inside a formula.
    ///
    /// Reads the candidates' name datums so that renames invalidate the reader.
    pub(crate) fn resolve_node(&mut self, name: &str) -> Result<Option<NodeId>, EvalError> {
        let candidates: Vec<(NodeId, DatumId)> = self
            .registry
            .iter()
            .filter_map(|n| Some((n.id(), n.name_datum()?)))
            .filter(|(_, d)| self.datums.get(d).and_then(Datum::formula) == Some(name))
            .collect();

        let mut first_error = None;
        for (node, datum) in candidates {
            match self.value(datum) {
                Ok(_) => return Ok(Some(node)),
                Err(err) if err.is_cycle() => return Err(err),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(None), Err)
    }

    // ------------------------------------------------------------------
    // Datums
    // ------------------------------------------------------------------

    pub fn datum(&self, id: DatumId) -> Option<&Datum> {
        self.datums.get(&id)
    }

    pub fn get_datum(&self, node: NodeId, name: &str) -> Option<DatumId> {
        self.registry.get(node)?.datum(name)
    }

    /// Replace a datum's formula and mark it (and its listeners) stale
    pub fn set_formula(&mut self, id: DatumId, text: &str) -> Result<(), GraphError> {
        let datum = self
            .datums
            .get_mut(&id)
            .ok_or(GraphError::UnknownDatum(id.raw()))?;
        if matches!(datum.source, DatumSource::Function(_)) {
            return Err(GraphError::NotAFormula(id.raw()));
        }
        datum.source = DatumSource::Formula(text.to_string());
        let renamed = datum.name.as_str() == NAME_DATUM;

        debug!(datum = %id, formula = text, "Formula set");
        self.invalidate(id);

        if renamed {
            // Uniqueness depends on every other name
            let names: Vec<DatumId> = self.registry.iter().filter_map(Node::name_datum).collect();
            for name in names {
                self.invalidate(name);
            }
            self.retry_invalid();
        }
        Ok(())
    }

    /// Current value of a datum, recomputing it first if it is stale.
    ///
    /// Called during another datum's recomputation, this registers that datum
    /// as a listener. Errors other than [`EvalError::Cycle`] are the datum's
    /// stored error; reading an invalid datum does not abort the caller.
    pub fn value(&mut self, id: DatumId) -> Result<Value, EvalError> {
        if !self.datums.contains_key(&id) {
            return Err(EvalError::UnknownDatum(id.to_string()));
        }
        if let Some(reader) = self.context.top() {
            if reader != id {
                self.add_dependency(id, reader);
            }
        }
        if self.context.contains(id) {
            let err = self.cycle_error(id);
            warn!(datum = %id, depth = self.context.depth(), "{}", err);
            return Err(err);
        }

        if self.datums.get(&id).is_some_and(|d| d.stale) {
            self.update(id)?;
        }
        match self.datums.get(&id) {
            Some(datum) => datum.result(),
            None => Err(EvalError::UnknownDatum(id.to_string())),
        }
    }

    /// True if the datum evaluates without error
    pub fn is_valid(&mut self, id: DatumId) -> bool {
        self.value(id).is_ok()
    }

    /// Read a datum of `node` by name
    pub fn read(&mut self, node: NodeId, name: &str) -> Result<Value, EvalError> {
        match self.get_datum(node, name) {
            Some(id) => self.value(id),
            None => Err(EvalError::UnknownAttribute {
                target: self.node_name(node).unwrap_or("?").to_string(),
                attribute: name.to_string(),
            }),
        }
    }

    pub fn read_f64(&mut self, node: NodeId, name: &str) -> Result<f64, EvalError> {
        self.read(node, name)?.as_f64()
    }

    pub fn read_text(&mut self, node: NodeId, name: &str) -> Result<String, EvalError> {
        Ok(self.read(node, name)?.as_str()?.to_string())
    }

    pub fn read_expression(&mut self, node: NodeId, name: &str) -> Result<Expression, EvalError> {
        match self.read(node, name)? {
            Value::Expression(e) => Ok(e),
            other => Err(EvalError::mismatch("Expression", other.type_name())),
        }
    }

    /// Evaluate a formula outside of any datum
    pub fn evaluate(&mut self, text: &str) -> Result<Value, EvalError> {
        formula::evaluate(self, text, &BTreeMap::new())
    }

    /// Evaluate an Expression datum and materialize it for the geometry kernel
    pub fn snapshot(&mut self, id: DatumId) -> Result<Snapshot, EvalError> {
        match self.value(id)? {
            Value::Expression(e) => Ok(Snapshot::of(&e)),
            other => Err(EvalError::mismatch("Expression", other.type_name())),
        }
    }

    fn update(&mut self, id: DatumId) -> Result<(), EvalError> {
        if self.context.contains(id) {
            return Err(self.cycle_error(id));
        }

        self.clear_sources(id);
        self.context.push(id);
        let result = self.compute(id);
        self.context.pop();

        if let Err(err) = &result {
            if err.is_cycle() {
                return Err(err.clone());
            }
        }

        let Some(datum) = self.datums.get_mut(&id) else {
            return Ok(());
        };
        let fresh = datum.value.is_none() && datum.error.is_none();
        let was_valid = datum.error.is_none();
        datum.stale = false;

        let changed = match result {
            Ok(value) => {
                let changed = !was_valid || datum.value.as_ref() != Some(&value);
                datum.value = Some(value);
                datum.error = None;
                changed
            }
            Err(err) => {
                debug!(datum = %id, error = %err, "Datum invalid");
                let changed = was_valid || datum.error.as_ref() != Some(&err);
                datum.error = Some(err);
                changed
            }
        };
        let valid = datum.error.is_none();
        debug!(datum = %id, valid, changed, "Datum recomputed");

        if changed || fresh {
            self.observers.emit(&GraphEvent::DatumChanged { datum: id, valid });
            self.notify_listeners(id);
        }
        Ok(())
    }

    fn compute(&mut self, id: DatumId) -> Result<Value, EvalError> {
        let datum = self
            .datums
            .get(&id)
            .ok_or_else(|| EvalError::UnknownDatum(id.to_string()))?;
        let (ty, node) = (datum.ty, datum.node);
        let is_name = datum.name.as_str() == NAME_DATUM;

        let plan = match &datum.input {
            InputPolicy::Single(Some(link)) => Plan::Single(link.source),
            InputPolicy::Multi { links, combiner } if !links.is_empty() => {
                Plan::Multi(links.iter().map(|l| l.source).collect(), combiner.clone())
            }
            _ => Plan::Own(datum.source.clone()),
        };

        let value = match plan {
            Plan::Single(source) => self.value(source)?,
            Plan::Multi(sources, combiner) => {
                let values = sources
                    .into_iter()
                    .map(|source| self.value(source))
                    .collect::<Result<Vec<_>, _>>()?;
                combine_pairwise(values, &combiner)?
            }
            Plan::Own(DatumSource::Function(f)) => f(self, node)?,
            Plan::Own(DatumSource::Formula(text)) if ty.is_literal() => Value::Text(text),
            Plan::Own(DatumSource::Formula(text)) if ty == DatumType::StructuredOutputs => {
                Value::Outputs(run_script(self, &text)?)
            }
            Plan::Own(DatumSource::Formula(text)) => formula::evaluate(self, &text, &BTreeMap::new())?,
        };

        let value = ty.coerce(value)?;
        if is_name {
            if let Value::Name(name) = &value {
                self.check_unique(node, name.as_str())?;
            }
        }
        Ok(value)
    }

    /// The first node in creation order owns a name; later holders are invalid
    fn check_unique(&self, node: NodeId, name: &str) -> Result<(), EvalError> {
        match self.find_node(name) {
            Some(owner) if owner != node => Err(EvalError::NameTaken(name.to_string())),
            _ => Ok(()),
        }
    }

    fn cycle_error(&self, id: DatumId) -> EvalError {
        EvalError::Cycle {
            datum: self.describe(id),
        }
    }

    /// `node.datum` label for messages
    pub fn describe(&self, id: DatumId) -> String {
        match self.datums.get(&id) {
            Some(d) => format!("{}.{}", self.node_name(d.node).unwrap_or("?"), d.name),
            None => id.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Dependency tracking
    // ------------------------------------------------------------------

    fn add_dependency(&mut self, source: DatumId, reader: DatumId) {
        if let Some(s) = self.datums.get_mut(&source) {
            if s.listeners.insert(reader) {
                trace!(source = %source, reader = %reader, "Dependency registered");
            }
        }
        if let Some(r) = self.datums.get_mut(&reader) {
            r.sources.insert(source);
        }
    }

    /// Drop every edge registered by the datum's previous recomputation
    fn clear_sources(&mut self, id: DatumId) {
        let sources = match self.datums.get_mut(&id) {
            Some(d) => std::mem::take(&mut d.sources),
            None => return,
        };
        for source in sources {
            if let Some(s) = self.datums.get_mut(&source) {
                s.listeners.remove(&id);
            }
        }
    }

    /// Mark a datum stale and push staleness to its listeners
    fn invalidate(&mut self, id: DatumId) {
        if self.context.contains(id) {
            return;
        }
        if let Some(d) = self.datums.get_mut(&id) {
            if !d.stale {
                d.stale = true;
                self.observers.emit(&GraphEvent::DatumStale { datum: id });
            }
        }
        self.notify_listeners(id);
    }

    fn notify_listeners(&mut self, id: DatumId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let listeners: Vec<DatumId> = match self.datums.get(&current) {
                Some(d) => d.listeners.iter().copied().collect(),
                None => continue,
            };
            for listener in listeners {
                if self.context.contains(listener) {
                    continue;
                }
                let Some(d) = self.datums.get_mut(&listener) else {
                    continue;
                };
                if d.stale {
                    continue;
                }
                d.stale = true;
                trace!(datum = %listener, cause = %current, "Marked stale");
                self.observers.emit(&GraphEvent::DatumStale { datum: listener });
                pending.push(listener);
            }
        }
    }

    /// Give datums that failed to resolve a name another chance
    fn retry_invalid(&mut self) {
        let retry: Vec<DatumId> = self
            .datums
            .iter()
            .filter(|(id, d)| {
                !d.stale
                    && !self.context.contains(**id)
                    && d.error
                        .as_ref()
                        .is_some_and(|e| e.kind() == EvalErrorKind::ParseOrName)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in retry {
            self.invalidate(id);
        }
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Whether `source` may be connected into `target` right now
    pub fn accepts(&self, source: DatumId, target: DatumId) -> bool {
        let (Some(s), Some(t)) = (self.datums.get(&source), self.datums.get(&target)) else {
            return false;
        };
        s.node != t.node && s.ty == t.ty && t.input.has_room_for(source)
    }

    /// Connect two datums, or `None` if the target's input policy rejects it
    pub fn connect(&mut self, source: DatumId, target: DatumId) -> Option<ConnectionId> {
        if !self.accepts(source, target) {
            debug!(source = %source, target = %target, "Connection rejected");
            return None;
        }

        let id = ConnectionId(self.next_id());
        self.connections.insert(id, Connection { id, source, target });
        if let Some(s) = self.datums.get_mut(&source) {
            s.outputs.push(id);
        }
        if let Some(t) = self.datums.get_mut(&target) {
            t.input.attach(Link {
                connection: id,
                source,
            });
        }

        debug!(connection = %id, source = %source, target = %target, "Connected");
        self.observers.emit(&GraphEvent::Connected {
            connection: id,
            source,
            target,
        });
        self.invalidate(target);
        Some(id)
    }

    /// Remove a connection; the target recomputes on its next read.
    ///
    /// A multi-input datum losing its last connection falls back to its
    /// type's default literal.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<(), GraphError> {
        let connection = self
            .connections
            .remove(&id)
            .ok_or(GraphError::UnknownConnection(id.raw()))?;

        if let Some(s) = self.datums.get_mut(&connection.source) {
            s.outputs.retain(|c| *c != id);
        }
        if let Some(t) = self.datums.get_mut(&connection.target) {
            t.input.detach(id);
            if let InputPolicy::Multi { links, .. } = &t.input {
                if links.is_empty() {
                    t.source = DatumSource::Formula(t.ty.default_literal().to_string());
                }
            }
        }

        debug!(connection = %id, "Disconnected");
        self.observers.emit(&GraphEvent::Disconnected {
            connection: id,
            source: connection.source,
            target: connection.target,
        });
        if self.datums.contains_key(&connection.target) {
            self.invalidate(connection.target);
        }
        Ok(())
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.values()
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn subscribe(&mut self, callback: impl FnMut(&GraphEvent) + Send + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    /// Subscribe to events about a single datum
    pub fn watch(
        &mut self,
        datum: DatumId,
        mut callback: impl FnMut(&GraphEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(move |event| {
            if event.datum() == Some(datum) {
                callback(event);
            }
        })
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold link values in link order, joining neighbours pairwise so long
/// fan-ins stay shallow
fn combine_pairwise(mut layer: Vec<Value>, combiner: &Combiner) -> Result<Value, EvalError> {
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        let mut items = layer.into_iter();
        while let Some(a) = items.next() {
            next.push(match items.next() {
                Some(b) => combiner.combine(a, b)?,
                None => a,
            });
        }
        layer = next;
    }
    layer
        .pop()
        .ok_or_else(|| EvalError::Parse("no inputs".to_string()))
}
