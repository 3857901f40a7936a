// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Input policies: how many connections a datum takes and how they combine

use super::{ConnectionId, DatumId, Value};
use crate::error::EvalError;
use std::fmt;
use std::sync::Arc;

/// One incoming connection as seen from its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub connection: ConnectionId,
    pub source: DatumId,
}

type CombineFn = dyn Fn(Value, Value) -> Result<Value, EvalError> + Send + Sync;

/// Associative operator folding the values of a multi-input datum
#[derive(Clone)]
pub struct Combiner {
    name: &'static str,
    op: Arc<CombineFn>,
}

impl Combiner {
    pub fn new(
        name: &'static str,
        op: impl Fn(Value, Value) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self { name, op: Arc::new(op) }
    }

    /// Symbolic union of expressions
    pub fn union() -> Self {
        Self::new("union", |a, b| {
            Ok(Value::Expression(a.as_expression()?.union(b.as_expression()?)))
        })
    }

    /// Symbolic intersection of expressions
    pub fn intersection() -> Self {
        Self::new("intersection", |a, b| {
            Ok(Value::Expression(a.as_expression()?.intersection(b.as_expression()?)))
        })
    }

    /// Numeric sum; stays integral when both sides are integers
    pub fn sum() -> Self {
        Self::new("sum", |a, b| match (&a, &b) {
            (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x.wrapping_add(*y))),
            _ => Ok(Value::Float(a.as_f64()? + b.as_f64()?)),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn combine(&self, a: Value, b: Value) -> Result<Value, EvalError> {
        (self.op)(a, b)
    }
}

impl Default for Combiner {
    fn default() -> Self {
        Self::union()
    }
}

impl fmt::Debug for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Combiner").field(&self.name).finish()
    }
}

/// Requested input policy when declaring a datum
#[derive(Debug, Clone, Default)]
pub enum InputMode {
    #[default]
    None,
    Single,
    Multi(Combiner),
}

/// Per-datum rule governing incoming connections
#[derive(Debug, Clone)]
pub enum InputPolicy {
    /// Rejects every connection
    None,
    /// At most one connection, whose value replaces the formula
    Single(Option<Link>),
    /// Any number of distinct sources folded with a combiner
    Multi { links: Vec<Link>, combiner: Combiner },
}

impl InputPolicy {
    pub fn links(&self) -> &[Link] {
        match self {
            InputPolicy::None => &[],
            InputPolicy::Single(link) => link.as_slice(),
            InputPolicy::Multi { links, .. } => links,
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.links().is_empty()
    }

    /// Slot check only; type and ownership checks belong to the graph
    pub fn has_room_for(&self, source: DatumId) -> bool {
        match self {
            InputPolicy::None => false,
            InputPolicy::Single(link) => link.is_none(),
            InputPolicy::Multi { links, .. } => links.iter().all(|l| l.source != source),
        }
    }

    pub(crate) fn attach(&mut self, link: Link) {
        match self {
            InputPolicy::None => {}
            InputPolicy::Single(slot) => *slot = Some(link),
            InputPolicy::Multi { links, .. } => links.push(link),
        }
    }

    /// Remove a connection; returns true if it was attached here
    pub(crate) fn detach(&mut self, connection: ConnectionId) -> bool {
        match self {
            InputPolicy::None => false,
            InputPolicy::Single(slot) => {
                if slot.is_some_and(|l| l.connection == connection) {
                    *slot = None;
                    true
                } else {
                    false
                }
            }
            InputPolicy::Multi { links, .. } => {
                let before = links.len();
                links.retain(|l| l.connection != connection);
                links.len() != before
            }
        }
    }
}

impl From<InputMode> for InputPolicy {
    fn from(mode: InputMode) -> Self {
        match mode {
            InputMode::None => InputPolicy::None,
            InputMode::Single => InputPolicy::Single(None),
            InputMode::Multi(combiner) => InputPolicy::Multi {
                links: Vec::new(),
                combiner,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes::circle;

    fn link(c: u64, s: u64) -> Link {
        Link {
            connection: ConnectionId(c),
            source: DatumId(s),
        }
    }

    #[test]
    fn test_single_slot() {
        let mut policy = InputPolicy::from(InputMode::Single);
        assert!(policy.has_room_for(DatumId(1)));
        policy.attach(link(10, 1));
        assert!(!policy.has_room_for(DatumId(2)));
        assert!(!policy.detach(ConnectionId(11)));
        assert!(policy.detach(ConnectionId(10)));
        assert!(policy.has_room_for(DatumId(2)));
    }

    #[test]
    fn test_multi_rejects_repeat_source() {
        let mut policy = InputPolicy::from(InputMode::Multi(Combiner::union()));
        policy.attach(link(10, 1));
        assert!(!policy.has_room_for(DatumId(1)));
        assert!(policy.has_room_for(DatumId(2)));
        policy.attach(link(11, 2));
        assert_eq!(policy.links().len(), 2);
    }

    #[test]
    fn test_none_rejects_everything() {
        assert!(!InputPolicy::None.has_room_for(DatumId(1)));
        assert!(InputPolicy::None.links().is_empty());
    }

    #[test]
    fn test_combiners() {
        let a = Value::Expression(circle(0.0, 0.0, 1.0));
        let b = Value::Expression(circle(4.0, 0.0, 1.0));
        let u = Combiner::union().combine(a.clone(), b).unwrap();
        assert_eq!(u.as_expression().unwrap().bounds().max.x, 5.0);

        assert!(Combiner::union().combine(a, Value::Float(1.0)).is_err());
        assert_eq!(
            Combiner::sum().combine(Value::Integer(2), Value::Integer(3)).unwrap(),
            Value::Integer(5)
        );
        assert_eq!(
            Combiner::sum().combine(Value::Integer(2), Value::Float(0.5)).unwrap(),
            Value::Float(2.5)
        );
    }
}
