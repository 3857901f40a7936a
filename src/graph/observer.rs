// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Publish/subscribe notifications for graph changes

use super::{ConnectionId, DatumId, NodeId};

/// Something observable happened to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// A datum's `(value, valid)` pair changed after recomputation
    DatumChanged { datum: DatumId, valid: bool },
    /// A datum was marked for recomputation
    DatumStale { datum: DatumId },
    NodeAdded { node: NodeId },
    NodeDeleted { node: NodeId },
    Connected {
        connection: ConnectionId,
        source: DatumId,
        target: DatumId,
    },
    Disconnected {
        connection: ConnectionId,
        source: DatumId,
        target: DatumId,
    },
}

impl GraphEvent {
    /// Datum the event is about, if any
    pub fn datum(&self) -> Option<DatumId> {
        match self {
            GraphEvent::DatumChanged { datum, .. } | GraphEvent::DatumStale { datum } => Some(*datum),
            GraphEvent::Connected { target, .. } | GraphEvent::Disconnected { target, .. } => Some(*target),
            GraphEvent::NodeAdded { .. } | GraphEvent::NodeDeleted { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// A list of subscribers notified in subscription order
pub struct Subject<T> {
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
    next_id: u64,
}

impl<T> Subject<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
