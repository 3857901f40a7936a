// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Stack of datums currently being recomputed

use super::DatumId;

/// The datums whose recomputation is in progress, innermost last.
///
/// The top of the stack is the reader that a `value()` call registers as a
/// listener; presence anywhere in the stack means re-entry, i.e. a cycle.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    stack: Vec<DatumId>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: DatumId) {
        self.stack.push(id);
    }

    pub fn pop(&mut self) -> Option<DatumId> {
        self.stack.pop()
    }

    pub fn top(&self) -> Option<DatumId> {
        self.stack.last().copied()
    }

    pub fn contains(&self, id: DatumId) -> bool {
        self.stack.contains(&id)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
