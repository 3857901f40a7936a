// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Error types for names, datum evaluation and graph editing

use thiserror::Error;

/// Error raised when a string is not a valid [`Name`](crate::Name)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("'{0}' is not a valid identifier")]
    InvalidSyntax(String),

    #[error("'{0}' is a reserved word")]
    Reserved(String),
}

/// Coarse classification of evaluation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    /// A datum was re-entered while it was already being recomputed
    Cycle,
    /// The formula did not parse or referenced something that does not exist
    ParseOrName,
    /// The value could not be coerced to the expected type
    TypeMismatch,
    /// A datum handle that does not belong to the graph
    UnknownDatum,
}

/// Error produced while recomputing a datum
///
/// Only [`EvalError::Cycle`] aborts a `value()` call; every other variant is
/// absorbed by the datum that produced it and stored alongside its last good value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("cycle detected while evaluating '{datum}'")]
    Cycle { datum: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("datum {0} does not exist")]
    UnknownDatum(String),

    #[error("'{target}' has no attribute '{attribute}'")]
    UnknownAttribute { target: String, attribute: String },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("name '{0}' is already in use")]
    NameTaken(String),

    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("{function}() takes {expected} arguments, got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },
}

impl EvalError {
    pub fn kind(&self) -> EvalErrorKind {
        match self {
            EvalError::Cycle { .. } => EvalErrorKind::Cycle,
            EvalError::TypeMismatch { .. } | EvalError::Arity { .. } => EvalErrorKind::TypeMismatch,
            EvalError::UnknownDatum(_) => EvalErrorKind::UnknownDatum,
            EvalError::Parse(_)
            | EvalError::UnknownName(_)
            | EvalError::UnknownAttribute { .. }
            | EvalError::UnknownFunction(_)
            | EvalError::InvalidName(_)
            | EvalError::NameTaken(_) => EvalErrorKind::ParseOrName,
        }
    }

    pub fn is_cycle(&self) -> bool {
        self.kind() == EvalErrorKind::Cycle
    }

    pub(crate) fn mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Error raised by structural edits to a [`Graph`](crate::Graph)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(u64),

    #[error("datum {0} does not exist")]
    UnknownDatum(u64),

    #[error("connection {0} does not exist")]
    UnknownConnection(u64),

    #[error("node already has a datum named '{0}'")]
    DuplicateDatum(String),

    #[error("datum {0} is computed by its node and has no formula")]
    NotAFormula(u64),

    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("name '{0}' is already in use")]
    NameTaken(String),
}
