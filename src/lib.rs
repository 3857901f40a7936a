// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Fabgraph evaluation core
//!
//! A reactive graph of named datums for node-based procedural CAD, and the
//! implicit CSG expression algebra that flows through it. Shapes are formulas
//! over X, Y and Z (negative inside) paired with conservative bounding boxes.

pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod kernel;
pub mod name;
pub mod utils;

pub use config::EngineConfig;
pub use error::{EvalError, EvalErrorKind, GraphError, NameError};
pub use geometry::{Bounds, Expression};
pub use graph::{DatumId, DatumType, Graph, NodeId, NodeKind, Value};
pub use kernel::{RenderRegion, Snapshot};
pub use name::Name;

/// Evaluate a standalone formula in a fresh graph
pub fn evaluate(formula: &str) -> Result<Value, EvalError> {
    Graph::new().evaluate(formula)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_shape() {
        let value = evaluate("circle(0, 0, 5) | circle(10, 0, 5)").unwrap();
        let bounds = *value.as_expression().unwrap().bounds();
        assert_eq!((bounds.min.x, bounds.max.x), (-5.0, 15.0));
        assert_eq!((bounds.min.y, bounds.max.y), (-5.0, 5.0));
    }
}
