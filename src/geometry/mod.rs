// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Geometry module - implicit shapes with conservative bounds

mod bounds;
mod expression;
mod formula;
mod interval;
pub mod shapes;
pub mod text;
pub mod transforms;

pub use bounds::Bounds;
pub use expression::{Axis, BoundsRule, Expression, Transform};
pub use formula::{BinaryOp, Formula, PrefixError, Substitution, UnaryOp};
pub use interval::Interval;
pub use text::{Align, AlignError, HAlign, VAlign};
