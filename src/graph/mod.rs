// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Reactive node graph
//!
//! Nodes own named datums. A datum's value comes from its formula, a host
//! function, or whatever is connected into it; reads made while another datum
//! recomputes become dependency edges that drive lazy invalidation.

mod connection;
mod context;
mod datum;
mod engine;
pub mod formula;
mod input;
mod library;
mod node;
mod observer;
mod registry;
mod script;
mod value;

pub use connection::{Connection, ConnectionId};
pub use context::EvaluationContext;
pub use datum::{Datum, DatumFn, DatumId, DatumSource, DatumSpec};
pub use engine::Graph;
pub use input::{Combiner, InputMode, InputPolicy, Link};
pub use library::{NodeKind, SHAPE_DATUM};
pub use node::{Node, NodeId, NAME_DATUM};
pub use observer::{GraphEvent, Subject, SubscriptionId};
pub use registry::NodeRegistry;
pub use script::{run_script, Assignment, OUTPUTS_DATUM, SCRIPT_DATUM};
pub use value::{DatumType, Value};
