// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! The datum formula language: pest grammar, AST, interpreter and builtins

mod ast;
mod builtins;
mod interpreter;
mod parser;

pub use ast::{Ast, Operator, Prefix};
pub use builtins::{Builtin, FunctionRegistry};
pub use interpreter::{evaluate, Locals};
pub use parser::parse;
