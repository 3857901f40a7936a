// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Formula syntax tree

use crate::graph::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Neg,
    Pos,
    /// `~`: complement of an expression
    Complement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Literal(Value),
    Ident(String),
    Call(String, Vec<Ast>),
    Attribute(Box<Ast>, String),
    Unary(Prefix, Box<Ast>),
    Binary(Operator, Box<Ast>, Box<Ast>),
}
