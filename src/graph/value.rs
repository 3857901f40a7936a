// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Datum values and declared types

use crate::error::EvalError;
use crate::geometry::Expression;
use crate::name::Name;
use std::collections::BTreeMap;
use std::fmt;

/// A value held by a datum or produced by a formula
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Integer(i64),
    Bool(bool),
    Text(String),
    Name(Name),
    Expression(Expression),
    /// Named results of a script node
    Outputs(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Float(_) => "Float",
            Value::Integer(_) => "Integer",
            Value::Bool(_) => "Bool",
            Value::Text(_) => "Text",
            Value::Name(_) => "Name",
            Value::Expression(_) => "Expression",
            Value::Outputs(_) => "Outputs",
        }
    }

    /// Numeric view of the value; integers and booleans widen to `f64`
    pub fn as_f64(&self) -> Result<f64, EvalError> {
        match self {
            Value::Float(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(EvalError::mismatch("Float", other.type_name())),
        }
    }

    pub fn as_i64(&self) -> Result<i64, EvalError> {
        match self {
            Value::Integer(v) => Ok(*v),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
            other => Err(EvalError::mismatch("Integer", other.type_name())),
        }
    }

    pub fn as_str(&self) -> Result<&str, EvalError> {
        match self {
            Value::Text(s) => Ok(s),
            Value::Name(n) => Ok(n.as_str()),
            other => Err(EvalError::mismatch("Text", other.type_name())),
        }
    }

    pub fn as_expression(&self) -> Result<&Expression, EvalError> {
        match self {
            Value::Expression(e) => Ok(e),
            other => Err(EvalError::mismatch("Expression", other.type_name())),
        }
    }

    /// Truthiness used by the boolean operators on plain numbers
    pub fn truthy(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Integer(v) => Ok(*v != 0),
            Value::Float(v) => Ok(*v != 0.0),
            Value::Text(s) => Ok(!s.is_empty()),
            other => Err(EvalError::mismatch("Bool", other.type_name())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Name(n) => write!(f, "{n}"),
            Value::Expression(e) => write!(f, "{e}"),
            Value::Outputs(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<Expression> for Value {
    fn from(e: Expression) -> Self {
        Value::Expression(e)
    }
}

/// The declared type of a datum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatumType {
    Float,
    Integer,
    Text,
    Name,
    Expression,
    StructuredOutputs,
}

impl DatumType {
    /// Convert a computed value to this type
    pub fn coerce(self, value: Value) -> Result<Value, EvalError> {
        match (self, value) {
            (DatumType::Float, v @ Value::Float(_)) => Ok(v),
            (DatumType::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (DatumType::Integer, v @ (Value::Integer(_) | Value::Bool(_) | Value::Float(_))) => {
                v.as_i64().map(Value::Integer)
            }
            (DatumType::Text, v @ Value::Text(_)) => Ok(v),
            (DatumType::Text, Value::Name(n)) => Ok(Value::Text(n.into())),
            (DatumType::Name, v @ Value::Name(_)) => Ok(v),
            (DatumType::Name, Value::Text(s)) => Ok(Value::Name(Name::new(s)?)),
            (DatumType::Expression, v @ Value::Expression(_)) => Ok(v),
            (DatumType::StructuredOutputs, v @ Value::Outputs(_)) => Ok(v),
            (ty, v) => Err(EvalError::mismatch(ty.to_string(), v.type_name())),
        }
    }

    /// Formula text a datum of this type falls back to when it has nothing better
    pub fn default_literal(self) -> &'static str {
        match self {
            DatumType::Float => "0.0",
            DatumType::Integer => "0",
            DatumType::Text | DatumType::StructuredOutputs => "",
            DatumType::Name => "_",
            DatumType::Expression => "empty()",
        }
    }

    /// Literal types take their formula text verbatim instead of parsing it
    pub fn is_literal(self) -> bool {
        matches!(self, DatumType::Text | DatumType::Name)
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatumType::Float => "Float",
            DatumType::Integer => "Integer",
            DatumType::Text => "Text",
            DatumType::Name => "Name",
            DatumType::Expression => "Expression",
            DatumType::StructuredOutputs => "StructuredOutputs",
        };
        f.write_str(name)
    }
}
