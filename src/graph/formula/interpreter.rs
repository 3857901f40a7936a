// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Tree-walking interpreter for datum formulas

use super::ast::{Ast, Operator, Prefix};
use super::parser::parse;
use crate::error::EvalError;
use crate::graph::{Graph, NodeId, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Locals visible to a formula, e.g. earlier assignments in a script
pub type Locals = BTreeMap<String, Value>;

/// Intermediate result: a node reference is only meaningful before `.attr`
enum Term {
    Value(Value),
    Node(NodeId, String),
}

/// Parse and evaluate `text`, resolving free names against the graph
pub fn evaluate(graph: &mut Graph, text: &str, locals: &Locals) -> Result<Value, EvalError> {
    let ast = parse(text)?;
    Interpreter { graph, locals }.value(&ast)
}

struct Interpreter<'a> {
    graph: &'a mut Graph,
    locals: &'a Locals,
}

impl Interpreter<'_> {
    fn value(&mut self, ast: &Ast) -> Result<Value, EvalError> {
        match self.term(ast)? {
            Term::Value(v) => Ok(v),
            Term::Node(_, name) => Err(EvalError::mismatch("value", format!("node '{}'", name))),
        }
    }

    fn term(&mut self, ast: &Ast) -> Result<Term, EvalError> {
        let value = match ast {
            Ast::Literal(v) => v.clone(),
            Ast::Ident(name) => return self.resolve(name),
            Ast::Attribute(target, attribute) => match self.term(target)? {
                Term::Node(node, _) => self.graph.read(node, attribute)?,
                Term::Value(Value::Outputs(map)) => {
                    map.get(attribute).cloned().ok_or_else(|| EvalError::UnknownAttribute {
                        target: "outputs".to_string(),
                        attribute: attribute.clone(),
                    })?
                }
                Term::Value(other) => {
                    return Err(EvalError::UnknownAttribute {
                        target: other.type_name().to_string(),
                        attribute: attribute.clone(),
                    })
                }
            },
            Ast::Call(name, args) => {
                let functions = self.graph.function_table();
                if !functions.contains(name) {
                    return Err(EvalError::UnknownFunction(name.clone()));
                }
                let args = args
                    .iter()
                    .map(|a| self.value(a))
                    .collect::<Result<Vec<_>, _>>()?;
                functions.call(name, &args)?
            }
            Ast::Unary(prefix, operand) => unary(*prefix, self.value(operand)?)?,
            Ast::Binary(op, lhs, rhs) => {
                let lhs = self.value(lhs)?;
                let rhs = self.value(rhs)?;
                binary(*op, lhs, rhs)?
            }
        };
        Ok(Term::Value(value))
    }

    /// Locals, then constants, then node names
    fn resolve(&mut self, name: &str) -> Result<Term, EvalError> {
        if let Some(v) = self.locals.get(name) {
            return Ok(Term::Value(v.clone()));
        }
        let constant = match name {
            "pi" => Some(Value::Float(std::f64::consts::PI)),
            "e" => Some(Value::Float(std::f64::consts::E)),
            "true" | "True" => Some(Value::Bool(true)),
            "false" | "False" => Some(Value::Bool(false)),
            _ => None,
        };
        if let Some(v) = constant {
            return Ok(Term::Value(v));
        }
        match self.graph.resolve_node(name)? {
            Some(node) => Ok(Term::Node(node, name.to_string())),
            None => Err(EvalError::UnknownName(name.to_string())),
        }
    }
}

fn unary(prefix: Prefix, v: Value) -> Result<Value, EvalError> {
    match (prefix, v) {
        (Prefix::Neg, Value::Integer(i)) => Ok(Value::Integer(i.wrapping_neg())),
        (Prefix::Neg, v) => Ok(Value::Float(-v.as_f64()?)),
        (Prefix::Pos, v @ (Value::Integer(_) | Value::Float(_))) => Ok(v),
        (Prefix::Pos, v) => Ok(Value::Float(v.as_f64()?)),
        (Prefix::Complement, Value::Expression(e)) => Ok(Value::Expression(e.complement())),
        (Prefix::Complement, v) => Err(EvalError::mismatch("Expression", v.type_name())),
    }
}

fn bool_value(b: bool) -> Value {
    Value::Integer(i64::from(b))
}

fn binary(op: Operator, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use Value::{Expression as E, Integer as I, Text as T};

    match (op, &lhs, &rhs) {
        (Operator::Or, E(a), E(b)) => return Ok(E(a.union(b))),
        (Operator::And, E(a), E(b)) => return Ok(E(a.intersection(b))),
        (Operator::Sub, E(a), E(b)) => return Ok(E(a.difference(b))),
        (Operator::Or, _, _) => return Ok(bool_value(lhs.truthy()? || rhs.truthy()?)),
        (Operator::And, _, _) => return Ok(bool_value(lhs.truthy()? && rhs.truthy()?)),
        (Operator::Add, T(a), T(b)) => return Ok(T(format!("{a}{b}"))),
        (Operator::Eq | Operator::Ne, T(_) | Value::Name(_), T(_) | Value::Name(_)) => {
            let equal = lhs.as_str()? == rhs.as_str()?;
            return Ok(bool_value(equal == (op == Operator::Eq)));
        }
        (Operator::Add, I(a), I(b)) => return Ok(I(a.wrapping_add(*b))),
        (Operator::Sub, I(a), I(b)) => return Ok(I(a.wrapping_sub(*b))),
        (Operator::Mul, I(a), I(b)) => return Ok(I(a.wrapping_mul(*b))),
        (Operator::Rem, I(a), I(b)) if *b != 0 => return Ok(I(floored_rem(*a, *b))),
        (Operator::Pow, I(a), I(b)) if *b >= 0 => {
            if let Some(v) = u32::try_from(*b).ok().and_then(|b| a.checked_pow(b)) {
                return Ok(I(v));
            }
        }
        _ => {}
    }

    let a = lhs.as_f64()?;
    let b = rhs.as_f64()?;
    let compare = a.partial_cmp(&b);
    Ok(match op {
        Operator::Add => Value::Float(a + b),
        Operator::Sub => Value::Float(a - b),
        Operator::Mul => Value::Float(a * b),
        Operator::Div => Value::Float(a / b),
        // Sign follows the divisor
        Operator::Rem => Value::Float(a - b * (a / b).floor()),
        Operator::Pow => Value::Float(a.powf(b)),
        Operator::Eq => bool_value(compare == Some(Ordering::Equal)),
        Operator::Ne => bool_value(compare != Some(Ordering::Equal)),
        Operator::Lt => bool_value(compare == Some(Ordering::Less)),
        Operator::Le => bool_value(matches!(compare, Some(Ordering::Less | Ordering::Equal))),
        Operator::Gt => bool_value(compare == Some(Ordering::Greater)),
        Operator::Ge => bool_value(matches!(compare, Some(Ordering::Greater | Ordering::Equal))),
        Operator::Or => bool_value(a != 0.0 || b != 0.0),
        Operator::And => bool_value(a != 0.0 && b != 0.0),
    })
}

/// Remainder whose sign follows the divisor
fn floored_rem(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}
