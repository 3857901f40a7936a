// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Formula parser using pest

use super::ast::{Ast, Operator, Prefix};
use crate::error::EvalError;
use crate::graph::Value;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "graph/formula.pest"]
struct FormulaParser;

/// Parse formula text into an AST
pub fn parse(text: &str) -> Result<Ast, EvalError> {
    let mut pairs = FormulaParser::parse(Rule::formula, text).map_err(|err| {
        let column = match err.line_col {
            LineColLocation::Pos((_, col)) | LineColLocation::Span((_, col), _) => col,
        };
        EvalError::Parse(format!("column {}: {}", column, err.variant.message()))
    })?;

    let expr = pairs
        .next()
        .and_then(|formula| formula.into_inner().next())
        .ok_or_else(|| EvalError::Parse("empty formula".to_string()))?;
    build(expr)
}

fn malformed(rule: Rule) -> EvalError {
    EvalError::Parse(format!("unexpected {:?}", rule))
}

fn build(pair: Pair<Rule>) -> Result<Ast, EvalError> {
    match pair.as_rule() {
        Rule::expr | Rule::conjunction | Rule::sum | Rule::product => build_left_assoc(pair),
        Rule::comparison => build_left_assoc(pair),
        Rule::unary => build_unary(pair),
        Rule::power => {
            let mut inner = pair.into_inner();
            let base = build(inner.next().ok_or(malformed(Rule::power))?)?;
            match inner.next() {
                Some(exponent) => Ok(Ast::Binary(Operator::Pow, Box::new(base), Box::new(build(exponent)?))),
                None => Ok(base),
            }
        }
        Rule::postfix => {
            let mut inner = pair.into_inner();
            let mut node = build(inner.next().ok_or(malformed(Rule::postfix))?)?;
            for attribute in inner {
                let name = attribute
                    .into_inner()
                    .next()
                    .ok_or(malformed(Rule::attribute))?
                    .as_str()
                    .to_string();
                node = Ast::Attribute(Box::new(node), name);
            }
            Ok(node)
        }
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().ok_or(malformed(Rule::call))?.as_str().to_string();
            let args = inner.map(build).collect::<Result<Vec<_>, _>>()?;
            Ok(Ast::Call(name, args))
        }
        Rule::number => build_number(pair.as_str()),
        Rule::string => Ok(Ast::Literal(Value::Text(unquote(pair.as_str())))),
        Rule::ident => Ok(Ast::Ident(pair.as_str().to_string())),
        rule => Err(malformed(rule)),
    }
}

/// `operand (op operand)*`, folded to the left
fn build_left_assoc(pair: Pair<Rule>) -> Result<Ast, EvalError> {
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();
    let mut lhs = build(inner.next().ok_or(malformed(rule))?)?;
    while let Some(op) = inner.next() {
        let op = operator(op.as_str()).ok_or(malformed(op.as_rule()))?;
        let rhs = build(inner.next().ok_or(malformed(rule))?)?;
        lhs = Ast::Binary(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn build_unary(pair: Pair<Rule>) -> Result<Ast, EvalError> {
    let mut prefixes = Vec::new();
    let mut operand = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::prefix_op => prefixes.push(match p.as_str() {
                "-" => Prefix::Neg,
                "+" => Prefix::Pos,
                _ => Prefix::Complement,
            }),
            _ => operand = Some(build(p)?),
        }
    }
    let mut node = operand.ok_or(malformed(Rule::unary))?;
    for prefix in prefixes.into_iter().rev() {
        node = Ast::Unary(prefix, Box::new(node));
    }
    Ok(node)
}

fn operator(token: &str) -> Option<Operator> {
    Some(match token {
        "|" => Operator::Or,
        "&" => Operator::And,
        "==" => Operator::Eq,
        "!=" => Operator::Ne,
        "<" => Operator::Lt,
        "<=" => Operator::Le,
        ">" => Operator::Gt,
        ">=" => Operator::Ge,
        "+" => Operator::Add,
        "-" => Operator::Sub,
        "*" => Operator::Mul,
        "/" => Operator::Div,
        "%" => Operator::Rem,
        _ => return None,
    })
}

/// `1` is an Integer; a decimal point or exponent makes a Float
fn build_number(text: &str) -> Result<Ast, EvalError> {
    let value = if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().map(Value::Float).ok()
    } else {
        text.parse::<i64>().map(Value::Integer).ok()
    };
    value
        .map(Ast::Literal)
        .ok_or_else(|| EvalError::Parse(format!("invalid number '{}'", text)))
}

fn unquote(text: &str) -> String {
    let body = &text[1..text.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Box<Ast> {
        Box::new(Ast::Literal(Value::Float(v)))
    }

    #[test]
    fn test_precedence() {
        let ast = parse("1.0 + 2.0 * 3.0").unwrap();
        assert_eq!(
            ast,
            Ast::Binary(
                Operator::Add,
                num(1.0),
                Box::new(Ast::Binary(Operator::Mul, num(2.0), num(3.0)))
            )
        );
    }

    #[test]
    fn test_power_is_right_associative_and_binds_tighter_than_negation() {
        let ast = parse("-2.0 ** 3.0 ** 2.0").unwrap();
        let inner = Ast::Binary(Operator::Pow, num(3.0), num(2.0));
        let pow = Ast::Binary(Operator::Pow, num(2.0), Box::new(inner));
        assert_eq!(ast, Ast::Unary(Prefix::Neg, Box::new(pow)));
    }

    #[test]
    fn test_integer_and_float_literals() {
        assert_eq!(parse("42").unwrap(), Ast::Literal(Value::Integer(42)));
        assert_eq!(parse("1e3").unwrap(), Ast::Literal(Value::Float(1000.0)));
        assert_eq!(parse(".5").unwrap(), Ast::Literal(Value::Float(0.5)));
    }

    #[test]
    fn test_calls_and_attributes() {
        let ast = parse("circle(c0.x, 0, r)").unwrap();
        let Ast::Call(name, args) = ast else {
            panic!("expected a call");
        };
        assert_eq!(name, "circle");
        assert_eq!(args.len(), 3);
        assert_eq!(
            args[0],
            Ast::Attribute(Box::new(Ast::Ident("c0".into())), "x".into())
        );
        assert_eq!(parse("empty()").unwrap(), Ast::Call("empty".into(), vec![]));
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            parse(r#""a\nb""#).unwrap(),
            Ast::Literal(Value::Text("a\nb".into()))
        );
        assert_eq!(parse("'LB'").unwrap(), Ast::Literal(Value::Text("LB".into())));
    }

    #[test]
    fn test_parse_errors() {
        for text in ["", "1 +", "(1", "1 2", "a..b"] {
            let err = parse(text).unwrap_err();
            assert!(matches!(err, EvalError::Parse(_)), "{text}: {err:?}");
        }
    }
}
