// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Script nodes: line-by-line assignments evaluated into structured outputs

use super::formula::{self, Locals};
use super::{Graph, Value};
use crate::error::EvalError;
use crate::name::Name;
use std::collections::BTreeMap;
use tracing::trace;

/// Text datum holding the script source
pub const SCRIPT_DATUM: &str = "script";
/// StructuredOutputs datum holding the evaluated assignments
pub const OUTPUTS_DATUM: &str = "outputs";

/// One `name = formula` line
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<'a> {
    pub line: usize,
    pub name: Name,
    pub formula: &'a str,
}

impl<'a> Assignment<'a> {
    /// Parse every non-blank, non-comment line of `source`
    pub fn parse_all(source: &'a str) -> Result<Vec<Self>, EvalError> {
        source
            .lines()
            .enumerate()
            .filter_map(|(i, raw)| {
                let text = raw.trim();
                if text.is_empty() || text.starts_with('#') {
                    None
                } else {
                    Some(Self::parse(i + 1, text))
                }
            })
            .collect()
    }

    fn parse(line: usize, text: &'a str) -> Result<Self, EvalError> {
        let split = assignment_operator(text).ok_or_else(|| {
            EvalError::Parse(format!("line {}: expected 'name = formula'", line))
        })?;
        let name = Name::new(text[..split].trim())?;
        let formula = text[split + 1..].trim();
        if formula.is_empty() {
            return Err(EvalError::Parse(format!("line {}: missing formula", line)));
        }
        Ok(Self { line, name, formula })
    }
}

/// Byte offset of the first `=` that is not part of a comparison
fn assignment_operator(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b'='
            && !matches!(i.checked_sub(1).map(|j| bytes[j]), Some(b'=' | b'<' | b'>' | b'!'))
            && bytes.get(i + 1) != Some(&b'=')
    })
}

/// Evaluate a script; each assignment sees the ones before it as locals
pub fn run_script(graph: &mut Graph, source: &str) -> Result<BTreeMap<String, Value>, EvalError> {
    let mut locals = Locals::new();
    for assignment in Assignment::parse_all(source)? {
        let value = formula::evaluate(graph, assignment.formula, &locals).map_err(|err| match err {
            EvalError::Parse(msg) => EvalError::Parse(format!("line {}: {}", assignment.line, msg)),
            other => other,
        })?;
        trace!(line = assignment.line, name = %assignment.name, "Script assignment");
        locals.insert(assignment.name.into(), value);
    }
    Ok(locals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalErrorKind;

    #[test]
    fn test_assignment_split() {
        assert_eq!(assignment_operator("a = 1"), Some(2));
        assert_eq!(assignment_operator("a == 1"), None);
        assert_eq!(assignment_operator("flag = a <= 2"), Some(5));
        assert_eq!(assignment_operator("x = y == 2"), Some(2));
    }

    #[test]
    fn test_locals_flow_forward() {
        let mut graph = Graph::new();
        let out = run_script(
            &mut graph,
            "# sizes\nr = 2\n\nd = r * 2\nbig = d >= 4\n",
        )
        .unwrap();
        assert_eq!(out["r"], Value::Integer(2));
        assert_eq!(out["d"], Value::Integer(4));
        assert_eq!(out["big"], Value::Integer(1));
    }

    #[test]
    fn test_bad_lines() {
        let mut graph = Graph::new();
        let err = run_script(&mut graph, "a = 1\nthis is not an assignment").unwrap_err();
        assert_eq!(err, EvalError::Parse("line 2: expected 'name = formula'".into()));

        let err = run_script(&mut graph, "if = 1").unwrap_err();
        assert_eq!(err.kind(), EvalErrorKind::ParseOrName);

        let err = run_script(&mut graph, "a = (1").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
