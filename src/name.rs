// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Validated identifiers for node names and symbol-table keys

use crate::error::NameError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Words that can never be used as a name.
///
/// Covers the formula language's constants as well as keywords that a script
/// front end is likely to claim.
pub const RESERVED_WORDS: &[&str] = &[
    "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else", "except",
    "false", "False", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "None", "nonlocal", "not", "or", "pass", "pi", "raise", "return", "true", "True", "try",
    "while", "with", "yield", "e",
];

/// An identifier: ASCII letter or underscore followed by letters, digits or underscores
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub fn new(text: impl Into<String>) -> Result<Self, NameError> {
        let text = text.into();
        validate(&text)?;
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a candidate without allocating a `Name`
    pub fn is_valid(text: &str) -> bool {
        validate(text).is_ok()
    }
}

fn validate(text: &str) -> Result<(), NameError> {
    let mut chars = text.chars();
    let first = chars.next().ok_or(NameError::Empty)?;

    if !(first.is_ascii_alphabetic() || first == '_')
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(NameError::InvalidSyntax(text.to_string()));
    }

    if RESERVED_WORDS.contains(&text) {
        return Err(NameError::Reserved(text.to_string()));
    }

    Ok(())
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Name {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Name::new(value)
    }
}

impl TryFrom<&str> for Name {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Name::new(value)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for text in ["a", "_", "c0", "my_node", "Circle2", "_private"] {
            assert!(Name::new(text).is_ok(), "{} should be valid", text);
        }
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(Name::new(""), Err(NameError::Empty));
        assert!(matches!(Name::new("0abc"), Err(NameError::InvalidSyntax(_))));
        assert!(matches!(Name::new("a-b"), Err(NameError::InvalidSyntax(_))));
        assert!(matches!(Name::new("a b"), Err(NameError::InvalidSyntax(_))));
        assert!(matches!(Name::new("héllo"), Err(NameError::InvalidSyntax(_))));
        assert!(matches!(Name::new("lambda"), Err(NameError::Reserved(_))));
        assert!(matches!(Name::new("pi"), Err(NameError::Reserved(_))));
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Name::new("x0").unwrap(), Name::try_from("x0").unwrap());
        assert_ne!(Name::new("x0").unwrap(), Name::new("x1").unwrap());
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let name: Name = serde_json::from_str("\"node\"").unwrap();
        assert_eq!(name.as_str(), "node");
        assert!(serde_json::from_str::<Name>("\"9lives\"").is_err());
    }
}
