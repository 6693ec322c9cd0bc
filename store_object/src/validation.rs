//! Identifier validation
//!
//! Table names handed to `change_table` end up in statement text, so they are
//! checked against MySQL's unquoted identifier rules first.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Only ASCII alphanumerics and underscores are allowed
    InvalidCharacters(String),
    /// MySQL identifiers are at most 64 characters
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    Empty,
    /// Must start with a letter or underscore
    InvalidStartCharacter(String),
    ReservedKeyword(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => write!(
                f,
                "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed",
                name
            ),
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => write!(
                f,
                "Name '{}' is too long: {} characters (max {})",
                name, length, max_length
            ),
            ValidationError::Empty => write!(f, "Name cannot be empty"),
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            ValidationError::ReservedKeyword(name) => {
                write!(f, "Name '{}' is a reserved MySQL keyword", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Words MySQL rejects as unquoted table names
const RESERVED_KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "DATABASE", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
    "ELSE", "EXISTS", "FALSE", "FOREIGN", "FROM", "GROUP", "HAVING", "IF", "IN", "INDEX", "INNER",
    "INSERT", "INTERVAL", "INTO", "IS", "JOIN", "KEY", "KEYS", "LEFT", "LIKE", "LIMIT", "LOCK",
    "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RENAME", "REPLACE",
    "RIGHT", "SCHEMA", "SELECT", "SET", "SHOW", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE",
    "UPDATE", "USE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

/// A table name safe to splice into statement text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedTableName(String);

impl ValidatedTableName {
    pub const MAX_LENGTH: usize = 64;

    pub fn new(name: &str) -> Result<Self, ValidationError> {
        validate_identifier(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ValidatedTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ValidatedTableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let Some(first) = name.chars().next() else {
        return Err(ValidationError::Empty);
    };

    if name.len() > ValidatedTableName::MAX_LENGTH {
        return Err(ValidationError::TooLong {
            name: name.to_string(),
            length: name.len(),
            max_length: ValidatedTableName::MAX_LENGTH,
        });
    }

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(ValidationError::InvalidStartCharacter(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidCharacters(name.to_string()));
    }

    if RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str()) {
        return Err(ValidationError::ReservedKeyword(name.to_string()));
    }

    Ok(())
}
