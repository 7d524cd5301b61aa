//! Validation module
//!
//! Identifiers that end up spliced into SQL text (table names and filter
//! columns) are validated here before a backend renders them.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is too long (PostgreSQL limit is 63 characters)
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    /// Name is empty
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
    /// More than one `table.column` qualifier
    TooManyQualifiers(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::Empty => {
                write!(f, "Name cannot be empty")
            }
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            ValidationError::TooManyQualifiers(name) => {
                write!(f, "Name '{}' may have at most one 'table.' qualifier", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validated, possibly table-qualified identifier (`users` or `users.name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedIdentifier {
    qualifier: Option<String>,
    name: String,
}

impl ValidatedIdentifier {
    /// PostgreSQL identifier length limit
    pub const MAX_LENGTH: usize = 63;

    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let mut parts = raw.split('.');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(ValidationError::TooManyQualifiers(raw.to_string()));
        }

        match second {
            Some(name) => {
                validate_part(first)?;
                validate_part(name)?;
                Ok(Self {
                    qualifier: Some(first.to_string()),
                    name: name.to_string(),
                })
            }
            None => {
                validate_part(first)?;
                Ok(Self {
                    qualifier: None,
                    name: first.to_string(),
                })
            }
        }
    }

    /// Validate a bare (unqualified) identifier such as a table name
    pub fn bare(raw: &str) -> Result<Self, ValidationError> {
        validate_part(raw)?;
        Ok(Self {
            qualifier: None,
            name: raw.to_string(),
        })
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render with double quotes around every part
    pub fn quoted(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("\"{}\".\"{}\"", qualifier, self.name),
            None => format!("\"{}\"", self.name),
        }
    }
}

impl fmt::Display for ValidatedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}.{}", qualifier, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn validate_part(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Empty);
    }

    if name.len() > ValidatedIdentifier::MAX_LENGTH {
        return Err(ValidationError::TooLong {
            name: name.to_string(),
            length: name.len(),
            max_length: ValidatedIdentifier::MAX_LENGTH,
        });
    }

    let first_char = name.chars().next().ok_or(ValidationError::Empty)?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidStartCharacter(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidCharacters(name.to_string()));
    }

    Ok(())
}
