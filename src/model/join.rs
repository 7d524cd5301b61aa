//! Join specifications
//!
//! A model's joins are either raw clauses or `{table, first, second}`
//! equality joins. Dynamic shapes (JSON values, config entries) are checked
//! when converted, so a malformed join never reaches query time.

use crate::errors::ModelError;
use config::JoinSetting;
use query_executor::Join;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinSpec {
    /// Clause injected verbatim
    Raw(String),
    /// `JOIN table ON first = second`
    Equality {
        table: String,
        first: String,
        second: String,
    },
}

impl JoinSpec {
    pub fn raw(clause: impl Into<String>) -> Self {
        Self::Raw(clause.into())
    }

    pub fn equality(
        table: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::Equality {
            table: table.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Reject empty clauses and structured joins with an empty part
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            JoinSpec::Raw(clause) if clause.trim().is_empty() => {
                Err(ModelError::Format("empty join clause".to_string()))
            }
            JoinSpec::Equality {
                table,
                first,
                second,
            } if table.is_empty() || first.is_empty() || second.is_empty() => Err(
                ModelError::Format(format!(
                    "join needs table, first and second (got table={:?}, first={:?}, second={:?})",
                    table, first, second
                )),
            ),
            _ => Ok(()),
        }
    }

    pub(crate) fn to_join(&self) -> Join {
        match self {
            JoinSpec::Raw(clause) => Join::Raw(clause.clone()),
            JoinSpec::Equality {
                table,
                first,
                second,
            } => Join::on(table.as_str(), first.as_str(), second.as_str()),
        }
    }
}

impl From<&str> for JoinSpec {
    fn from(clause: &str) -> Self {
        Self::Raw(clause.to_string())
    }
}

impl From<String> for JoinSpec {
    fn from(clause: String) -> Self {
        Self::Raw(clause)
    }
}

impl TryFrom<Value> for JoinSpec {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let spec = match &value {
            Value::String(clause) => JoinSpec::raw(clause.as_str()),
            Value::Object(parts) => {
                let part = |key: &str| parts.get(key).and_then(Value::as_str);
                match (part("table"), part("first"), part("second")) {
                    (Some(table), Some(first), Some(second)) => {
                        JoinSpec::equality(table, first, second)
                    }
                    _ => return Err(ModelError::Format(value.to_string())),
                }
            }
            _ => return Err(ModelError::Format(value.to_string())),
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl TryFrom<JoinSetting> for JoinSpec {
    type Error = ModelError;

    fn try_from(setting: JoinSetting) -> Result<Self, Self::Error> {
        let spec = match setting {
            JoinSetting::Raw(clause) => JoinSpec::Raw(clause),
            JoinSetting::Structured(mut parts) => {
                match (parts.remove("table"), parts.remove("first"), parts.remove("second")) {
                    (Some(table), Some(first), Some(second)) => JoinSpec::Equality {
                        table,
                        first,
                        second,
                    },
                    (table, first, second) => {
                        return Err(ModelError::Format(format!(
                            "join needs table, first and second (got table={:?}, first={:?}, second={:?})",
                            table, first, second
                        )))
                    }
                }
            }
        };
        spec.validate()?;
        Ok(spec)
    }
}
