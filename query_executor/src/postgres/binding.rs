//! JSON parameter binding and row decoding for PostgreSQL
//!
//! Parameters are bound with the type of the column they are written to
//! or compared with, as reported by `information_schema.columns` (its
//! `udt_name`, e.g. `int4`, `timestamptz`, `_text`). A string is only
//! ever parsed into a timestamp, UUID or number when its column has that
//! type; parameters without a known column keep their JSON shape.

use crate::errors::ExecutorError;
use crate::record::Record;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Column, Postgres, Row, TypeInfo};
use std::str::FromStr;
use uuid::Uuid;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Bind one JSON value, using `column_type` (a `udt_name`) when known
pub fn bind_json_param<'q>(query: PgQuery<'q>, param: Value, column_type: Option<&str>) -> PgQuery<'q> {
    match column_type {
        Some(column_type) if param.is_null() => bind_null(query, column_type),
        Some(column_type) => bind_for_column(query, param, column_type),
        None => bind_untyped(query, param),
    }
}

/// Bind by JSON shape alone; strings always stay text
fn bind_untyped<'q>(query: PgQuery<'q>, param: Value) -> PgQuery<'q> {
    match param {
        Value::String(s) => query.bind(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => query.bind(small),
                    Err(_) => query.bind(i),
                }
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::Bool(b) => query.bind(b),
        Value::Null => query.bind(Option::<String>::None),
        other => query.bind(Json(other)),
    }
}

/// Bind the converted value, or the JSON shape when it does not convert
macro_rules! bind_converted {
    ($query:expr, $param:expr, $converted:expr) => {{
        let converted = $converted;
        match converted {
            Some(value) => $query.bind(value),
            None => bind_untyped($query, $param),
        }
    }};
}

fn bind_for_column<'q>(query: PgQuery<'q>, param: Value, column_type: &str) -> PgQuery<'q> {
    match column_type {
        "json" | "jsonb" => query.bind(Json(param)),
        "text" | "varchar" | "bpchar" | "name" | "citext" => match param {
            Value::String(s) => query.bind(s),
            other => query.bind(other.to_string()),
        },
        "bool" => bind_converted!(query, param, as_bool(&param)),
        "int2" => bind_converted!(query, param, as_i64(&param).and_then(|i| i16::try_from(i).ok())),
        "int4" => bind_converted!(query, param, as_i64(&param).and_then(|i| i32::try_from(i).ok())),
        "int8" => bind_converted!(query, param, as_i64(&param)),
        "float4" | "float8" => bind_converted!(query, param, as_f64(&param)),
        "numeric" => bind_converted!(query, param, as_decimal(&param)),
        "uuid" => bind_converted!(query, param, param.as_str().and_then(|s| Uuid::parse_str(s).ok())),
        "timestamptz" => bind_converted!(query, param, param.as_str().and_then(parse_timestamptz)),
        "timestamp" => bind_converted!(query, param, param.as_str().and_then(parse_timestamp)),
        "date" => bind_converted!(query, param, param.as_str().and_then(|s| NaiveDate::from_str(s).ok())),
        "time" => bind_converted!(query, param, param.as_str().and_then(|s| NaiveTime::from_str(s).ok())),
        "bytea" => bind_converted!(query, param, param.as_str().map(parse_bytea)),
        "interval" => bind_converted!(query, param, as_interval(&param)),
        "_text" | "_varchar" => bind_converted!(
            query,
            param,
            array_of(&param, |v| v.as_str().map(str::to_string))
        ),
        "_int4" => bind_converted!(
            query,
            param,
            array_of(&param, |v| v.as_i64().and_then(|i| i32::try_from(i).ok()))
        ),
        "_int8" => bind_converted!(query, param, array_of(&param, Value::as_i64)),
        "_float8" => bind_converted!(query, param, array_of(&param, Value::as_f64)),
        "_bool" => bind_converted!(query, param, array_of(&param, Value::as_bool)),
        "_uuid" => bind_converted!(
            query,
            param,
            array_of(&param, |v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()))
        ),
        _ => bind_untyped(query, param),
    }
}

/// A typed NULL, so the column does not see a text parameter
fn bind_null<'q>(query: PgQuery<'q>, column_type: &str) -> PgQuery<'q> {
    match column_type {
        "bool" => query.bind(None::<bool>),
        "int2" => query.bind(None::<i16>),
        "int4" => query.bind(None::<i32>),
        "int8" => query.bind(None::<i64>),
        "float4" | "float8" => query.bind(None::<f64>),
        "numeric" => query.bind(None::<Decimal>),
        "uuid" => query.bind(None::<Uuid>),
        "timestamptz" => query.bind(None::<DateTime<Utc>>),
        "timestamp" => query.bind(None::<NaiveDateTime>),
        "date" => query.bind(None::<NaiveDate>),
        "time" => query.bind(None::<NaiveTime>),
        "bytea" => query.bind(None::<Vec<u8>>),
        "interval" => query.bind(None::<PgInterval>),
        "json" | "jsonb" => query.bind(None::<Json<Value>>),
        "_text" | "_varchar" => query.bind(None::<Vec<String>>),
        "_int4" => query.bind(None::<Vec<i32>>),
        "_int8" => query.bind(None::<Vec<i64>>),
        "_float8" => query.bind(None::<Vec<f64>>),
        "_bool" => query.bind(None::<Vec<bool>>),
        "_uuid" => query.bind(None::<Vec<Uuid>>),
        _ => query.bind(None::<String>),
    }
}

fn as_bool(param: &Value) -> Option<bool> {
    match param {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_i64(param: &Value) -> Option<i64> {
    match param {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_f64(param: &Value) -> Option<f64> {
    match param {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_decimal(param: &Value) -> Option<Decimal> {
    let text = match param {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn parse_timestamptz(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::<FixedOffset>::from_str(s))
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::from_str(s)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// `\x`-prefixed hex as PostgreSQL prints it, otherwise the string's bytes
fn parse_bytea(s: &str) -> Vec<u8> {
    s.strip_prefix("\\x")
        .and_then(|hex| hex::decode(hex).ok())
        .unwrap_or_else(|| s.as_bytes().to_vec())
}

fn as_interval(param: &Value) -> Option<PgInterval> {
    let object = param.as_object()?;
    let part = |key: &str| object.get(key).and_then(Value::as_i64).unwrap_or(0);
    Some(PgInterval {
        months: i32::try_from(part("months")).ok()?,
        days: i32::try_from(part("days")).ok()?,
        microseconds: part("microseconds"),
    })
}

fn array_of<T>(param: &Value, item: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    param.as_array()?.iter().map(item).collect()
}

macro_rules! decode_as {
    ($row:expr, $index:expr, $column:expr, $ty:ty, $convert:expr) => {
        $row.try_get::<Option<$ty>, _>($index)
            .map(|value| value.map($convert).unwrap_or(Value::Null))
            .map_err(|e| ExecutorError::Decode {
                column: $column.to_string(),
                message: e.to_string(),
            })
    };
}

/// Decode a row into a [`Record`], keeping the column order of the result
pub fn row_to_record(row: &PgRow) -> Result<Record, ExecutorError> {
    let mut record = Record::with_capacity(row.columns().len());
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.name(), column.type_info().name())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// Decode the first column of a row, used for `RETURNING` values
pub fn first_column(row: &PgRow) -> Result<Value, ExecutorError> {
    let column = row.columns().first().ok_or_else(|| ExecutorError::Decode {
        column: "<returning>".to_string(),
        message: "row has no columns".to_string(),
    })?;
    decode_column(row, 0, column.name(), column.type_info().name())
}

fn decode_column(
    row: &PgRow,
    index: usize,
    column: &str,
    type_name: &str,
) -> Result<Value, ExecutorError> {
    match type_name {
        "BOOL" => decode_as!(row, index, column, bool, Value::Bool),
        "INT2" => decode_as!(row, index, column, i16, Value::from),
        "INT4" => decode_as!(row, index, column, i32, Value::from),
        "INT8" => decode_as!(row, index, column, i64, Value::from),
        "FLOAT4" => decode_as!(row, index, column, f32, Value::from),
        "FLOAT8" => decode_as!(row, index, column, f64, Value::from),
        // Text keeps the exact digits
        "NUMERIC" => decode_as!(row, index, column, Decimal, |d| Value::String(d.to_string())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => decode_as!(row, index, column, String, Value::String),
        "UUID" => decode_as!(row, index, column, Uuid, |u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => decode_as!(row, index, column, DateTime<Utc>, |t| {
            Value::String(t.to_rfc3339())
        }),
        "TIMESTAMP" => decode_as!(row, index, column, NaiveDateTime, |t| {
            Value::String(t.to_string())
        }),
        "DATE" => decode_as!(row, index, column, NaiveDate, |d| Value::String(d.to_string())),
        "TIME" => decode_as!(row, index, column, NaiveTime, |t| Value::String(t.to_string())),
        "BYTEA" => decode_as!(row, index, column, Vec<u8>, |bytes| {
            Value::String(format!("\\x{}", hex::encode(bytes)))
        }),
        "INTERVAL" => decode_as!(row, index, column, PgInterval, |i| {
            json!({"months": i.months, "days": i.days, "microseconds": i.microseconds})
        }),
        "JSON" | "JSONB" => decode_as!(row, index, column, Value, |v| v),
        "TEXT[]" | "VARCHAR[]" => decode_as!(row, index, column, Vec<String>, Value::from),
        "INT4[]" => decode_as!(row, index, column, Vec<i32>, Value::from),
        "INT8[]" => decode_as!(row, index, column, Vec<i64>, Value::from),
        "FLOAT8[]" => decode_as!(row, index, column, Vec<f64>, Value::from),
        "BOOL[]" => decode_as!(row, index, column, Vec<bool>, Value::from),
        "UUID[]" => decode_as!(row, index, column, Vec<Uuid>, |ids| {
            Value::from(ids.iter().map(Uuid::to_string).collect::<Vec<_>>())
        }),
        // Extension and other text-encoded types
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)
            .map(|value| value.map(Value::String).unwrap_or(Value::Null))
            .map_err(|e| ExecutorError::Decode {
                column: column.to_string(),
                message: format!("unsupported type {}: {}", type_name, e),
            }),
    }
}
