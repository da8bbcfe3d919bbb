//! Conversion of JSON record values to typed statement parameters.

use crate::error::RecordError;
use serde_json::Value;
use tokio_postgres::types::{ToSql, Type};

/// A statement parameter converted to the type Postgres asked for.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PgParam {
    Bool(Option<bool>),
    Int2(Option<i16>),
    Int4(Option<i32>),
    Int8(Option<i64>),
    Float4(Option<f32>),
    Float8(Option<f64>),
    Text(Option<String>),
    Json(Option<Value>),
    BoolArray(Option<Vec<bool>>),
    Int4Array(Option<Vec<i32>>),
    Int8Array(Option<Vec<i64>>),
    Float8Array(Option<Vec<f64>>),
    TextArray(Option<Vec<String>>),
}

impl PgParam {
    pub(crate) fn as_tosql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Bool(v) => v,
            Self::Int2(v) => v,
            Self::Int4(v) => v,
            Self::Int8(v) => v,
            Self::Float4(v) => v,
            Self::Float8(v) => v,
            Self::Text(v) => v,
            Self::Json(v) => v,
            Self::BoolArray(v) => v,
            Self::Int4Array(v) => v,
            Self::Int8Array(v) => v,
            Self::Float8Array(v) => v,
            Self::TextArray(v) => v,
        }
    }

    /// Converts `value` for a parameter of type `ty`; a missing value is null.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn convert(column: &str, value: Option<&Value>, ty: &Type) -> Result<Self, RecordError> {
        let value = value.filter(|v| !v.is_null());
        let param = match *ty {
            Type::BOOL => Self::Bool(value.map(|v| to_bool(column, v)).transpose()?),
            Type::INT2 => Self::Int2(
                value
                    .map(|v| to_i64(column, v).and_then(|n| narrow(column, n)))
                    .transpose()?,
            ),
            Type::INT4 => Self::Int4(
                value
                    .map(|v| to_i64(column, v).and_then(|n| narrow(column, n)))
                    .transpose()?,
            ),
            Type::INT8 => Self::Int8(value.map(|v| to_i64(column, v)).transpose()?),
            Type::FLOAT4 => Self::Float4(value.map(|v| to_f64(column, v).map(|f| f as f32)).transpose()?),
            Type::FLOAT8 => Self::Float8(value.map(|v| to_f64(column, v)).transpose()?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                Self::Text(value.map(|v| to_text(column, v)).transpose()?)
            }
            Type::JSON | Type::JSONB => Self::Json(value.cloned()),
            Type::BOOL_ARRAY => Self::BoolArray(array_of(column, value, to_bool)?),
            Type::INT4_ARRAY => Self::Int4Array(array_of(column, value, |c, v| {
                to_i64(c, v).and_then(|n| narrow(c, n))
            })?),
            Type::INT8_ARRAY => Self::Int8Array(array_of(column, value, to_i64)?),
            Type::FLOAT8_ARRAY => Self::Float8Array(array_of(column, value, to_f64)?),
            Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => {
                Self::TextArray(array_of(column, value, to_text)?)
            }
            _ => {
                return Err(RecordError::invalid(
                    column,
                    format!("unsupported column type {ty}"),
                ))
            }
        };
        Ok(param)
    }
}

fn to_bool(column: &str, value: &Value) -> Result<bool, RecordError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => s
            .parse()
            .map_err(|_| RecordError::invalid(column, format!("expected boolean, got {s:?}"))),
        other => Err(RecordError::invalid(column, format!("expected boolean, got {other}"))),
    }
}

fn to_i64(column: &str, value: &Value) -> Result<i64, RecordError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| RecordError::invalid(column, format!("expected integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| RecordError::invalid(column, format!("expected integer, got {s:?}"))),
        other => Err(RecordError::invalid(column, format!("expected integer, got {other}"))),
    }
}

fn narrow<T: TryFrom<i64>>(column: &str, n: i64) -> Result<T, RecordError> {
    T::try_from(n).map_err(|_| RecordError::invalid(column, format!("{n} is out of range")))
}

fn to_f64(column: &str, value: &Value) -> Result<f64, RecordError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| RecordError::invalid(column, format!("expected number, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| RecordError::invalid(column, format!("expected number, got {s:?}"))),
        other => Err(RecordError::invalid(column, format!("expected number, got {other}"))),
    }
}

fn to_text(column: &str, value: &Value) -> Result<String, RecordError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(RecordError::invalid(column, format!("expected scalar, got {other}"))),
    }
}

fn array_of<T>(
    column: &str,
    value: Option<&Value>,
    item: impl Fn(&str, &Value) -> Result<T, RecordError>,
) -> Result<Option<Vec<T>>, RecordError> {
    match value {
        None => Ok(None),
        Some(Value::Array(items)) => items.iter().map(|v| item(column, v)).collect::<Result<Vec<_>, _>>().map(Some),
        Some(other) => Err(RecordError::invalid(column, format!("expected array, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_and_null_values_bind_null() {
        assert_eq!(PgParam::convert("a", None, &Type::INT4).unwrap(), PgParam::Int4(None));
        assert_eq!(
            PgParam::convert("a", Some(&Value::Null), &Type::TEXT).unwrap(),
            PgParam::Text(None)
        );
    }

    #[test]
    fn numbers_follow_parameter_type() {
        assert_eq!(
            PgParam::convert("n", Some(&json!(7)), &Type::INT2).unwrap(),
            PgParam::Int2(Some(7))
        );
        assert_eq!(
            PgParam::convert("n", Some(&json!("42")), &Type::INT8).unwrap(),
            PgParam::Int8(Some(42))
        );
        assert_eq!(
            PgParam::convert("n", Some(&json!(1.5)), &Type::FLOAT8).unwrap(),
            PgParam::Float8(Some(1.5))
        );
    }

    #[test]
    fn out_of_range_fails_the_value() {
        let err = PgParam::convert("n", Some(&json!(70_000)), &Type::INT2).unwrap_err();
        assert!(matches!(err, RecordError::InvalidValue { ref column, .. } if column == "n"));

        let err = PgParam::convert("n", Some(&json!("abc")), &Type::INT4).unwrap_err();
        assert!(err.to_string().contains("expected integer"));
    }

    #[test]
    fn decimals_bind_as_text() {
        assert_eq!(
            PgParam::convert("balance", Some(&json!(12.25)), &Type::TEXT).unwrap(),
            PgParam::Text(Some("12.25".into()))
        );
    }

    #[test]
    fn arrays() {
        assert_eq!(
            PgParam::convert("tags", Some(&json!(["a", "b"])), &Type::TEXT_ARRAY).unwrap(),
            PgParam::TextArray(Some(vec!["a".into(), "b".into()]))
        );
        assert!(PgParam::convert("tags", Some(&json!("a")), &Type::TEXT_ARRAY).is_err());
    }

    #[test]
    fn unsupported_type() {
        let err = PgParam::convert("id", Some(&json!("x")), &Type::UUID).unwrap_err();
        assert!(err.to_string().contains("unsupported column type"));
    }
}
