//! Argument validation against an [`InputSchema`].
//!
//! [`validate`] is pure: it checks the raw JSON arguments of a `tools/call`
//! and either returns the coerced [`Arguments`] or every field-level problem
//! it found, in schema order (undeclared fields last).
//!
//! Coercions applied:
//! - omitted optional arguments with a default receive the default;
//! - integral floats (`3.0`) are accepted for `integer` arguments and stored as integers;
//! - `null` for an optional argument is treated as omitted.

use crate::mcp::tools::{Arguments, InputSchema, Kind};
use serde_json::{Map, Value};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `arguments` was present but was not a JSON object.
    #[error("Invalid arguments: expected an object, got {found}")]
    NotAnObject { found: &'static str },
    /// A required argument is absent.
    #[error("Missing required argument '{field}' (expected {expected})")]
    Missing { field: String, expected: String },
    /// An argument has the wrong type or is outside its enumeration.
    #[error("Invalid argument '{field}': expected {expected}, got {found}")]
    WrongType {
        field: String,
        expected: String,
        found: String,
    },
    /// A strict schema received an argument it does not declare.
    #[error("Unknown argument '{field}'")]
    Unknown { field: String },
}

impl ValidationError {
    /// The offending field, if the error concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::NotAnObject { .. } => None,
            ValidationError::Missing { field, .. }
            | ValidationError::WrongType { field, .. }
            | ValidationError::Unknown { field } => Some(field),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Checks `value` against `kind`, returning the (possibly coerced) value.
fn check(kind: &Kind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (Kind::String, Value::String(_))
        | (Kind::Number, Value::Number(_))
        | (Kind::Boolean, Value::Bool(_))
        | (Kind::Object, Value::Object(_))
        | (Kind::Array, Value::Array(_)) => Some(value.clone()),
        (Kind::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Some(value.clone())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Value::from(f as i64))
            }
        }
        (Kind::Enum(values), Value::String(s)) if values.iter().any(|v| v == s) => {
            Some(value.clone())
        }
        _ => None,
    }
}

fn describe_found(kind: &Kind, value: &Value) -> String {
    match (kind, value) {
        (Kind::Enum(_), Value::String(s)) => format!("'{s}'"),
        _ => json_type_name(value).to_string(),
    }
}

/// Validates raw `tools/call` arguments.
///
/// `None` (no `arguments` key at all) is treated as an empty object.
///
/// ```
/// use toolgate::mcp::tools::{Argument, InputSchema, Kind};
/// use toolgate::mcp::validation::{validate, ValidationError};
/// use serde_json::json;
///
/// let schema = InputSchema::new(vec![
///     Argument::new("path", Kind::String, "File path", true),
///     Argument::new("confirm", Kind::Boolean, "Apply", false).with_default(false),
/// ]);
///
/// let args = validate(&schema, Some(&json!({"path": "a.txt"}))).unwrap();
/// assert_eq!(args.flag("confirm"), false);
///
/// let errors = validate(&schema, Some(&json!({"path": 3}))).unwrap_err();
/// assert_eq!(errors[0].field(), Some("path"));
/// ```
pub fn validate(
    schema: &InputSchema,
    raw: Option<&Value>,
) -> Result<Arguments, Vec<ValidationError>> {
    let empty = Map::new();
    let provided = match raw {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(vec![ValidationError::NotAnObject {
                found: json_type_name(other),
            }]);
        }
    };

    let mut errors = Vec::new();
    let mut coerced = Map::new();

    for argument in schema.arguments() {
        let name = argument.name();
        match provided.get(name).filter(|v| !v.is_null()) {
            Some(value) => match check(argument.kind(), value) {
                Some(ok) => {
                    coerced.insert(name.to_string(), ok);
                }
                None => errors.push(ValidationError::WrongType {
                    field: name.to_string(),
                    expected: argument.kind().to_string(),
                    found: describe_found(argument.kind(), value),
                }),
            },
            None if argument.is_required() => errors.push(ValidationError::Missing {
                field: name.to_string(),
                expected: argument.kind().to_string(),
            }),
            None => {
                if let Some(default) = argument.default() {
                    coerced.insert(name.to_string(), default.clone());
                }
            }
        }
    }

    for (name, value) in provided {
        if schema.argument(name).is_some() {
            continue;
        }
        if schema.is_strict() {
            errors.push(ValidationError::Unknown {
                field: name.clone(),
            });
        } else {
            // lenient schemas pass undeclared arguments through untouched
            coerced.insert(name.clone(), value.clone());
        }
    }

    if errors.is_empty() {
        Ok(Arguments::new(coerced))
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tools::Argument;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> InputSchema {
        InputSchema::new(vec![
            Argument::new("path", Kind::String, "File path", true),
            Argument::new("limit", Kind::Integer, "Max entries", false),
            Argument::new("ratio", Kind::Number, "Ratio", false),
            Argument::new("mode", Kind::one_of(["fast", "slow"]), "Mode", false).with_default("fast"),
        ])
    }

    #[test]
    fn missing_required_field_is_named() {
        let errors = validate(&schema(), Some(&json!({}))).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Missing {
                field: "path".to_string(),
                expected: "string".to_string()
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "Missing required argument 'path' (expected string)"
        );
    }

    #[test]
    fn absent_arguments_behave_like_empty_object() {
        let errors = validate(&schema(), None).unwrap_err();
        assert_eq!(errors[0].field(), Some("path"));
    }

    #[test]
    fn wrong_type_reports_expected_and_found() {
        let errors = validate(&schema(), Some(&json!({"path": true}))).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "Invalid argument 'path': expected string, got boolean"
        );
    }

    #[test]
    fn enum_rejects_values_outside_the_set() {
        let errors = validate(&schema(), Some(&json!({"path": "a", "mode": "warp"}))).unwrap_err();
        assert_eq!(
            errors[0].to_string(),
            "Invalid argument 'mode': expected one of [fast, slow], got 'warp'"
        );
    }

    #[test]
    fn defaults_and_integer_coercion() {
        let args = validate(&schema(), Some(&json!({"path": "a", "limit": 3.0}))).unwrap();
        assert_eq!(args.i64("limit").unwrap(), 3);
        assert_eq!(args.str("mode").unwrap(), "fast");
    }

    #[test]
    fn fractional_integer_rejected() {
        let errors = validate(&schema(), Some(&json!({"path": "a", "limit": 2.5}))).unwrap_err();
        assert_eq!(errors[0].field(), Some("limit"));
    }

    #[test]
    fn integers_satisfy_number() {
        let args = validate(&schema(), Some(&json!({"path": "a", "ratio": 2}))).unwrap();
        assert_eq!(args.f64("ratio").unwrap(), 2.0);
    }

    #[test]
    fn null_optional_is_omitted() {
        let args = validate(&schema(), Some(&json!({"path": "a", "limit": null}))).unwrap();
        assert!(args.get("limit").is_none());
    }

    #[test]
    fn lenient_schema_passes_unknown_fields_through() {
        let args = validate(&schema(), Some(&json!({"path": "a", "extra": 1}))).unwrap();
        assert_eq!(args.get("extra"), Some(&json!(1)));
    }

    #[test]
    fn strict_schema_rejects_unknown_fields() {
        let errors = validate(&schema().strict(), Some(&json!({"path": "a", "extra": 1}))).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Unknown {
                field: "extra".to_string()
            }]
        );
    }

    #[test]
    fn non_object_arguments() {
        let errors = validate(&schema(), Some(&json!(["a"]))).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NotAnObject { found: "array" }]);
    }
}
