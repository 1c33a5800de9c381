//! Schema validation helpers.
//!
//! Validates a `serde_json::Value` configuration against a [`Schema`] before
//! any remote call is made.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_langfuse::schema::{Schema, Attribute};
//! use hemmer_provider_langfuse::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("retention_days", Attribute::optional_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "test", "retention_days": 30}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "test", "retention_days": "30"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("retention_days".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - String attributes with allowed values must hold one of them
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if diagnostics.len() == before {
                validate_allowed_values(attr, v, path, diagnostics);
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        },
    }
}

fn validate_allowed_values(
    attr: &Attribute,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.allowed_values.is_empty() {
        return;
    }
    let Some(s) = value.as_str() else {
        return;
    };
    if !attr.allowed_values.iter().any(|allowed| allowed == s) {
        diagnostics.push(
            Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                .with_detail(format!(
                    "Must be one of: {}. Got: {}",
                    attr.allowed_values.join(", "),
                    s
                ))
                .with_attribute(path),
        );
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}
