//! Validation of a fetched resource's declared shape against a
//! caller-supplied schema.

use serde_json::Value;
use thiserror::Error;

/// One expected field: its name and the type string the remote API declares
/// for it (e.g. a database column declared as `"title"` or `"number"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedField {
    pub name: String,
    pub field_type: String,
}

impl ExpectedField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// A fetched resource does not match the shape the caller depends on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("field '{field}' should be of type '{expected}' but was '{actual}'")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },
    #[error("field '{field}' does not exist in the fetched resource")]
    MissingField { field: String },
}

/// Check each expected field against the `"type"` its entry in `fields`
/// declares. `fields` is the resource's field map as returned by the remote
/// API, e.g. a database's `properties` object.
pub fn validate_declared_types(
    fields: &Value,
    expected: &[ExpectedField],
) -> Result<(), StructureError> {
    for rule in expected {
        let declared = fields
            .get(&rule.name)
            .and_then(|field| field.get("type"))
            .and_then(Value::as_str);

        match declared {
            None => {
                return Err(StructureError::MissingField {
                    field: rule.name.clone(),
                })
            }
            Some(actual) if actual != rule.field_type => {
                return Err(StructureError::TypeMismatch {
                    field: rule.name.clone(),
                    expected: rule.field_type.clone(),
                    actual: actual.to_owned(),
                })
            }
            Some(_) => {}
        }
    }

    Ok(())
}
