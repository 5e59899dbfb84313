//! Preprocessing from raw field values to model-ready feature rows.
//!
//! Both prediction paths go through [`preprocess`]:
//! 1. Look up every schema field by name from a [`FieldSource`]
//! 2. Validate it against the field's kind and domain
//! 3. Encode it as `f64` in schema order
//!
//! Nothing is coerced to a default; the first invalid field aborts with a
//! [`ValidationError`] naming it.
use crate::schema::{FieldKind, FieldSpec, YesNo, FEATURE_COUNT, SCHEMA};
use std::fmt;

/// One model input row, columns in [`SCHEMA`] order.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// A raw, not yet validated field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    /// Field absent, null, or an empty cell.
    Missing,
    Number(f64),
    Text(&'a str),
    /// Any other JSON value; carries the type name for error messages.
    Unsupported(&'static str),
}

/// Anything that can hand out raw values by field name.
pub trait FieldSource {
    fn raw(&self, field: &str) -> RawValue<'_>;
}

/// Rejected input, reported to the caller as a client error.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingField {
        field: String,
    },
    InvalidNumber {
        field: String,
        value: String,
    },
    OutOfRange {
        field: String,
        value: f64,
        minimum: f64,
    },
    InvalidCategory {
        field: String,
        value: String,
    },
    MissingColumns(Vec<String>),
    Malformed(String),
    /// A field error located in a batch file (1-based data row).
    InRow {
        row: usize,
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Attaches a batch row number to a field error.
    pub fn in_row(self, row: usize) -> Self {
        ValidationError::InRow {
            row,
            source: Box::new(self),
        }
    }

    /// Name of the offending field, if the error concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::InvalidNumber { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidCategory { field, .. } => Some(field),
            ValidationError::InRow { source, .. } => source.field(),
            ValidationError::MissingColumns(_) | ValidationError::Malformed(_) => None,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField { field } => {
                write!(f, "missing value for required field '{}'", field)
            }
            ValidationError::InvalidNumber { field, value } => {
                write!(f, "field '{}' must be a finite number, got {}", field, value)
            }
            ValidationError::OutOfRange {
                field,
                value,
                minimum,
            } => write!(f, "field '{}' must be >= {}, got {}", field, minimum, value),
            ValidationError::InvalidCategory { field, value } => {
                write!(f, "field '{}' must be 'Yes' or 'No', got {}", field, value)
            }
            ValidationError::MissingColumns(columns) => {
                write!(f, "missing required column(s): {}", columns.join(", "))
            }
            ValidationError::Malformed(msg) => write!(f, "malformed input: {}", msg),
            ValidationError::InRow { row, source } => write!(f, "row {}: {}", row, source),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates and encodes one field.
pub fn encode_field(spec: &FieldSpec, raw: RawValue<'_>) -> Result<f64, ValidationError> {
    let field = || spec.name.to_string();

    match spec.kind {
        FieldKind::Numeric { minimum } => {
            let value = match raw {
                RawValue::Missing => return Err(ValidationError::MissingField { field: field() }),
                RawValue::Number(n) => n,
                RawValue::Text(text) if text.trim().is_empty() => {
                    return Err(ValidationError::MissingField { field: field() })
                }
                RawValue::Text(text) => {
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| ValidationError::InvalidNumber {
                            field: field(),
                            value: format!("'{}'", text),
                        })?
                }
                RawValue::Unsupported(kind) => {
                    return Err(ValidationError::InvalidNumber {
                        field: field(),
                        value: kind.to_string(),
                    })
                }
            };

            if !value.is_finite() {
                return Err(ValidationError::InvalidNumber {
                    field: field(),
                    value: value.to_string(),
                });
            }
            if value < minimum {
                return Err(ValidationError::OutOfRange {
                    field: field(),
                    value,
                    minimum,
                });
            }
            Ok(value)
        }
        FieldKind::Binary => match raw {
            RawValue::Missing => Err(ValidationError::MissingField { field: field() }),
            RawValue::Text(text) if text.trim().is_empty() => {
                Err(ValidationError::MissingField { field: field() })
            }
            RawValue::Text(text) => YesNo::parse(text)
                .map(YesNo::code)
                .ok_or_else(|| ValidationError::InvalidCategory {
                    field: field(),
                    value: format!("'{}'", text),
                }),
            RawValue::Number(n) => Err(ValidationError::InvalidCategory {
                field: field(),
                value: n.to_string(),
            }),
            RawValue::Unsupported(kind) => Err(ValidationError::InvalidCategory {
                field: field(),
                value: kind.to_string(),
            }),
        },
    }
}

/// Builds the feature row for one record, in schema order.
pub fn preprocess<S: FieldSource + ?Sized>(source: &S) -> Result<FeatureRow, ValidationError> {
    let mut row = [0.0; FEATURE_COUNT];
    for (slot, spec) in row.iter_mut().zip(SCHEMA.iter()) {
        *slot = encode_field(spec, source.raw(spec.name))?;
    }
    Ok(row)
}

/// Converts a JSON value into a [`RawValue`].
pub fn raw_from_json(value: Option<&serde_json::Value>) -> RawValue<'_> {
    use serde_json::Value;

    match value {
        None | Some(Value::Null) => RawValue::Missing,
        Some(Value::Number(n)) => n
            .as_f64()
            .map(RawValue::Number)
            .unwrap_or(RawValue::Unsupported("number")),
        Some(Value::String(s)) => RawValue::Text(s),
        Some(Value::Bool(_)) => RawValue::Unsupported("boolean"),
        Some(Value::Array(_)) => RawValue::Unsupported("array"),
        Some(Value::Object(_)) => RawValue::Unsupported("object"),
    }
}

impl FieldSource for serde_json::Map<String, serde_json::Value> {
    fn raw(&self, field: &str) -> RawValue<'_> {
        raw_from_json(self.get(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Map<String, serde_json::Value> {
        json!({
            "Time_spent_Alone": 5,
            "Stage_fear": "No",
            "Social_event_attendance": 8,
            "Going_outside": 7,
            "Drained_after_socializing": "Yes",
            "Friends_circle_size": 3,
            "Post_frequency": 2
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_preprocess_encodes_in_schema_order() {
        let row = preprocess(&sample()).unwrap();
        assert_eq!(row, [5.0, 0.0, 8.0, 7.0, 1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_preprocess_ignores_key_order_and_extra_keys() {
        let mut record = serde_json::Map::new();
        record.insert("Post_frequency".into(), json!(2));
        record.insert("Notes".into(), json!("ignored"));
        for (key, value) in sample() {
            record.entry(key).or_insert(value);
        }
        assert_eq!(preprocess(&record).unwrap(), preprocess(&sample()).unwrap());
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut record = sample();
        record.insert("Time_spent_Alone".into(), json!(" 4.5 "));
        assert_eq!(preprocess(&record).unwrap()[0], 4.5);
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut record = sample();
        record.remove("Post_frequency");
        let err = preprocess(&record).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "Post_frequency".into()
            }
        );
        assert_eq!(err.field(), Some("Post_frequency"));
    }

    #[test]
    fn test_null_is_missing() {
        let mut record = sample();
        record.insert("Going_outside".into(), serde_json::Value::Null);
        assert!(matches!(
            preprocess(&record),
            Err(ValidationError::MissingField { .. })
        ));
    }

    #[test]
    fn test_invalid_category_rejected() {
        let mut record = sample();
        record.insert("Stage_fear".into(), json!("Maybe"));
        let err = preprocess(&record).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidCategory { .. }));
        assert!(err.to_string().contains("Stage_fear"));
        assert!(err.to_string().contains("Maybe"));
    }

    #[test]
    fn test_category_given_as_number_rejected() {
        let mut record = sample();
        record.insert("Drained_after_socializing".into(), json!(1));
        assert!(matches!(
            preprocess(&record),
            Err(ValidationError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn test_unparseable_number_rejected() {
        let mut record = sample();
        record.insert("Friends_circle_size".into(), json!("lots"));
        assert!(matches!(
            preprocess(&record),
            Err(ValidationError::InvalidNumber { .. })
        ));

        record.insert("Friends_circle_size".into(), json!(true));
        assert!(matches!(
            preprocess(&record),
            Err(ValidationError::InvalidNumber { .. })
        ));

        record.insert("Friends_circle_size".into(), json!("NaN"));
        assert!(matches!(
            preprocess(&record),
            Err(ValidationError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_negative_number_rejected() {
        let mut record = sample();
        record.insert("Social_event_attendance".into(), json!(-1));
        assert_eq!(
            preprocess(&record).unwrap_err(),
            ValidationError::OutOfRange {
                field: "Social_event_attendance".into(),
                value: -1.0,
                minimum: 0.0
            }
        );
    }

    #[test]
    fn test_going_outside_upper_bound_not_enforced() {
        let mut record = sample();
        record.insert("Going_outside".into(), json!(12));
        assert_eq!(preprocess(&record).unwrap()[3], 12.0);
    }

    #[test]
    fn test_row_context_in_message() {
        let err = ValidationError::MissingField {
            field: "Stage_fear".into(),
        }
        .in_row(3);
        assert_eq!(
            err.to_string(),
            "row 3: missing value for required field 'Stage_fear'"
        );
        assert_eq!(err.field(), Some("Stage_fear"));
    }
}
