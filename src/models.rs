use crate::preprocessing::{raw_from_json, FeatureRow, FieldSource, RawValue};
use crate::schema::{Personality, YesNo};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============ Request Models ============

/// Raw `/predict` request body.
///
/// Every field is optional at the JSON level so that a missing or mistyped
/// field is reported by preprocessing with its name, instead of by the
/// JSON extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PersonalityInput {
    /// Hours per day spent alone.
    #[serde(rename = "Time_spent_Alone", default)]
    #[schema(value_type = f64, example = 5)]
    pub time_spent_alone: Option<serde_json::Value>,
    /// "Yes" or "No".
    #[serde(rename = "Stage_fear", default)]
    #[schema(value_type = String, example = "No")]
    pub stage_fear: Option<serde_json::Value>,
    #[serde(rename = "Social_event_attendance", default)]
    #[schema(value_type = f64, example = 8)]
    pub social_event_attendance: Option<serde_json::Value>,
    /// Enjoyment of going outside, 0-10.
    #[serde(rename = "Going_outside", default)]
    #[schema(value_type = f64, example = 7)]
    pub going_outside: Option<serde_json::Value>,
    /// "Yes" or "No".
    #[serde(rename = "Drained_after_socializing", default)]
    #[schema(value_type = String, example = "Yes")]
    pub drained_after_socializing: Option<serde_json::Value>,
    #[serde(rename = "Friends_circle_size", default)]
    #[schema(value_type = f64, example = 3)]
    pub friends_circle_size: Option<serde_json::Value>,
    #[serde(rename = "Post_frequency", default)]
    #[schema(value_type = f64, example = 2)]
    pub post_frequency: Option<serde_json::Value>,
}

impl FieldSource for PersonalityInput {
    fn raw(&self, field: &str) -> RawValue<'_> {
        let value = match field {
            "Time_spent_Alone" => &self.time_spent_alone,
            "Stage_fear" => &self.stage_fear,
            "Social_event_attendance" => &self.social_event_attendance,
            "Going_outside" => &self.going_outside,
            "Drained_after_socializing" => &self.drained_after_socializing,
            "Friends_circle_size" => &self.friends_circle_size,
            "Post_frequency" => &self.post_frequency,
            _ => return RawValue::Missing,
        };
        raw_from_json(value.as_ref())
    }
}

/// A validated personality record, as sent by clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PersonalityRecord {
    #[serde(rename = "Time_spent_Alone")]
    pub time_spent_alone: f64,
    #[serde(rename = "Stage_fear")]
    pub stage_fear: YesNo,
    #[serde(rename = "Social_event_attendance")]
    pub social_event_attendance: f64,
    #[serde(rename = "Going_outside")]
    pub going_outside: f64,
    #[serde(rename = "Drained_after_socializing")]
    pub drained_after_socializing: YesNo,
    #[serde(rename = "Friends_circle_size")]
    pub friends_circle_size: f64,
    #[serde(rename = "Post_frequency")]
    pub post_frequency: f64,
}

impl PersonalityRecord {
    /// Rebuilds a record from a preprocessed row.
    ///
    /// Returns `None` if a binary column holds something other than 0 or 1.
    pub fn from_features(row: &FeatureRow) -> Option<Self> {
        Some(Self {
            time_spent_alone: row[0],
            stage_fear: YesNo::from_code(row[1])?,
            social_event_attendance: row[2],
            going_outside: row[3],
            drained_after_socializing: YesNo::from_code(row[4])?,
            friends_circle_size: row[5],
            post_frequency: row[6],
        })
    }
}

impl FieldSource for PersonalityRecord {
    fn raw(&self, field: &str) -> RawValue<'_> {
        match field {
            "Time_spent_Alone" => RawValue::Number(self.time_spent_alone),
            "Stage_fear" => RawValue::Text(self.stage_fear.as_str()),
            "Social_event_attendance" => RawValue::Number(self.social_event_attendance),
            "Going_outside" => RawValue::Number(self.going_outside),
            "Drained_after_socializing" => RawValue::Text(self.drained_after_socializing.as_str()),
            "Friends_circle_size" => RawValue::Number(self.friends_circle_size),
            "Post_frequency" => RawValue::Number(self.post_frequency),
            _ => RawValue::Missing,
        }
    }
}

/// Multipart form accepted by `/predict-csv`.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CsvUpload {
    /// CSV file whose header contains every feature column.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

// ============ Response Models ============

/// Successful `/predict` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PredictionResponse {
    pub code: u16,
    pub message: String,
    #[serde(rename = "Personality")]
    pub personality: Personality,
}

impl PredictionResponse {
    pub fn success(personality: Personality) -> Self {
        Self {
            code: 200,
            message: "Prediction successful".to_string(),
            personality,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status code.
    pub code: u16,
    /// Error category, e.g. "validation_error".
    pub error: String,
    /// Human-readable description of what went wrong.
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{preprocess, ValidationError};
    use serde_json::json;

    #[test]
    fn test_input_preprocesses_like_record() {
        let input: PersonalityInput = serde_json::from_value(json!({
            "Time_spent_Alone": 5,
            "Stage_fear": " no ",
            "Social_event_attendance": "8",
            "Going_outside": 7.0,
            "Drained_after_socializing": "YES",
            "Friends_circle_size": 3,
            "Post_frequency": 2
        }))
        .unwrap();

        let record = PersonalityRecord {
            time_spent_alone: 5.0,
            stage_fear: YesNo::No,
            social_event_attendance: 8.0,
            going_outside: 7.0,
            drained_after_socializing: YesNo::Yes,
            friends_circle_size: 3.0,
            post_frequency: 2.0,
        };

        assert_eq!(preprocess(&input).unwrap(), preprocess(&record).unwrap());
    }

    #[test]
    fn test_input_missing_field() {
        let input: PersonalityInput = serde_json::from_value(json!({
            "Time_spent_Alone": 5,
            "Stage_fear": "No",
            "Social_event_attendance": 8,
            "Going_outside": 7,
            "Drained_after_socializing": "Yes",
            "Friends_circle_size": 3
        }))
        .unwrap();

        assert_eq!(
            preprocess(&input).unwrap_err(),
            ValidationError::MissingField {
                field: "Post_frequency".into()
            }
        );
    }

    #[test]
    fn test_record_round_trips_through_features() {
        let record = PersonalityRecord {
            time_spent_alone: 9.0,
            stage_fear: YesNo::Yes,
            social_event_attendance: 1.0,
            going_outside: 0.5,
            drained_after_socializing: YesNo::No,
            friends_circle_size: 2.0,
            post_frequency: 0.0,
        };
        let row = preprocess(&record).unwrap();
        assert_eq!(PersonalityRecord::from_features(&row), Some(record));
    }

    #[test]
    fn test_record_wire_names() {
        let record = PersonalityRecord {
            time_spent_alone: 1.0,
            stage_fear: YesNo::No,
            social_event_attendance: 2.0,
            going_outside: 3.0,
            drained_after_socializing: YesNo::Yes,
            friends_circle_size: 4.0,
            post_frequency: 5.0,
        };
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["Stage_fear"], "No");
        assert_eq!(value["Drained_after_socializing"], "Yes");
        assert_eq!(value["Post_frequency"], 5.0);
    }

    #[test]
    fn test_prediction_response_shape() {
        let body = serde_json::to_value(PredictionResponse::success(Personality::Introvert)).unwrap();
        assert_eq!(
            body,
            json!({"code": 200, "message": "Prediction successful", "Personality": "Introvert"})
        );
    }
}
