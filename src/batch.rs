//! Batch prediction over an uploaded CSV file.
//!
//! The original cells are kept verbatim for the output; only the feature
//! columns are preprocessed, into a separate working copy. The whole batch
//! fails on the first invalid row.

use crate::classifier::{predict_labels, Classifier};
use crate::errors::AppError;
use crate::preprocessing::{preprocess, FeatureRow, FieldSource, RawValue, ValidationError};
use crate::schema::{Personality, FEATURE_COUNT, PREDICTION_COLUMN, SCHEMA};
use csv::StringRecord;

/// A parsed CSV upload: header plus data rows, all cells as text.
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl CsvTable {
    /// Parses UTF-8 CSV bytes. Every row must have as many cells as the header.
    pub fn parse(bytes: &[u8]) -> Result<Self, ValidationError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ValidationError::Malformed(format!("file is not valid UTF-8: {}", e)))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        if text.trim().is_empty() {
            return Err(ValidationError::Malformed("CSV file is empty".to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let headers = reader.headers().map_err(csv_error)?.clone();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_error)?;

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column whose trimmed header equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header.trim() == name)
    }

    /// Positions of the feature columns in schema order.
    ///
    /// Reports every missing column at once.
    fn feature_columns(&self) -> Result<[usize; FEATURE_COUNT], ValidationError> {
        let mut columns = [0; FEATURE_COUNT];
        let mut missing = Vec::new();

        for (slot, spec) in columns.iter_mut().zip(SCHEMA.iter()) {
            match self.column_index(spec.name) {
                Some(index) => *slot = index,
                None => missing.push(spec.name.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(columns)
        } else {
            Err(ValidationError::MissingColumns(missing))
        }
    }

    /// Preprocessed working copy of the feature columns, one row per data row.
    pub fn features(&self) -> Result<Vec<FeatureRow>, ValidationError> {
        let columns = self.feature_columns()?;

        self.rows
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let row = CsvRow {
                    record,
                    columns: &columns,
                };
                preprocess(&row).map_err(|e| e.in_row(index + 1))
            })
            .collect()
    }

    /// Serializes the original table with the prediction column attached.
    ///
    /// An existing `Predicted_Personality` column is overwritten in place.
    pub fn write_with_predictions(&self, labels: &[Personality]) -> Result<Vec<u8>, AppError> {
        if labels.len() != self.rows.len() {
            return Err(AppError::InternalError(format!(
                "{} labels for {} rows",
                labels.len(),
                self.rows.len()
            )));
        }

        let existing = self.column_index(PREDICTION_COLUMN);
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut headers = self.headers.clone();
        if existing.is_none() {
            headers.push_field(PREDICTION_COLUMN);
        }
        writer.write_record(&headers).map_err(write_error)?;

        for (record, label) in self.rows.iter().zip(labels) {
            let out: StringRecord = match existing {
                Some(column) => record
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| if i == column { label.as_str() } else { cell })
                    .collect(),
                None => {
                    let mut out = record.clone();
                    out.push_field(label.as_str());
                    out
                }
            };
            writer.write_record(&out).map_err(write_error)?;
        }

        writer
            .into_inner()
            .map_err(|e| AppError::InternalError(format!("failed to flush CSV output: {}", e)))
    }
}

/// One data row viewed through the schema's column positions.
struct CsvRow<'a> {
    record: &'a StringRecord,
    columns: &'a [usize; FEATURE_COUNT],
}

impl FieldSource for CsvRow<'_> {
    fn raw(&self, field: &str) -> RawValue<'_> {
        SCHEMA
            .iter()
            .position(|spec| spec.name == field)
            .and_then(|i| self.record.get(self.columns[i]))
            .map(RawValue::Text)
            .unwrap_or(RawValue::Missing)
    }
}

fn csv_error(err: csv::Error) -> ValidationError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => {
            let line = pos.as_ref().map(|p| p.line()).unwrap_or_default();
            ValidationError::Malformed(format!(
                "line {} has {} fields, header has {}",
                line, len, expected_len
            ))
        }
        _ => ValidationError::Malformed(err.to_string()),
    }
}

fn write_error(err: csv::Error) -> AppError {
    AppError::InternalError(format!("failed to write CSV output: {}", err))
}

/// Runs batch prediction over CSV bytes and returns the annotated CSV.
///
/// CPU-bound; callers on the async runtime should run it via `spawn_blocking`.
pub fn predict_csv(classifier: &dyn Classifier, bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let table = CsvTable::parse(bytes)?;
    let features = table.features()?;
    tracing::debug!(
        "Parsed CSV upload: {} rows, {} columns",
        table.len(),
        table.headers().len()
    );

    let labels = predict_labels(classifier, &features)?;
    table.write_with_predictions(&labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ModelError;

    const HEADER: &str = "Time_spent_Alone,Stage_fear,Social_event_attendance,Going_outside,Drained_after_socializing,Friends_circle_size,Post_frequency";

    /// Predicts Extrovert whenever the person is not drained after socializing.
    struct NotDrained;

    impl Classifier for NotDrained {
        fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u8>, ModelError> {
            Ok(rows.iter().map(|row| u8::from(row[4] == 0.0)).collect())
        }
    }

    fn read(bytes: &[u8]) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_appends_prediction_column() {
        let input = format!("{}\n4,No,4,6,No,13,5\n9,Yes,0,0,Yes,0,3\n", HEADER);
        let output = predict_csv(&NotDrained, input.as_bytes()).unwrap();
        let rows = read(&output);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].last().unwrap(), PREDICTION_COLUMN);
        assert_eq!(rows[1][..7], ["4", "No", "4", "6", "No", "13", "5"]);
        assert_eq!(rows[1][7], "Extrovert");
        assert_eq!(rows[2][7], "Introvert");
    }

    #[test]
    fn test_extra_columns_and_raw_cells_pass_through() {
        let input = "id,Post_frequency,Friends_circle_size,Drained_after_socializing,Going_outside,Social_event_attendance,Stage_fear,Time_spent_Alone,note\n\
                     a-1,5.0, 13 ,no,6,4, NO ,4,\"hello, world\"\n";
        let output = predict_csv(&NotDrained, input.as_bytes()).unwrap();
        let rows = read(&output);

        assert_eq!(
            rows[1],
            vec!["a-1", "5.0", " 13 ", "no", "6", "4", " NO ", "4", "hello, world", "Extrovert"]
        );
    }

    #[test]
    fn test_header_only_file_yields_header_only_output() {
        let output = predict_csv(&NotDrained, format!("{}\n", HEADER).as_bytes()).unwrap();
        let rows = read(&output);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 8);
    }

    #[test]
    fn test_existing_prediction_column_overwritten() {
        let input = format!("{},Predicted_Personality\n4,No,4,6,No,13,5,Introvert\n", HEADER);
        let output = predict_csv(&NotDrained, input.as_bytes()).unwrap();
        let rows = read(&output);
        assert_eq!(rows[0].len(), 8);
        assert_eq!(rows[1][7], "Extrovert");
    }

    #[test]
    fn test_missing_columns_all_reported() {
        let input = "Time_spent_Alone,Stage_fear,Going_outside\n1,No,2\n";
        let err = CsvTable::parse(input.as_bytes()).unwrap().features().unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumns(vec![
                "Social_event_attendance".into(),
                "Drained_after_socializing".into(),
                "Friends_circle_size".into(),
                "Post_frequency".into(),
            ])
        );
    }

    #[test]
    fn test_bad_row_fails_whole_batch() {
        let input = format!("{}\n4,No,4,6,No,13,5\n9,Maybe,0,0,Yes,0,3\n", HEADER);
        let err = predict_csv(&NotDrained, input.as_bytes()).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(
            err.public_detail(),
            "row 2: field 'Stage_fear' must be 'Yes' or 'No', got 'Maybe'"
        );
    }

    #[test]
    fn test_empty_cell_reported_as_missing() {
        let input = format!("{}\n4,No,,6,No,13,5\n", HEADER);
        let err = CsvTable::parse(input.as_bytes()).unwrap().features().unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "Social_event_attendance".into()
            }
            .in_row(1)
        );
    }

    #[test]
    fn test_malformed_files_rejected() {
        assert!(matches!(
            CsvTable::parse(b""),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            CsvTable::parse(&[0xff, 0xfe, 0x00]),
            Err(ValidationError::Malformed(_))
        ));

        let ragged = format!("{}\n4,No,4\n", HEADER);
        let err = CsvTable::parse(ragged.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("fields"), "{}", err);
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        let input = format!("\u{feff}{}\n4,No,4,6,No,13,5\n", HEADER);
        let table = CsvTable::parse(input.as_bytes()).unwrap();
        assert_eq!(table.column_index("Time_spent_Alone"), Some(0));
        assert_eq!(table.features().unwrap().len(), 1);
    }
}
