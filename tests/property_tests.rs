/// Property-based tests using proptest
/// Tests invariants of preprocessing and batch prediction that should hold for all inputs
use personality_api::batch::{predict_csv, CsvTable};
use personality_api::classifier::{predict_labels, Classifier, LoadedModel};
use personality_api::core::preprocessing::{preprocess, ValidationError};
use personality_api::core::schema::{Personality, YesNo, PREDICTION_COLUMN};
use personality_api::models::PersonalityRecord;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::OnceLock;

fn model() -> &'static LoadedModel {
    static MODEL: OnceLock<LoadedModel> = OnceLock::new();
    MODEL.get_or_init(|| {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/personality_model.json");
        LoadedModel::load(&path, None).expect("bundled model loads")
    })
}

fn yes_no() -> impl Strategy<Value = YesNo> {
    prop_oneof![Just(YesNo::Yes), Just(YesNo::No)]
}

fn record() -> impl Strategy<Value = PersonalityRecord> {
    (
        0.0..24.0f64,
        yes_no(),
        0.0..10.0f64,
        0.0..10.0f64,
        yes_no(),
        0.0..30.0f64,
        0.0..10.0f64,
    )
        .prop_map(
            |(alone, fear, events, outside, drained, friends, posts)| PersonalityRecord {
                time_spent_alone: alone,
                stage_fear: fear,
                social_event_attendance: events,
                going_outside: outside,
                drained_after_socializing: drained,
                friends_circle_size: friends,
                post_frequency: posts,
            },
        )
}

/// Random casing plus surrounding whitespace, e.g. " yEs\t".
fn spelled(word: &'static str) -> impl Strategy<Value = String> {
    (
        prop::collection::vec(any::<bool>(), word.len()),
        "[ \t]{0,3}",
        "[ \t]{0,3}",
    )
        .prop_map(move |(upper, left, right)| {
            let body: String = word
                .chars()
                .zip(upper)
                .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
                .collect();
            format!("{}{}{}", left, body, right)
        })
}

fn record_json(record: &PersonalityRecord) -> Map<String, Value> {
    serde_json::to_value(record)
        .unwrap()
        .as_object()
        .cloned()
        .unwrap()
}

fn to_csv(records: &[PersonalityRecord]) -> String {
    let mut out = String::from("row_id,Time_spent_Alone,Stage_fear,Social_event_attendance,Going_outside,Drained_after_socializing,Friends_circle_size,Post_frequency\n");
    for (i, r) in records.iter().enumerate() {
        out.push_str(&format!(
            "r{},{},{},{},{},{},{},{}\n",
            i,
            r.time_spent_alone,
            r.stage_fear,
            r.social_event_attendance,
            r.going_outside,
            r.drained_after_socializing,
            r.friends_circle_size,
            r.post_frequency
        ));
    }
    out
}

fn single_label(record: &PersonalityRecord) -> Personality {
    let row = preprocess(record).unwrap();
    predict_labels(model(), &[row]).unwrap()[0]
}

// Property: categorical normalization
proptest! {
    #[test]
    fn yes_variants_encode_to_one(raw in spelled("yes")) {
        let mut record = json!({
            "Time_spent_Alone": 1, "Social_event_attendance": 1, "Going_outside": 1,
            "Drained_after_socializing": "No", "Friends_circle_size": 1, "Post_frequency": 1
        }).as_object().cloned().unwrap();
        record.insert("Stage_fear".into(), json!(raw));
        prop_assert_eq!(preprocess(&record).unwrap()[1], 1.0);
    }

    #[test]
    fn no_variants_encode_to_zero(raw in spelled("no")) {
        prop_assert_eq!(YesNo::parse(&raw), Some(YesNo::No));
        prop_assert_eq!(YesNo::parse(&raw).map(YesNo::code), Some(0.0));
    }

    #[test]
    fn other_strings_never_accepted(raw in "\\PC*") {
        let normalized = raw.trim().to_ascii_lowercase();
        prop_assume!(normalized != "yes" && normalized != "no");

        let mut record = record_json(&PersonalityRecord {
            time_spent_alone: 1.0,
            stage_fear: YesNo::No,
            social_event_attendance: 1.0,
            going_outside: 1.0,
            drained_after_socializing: YesNo::No,
            friends_circle_size: 1.0,
            post_frequency: 1.0,
        });
        record.insert("Drained_after_socializing".into(), json!(raw));

        let err = preprocess(&record).unwrap_err();
        let is_rejection = matches!(
            err,
            ValidationError::InvalidCategory { .. } | ValidationError::MissingField { .. }
        );
        prop_assert!(is_rejection);
        prop_assert_eq!(err.field(), Some("Drained_after_socializing"));
    }

    #[test]
    fn preprocessing_never_panics(value in "\\PC*", field in 0usize..7) {
        let names = personality_api::schema::feature_names();
        let mut record = Map::new();
        record.insert(names[field].to_string(), json!(value));
        let _ = preprocess(&record);
    }
}

// Property: predictions are total and deterministic
proptest! {
    #[test]
    fn valid_records_get_exactly_one_label(record in record()) {
        let label = single_label(&record);
        prop_assert!(Personality::ALL.contains(&label));
        prop_assert_eq!(single_label(&record), label);
    }

    #[test]
    fn preprocessing_round_trips_records(record in record()) {
        let row = preprocess(&record).unwrap();
        prop_assert_eq!(PersonalityRecord::from_features(&row), Some(record));
    }
}

// Property: batch output is aligned with input and agrees with single prediction
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn batch_preserves_rows_and_matches_single(records in prop::collection::vec(record(), 0..20)) {
        let input = to_csv(&records);
        let output = predict_csv(model() as &dyn Classifier, input.as_bytes()).unwrap();

        let original = CsvTable::parse(input.as_bytes()).unwrap();
        let annotated = CsvTable::parse(&output).unwrap();
        prop_assert_eq!(annotated.len(), records.len());
        prop_assert_eq!(annotated.headers().len(), original.headers().len() + 1);
        prop_assert_eq!(annotated.headers().get(8), Some(PREDICTION_COLUMN));

        let mut reader = csv::Reader::from_reader(output.as_slice());
        let mut input_reader = csv::Reader::from_reader(input.as_bytes());
        for ((out_row, in_row), record) in reader
            .records()
            .zip(input_reader.records())
            .zip(records.iter())
        {
            let out_row = out_row.unwrap();
            let in_row = in_row.unwrap();
            // Original cells unchanged, prediction appended
            prop_assert_eq!(&out_row.iter().take(8).collect::<Vec<_>>(), &in_row.iter().collect::<Vec<_>>());
            let label: Personality = out_row.get(8).unwrap().parse().unwrap();
            prop_assert_eq!(label, single_label(record));
        }
    }
}
