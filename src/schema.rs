//! Feature schema shared by the single-record and batch prediction paths.
//!
//! The model has no awareness of column names, so the order of [`SCHEMA`]
//! is the order of every feature row handed to a classifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Number of features consumed by the model.
pub const FEATURE_COUNT: usize = 7;

/// Column appended to batch prediction output.
pub const PREDICTION_COLUMN: &str = "Predicted_Personality";

/// Kind of value a schema field accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Floating point value with an inclusive lower bound.
    Numeric { minimum: f64 },
    /// "Yes"/"No" answer encoded as 1/0.
    Binary,
}

/// One entry of the ordered feature schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Wire name, used both as JSON key and CSV column header.
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn numeric(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Numeric { minimum: 0.0 },
        }
    }

    const fn binary(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Binary,
        }
    }
}

/// Ordered feature schema. Index `i` here is column `i` of a feature row.
pub const SCHEMA: [FieldSpec; FEATURE_COUNT] = [
    FieldSpec::numeric("Time_spent_Alone"),
    FieldSpec::binary("Stage_fear"),
    FieldSpec::numeric("Social_event_attendance"),
    FieldSpec::numeric("Going_outside"),
    FieldSpec::binary("Drained_after_socializing"),
    FieldSpec::numeric("Friends_circle_size"),
    FieldSpec::numeric("Post_frequency"),
];

/// Field names in schema order.
pub fn feature_names() -> [&'static str; FEATURE_COUNT] {
    SCHEMA.map(|spec| spec.name)
}

/// Answer to a yes/no survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    /// Parses a raw answer, ignoring surrounding whitespace and case.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("yes") {
            Some(YesNo::Yes)
        } else if trimmed.eq_ignore_ascii_case("no") {
            Some(YesNo::No)
        } else {
            None
        }
    }

    /// Model encoding: Yes → 1, No → 0.
    pub fn code(self) -> f64 {
        match self {
            YesNo::Yes => 1.0,
            YesNo::No => 0.0,
        }
    }

    /// Inverse of [`YesNo::code`].
    pub fn from_code(code: f64) -> Option<Self> {
        if code == 1.0 {
            Some(YesNo::Yes)
        } else if code == 0.0 {
            Some(YesNo::No)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        }
    }
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YesNo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        YesNo::parse(s).ok_or_else(|| format!("expected 'Yes' or 'No', got '{}'", s))
    }
}

/// Predicted personality label.
///
/// The numeric codes must match the encoding used by the training pipeline
/// that produced the model artifact: Introvert → 0, Extrovert → 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Personality {
    Introvert,
    Extrovert,
}

impl Personality {
    /// All labels, indexed by model class code.
    pub const ALL: [Personality; 2] = [Personality::Introvert, Personality::Extrovert];

    pub fn code(self) -> u8 {
        match self {
            Personality::Introvert => 0,
            Personality::Extrovert => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Personality::Introvert => "Introvert",
            Personality::Extrovert => "Extrovert",
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Personality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s.trim())
            .ok_or_else(|| format!("unknown personality label '{}'", s))
    }
}
