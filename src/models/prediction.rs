//! Prediction request and outcome models

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Column names the served model was trained on, in payload order
pub const COLUMNS: [&str; 8] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DiabetesPedigreeFunction",
    "Age",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
}

/// Form metadata for one feature
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub column: &'static str,
    pub label: &'static str,
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Form fields, same order as [`COLUMNS`]
pub const FIELDS: [FieldSpec; 8] = [
    FieldSpec { column: COLUMNS[0], label: "Pregnancies", name: "pregnancies", kind: FieldKind::Integer },
    FieldSpec { column: COLUMNS[1], label: "Glucose", name: "glucose", kind: FieldKind::Integer },
    FieldSpec { column: COLUMNS[2], label: "Blood Pressure", name: "blood_pressure", kind: FieldKind::Integer },
    FieldSpec { column: COLUMNS[3], label: "Skin Thickness", name: "skin_thickness", kind: FieldKind::Integer },
    FieldSpec { column: COLUMNS[4], label: "Insulin", name: "insulin", kind: FieldKind::Integer },
    FieldSpec { column: COLUMNS[5], label: "BMI", name: "bmi", kind: FieldKind::Float },
    FieldSpec { column: COLUMNS[6], label: "Diabetes Pedigree Function", name: "diabetes_pedigree_function", kind: FieldKind::Float },
    FieldSpec { column: COLUMNS[7], label: "Age", name: "age", kind: FieldKind::Integer },
];

/// One submission of the prediction form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PredictionRequest {
    #[validate(range(min = 0, message = "Pregnancies must be at least 0"))]
    pub pregnancies: i64,
    #[validate(range(min = 0, message = "Glucose must be at least 0"))]
    pub glucose: i64,
    #[validate(range(min = 0, message = "Blood Pressure must be at least 0"))]
    pub blood_pressure: i64,
    #[validate(range(min = 0, message = "Skin Thickness must be at least 0"))]
    pub skin_thickness: i64,
    #[validate(range(min = 0, message = "Insulin must be at least 0"))]
    pub insulin: i64,
    #[validate(range(min = 0.0, message = "BMI must be at least 0.0"))]
    pub bmi: f64,
    #[validate(range(min = 0.0, message = "Diabetes Pedigree Function must be at least 0.0"))]
    pub diabetes_pedigree_function: f64,
    #[validate(range(min = 0, message = "Age must be at least 0"))]
    pub age: i64,
}

impl PredictionRequest {
    /// Feature values in [`COLUMNS`] order
    pub fn features(&self) -> [FeatureValue; 8] {
        [
            FeatureValue::Int(self.pregnancies),
            FeatureValue::Int(self.glucose),
            FeatureValue::Int(self.blood_pressure),
            FeatureValue::Int(self.skin_thickness),
            FeatureValue::Int(self.insulin),
            FeatureValue::Float(self.bmi),
            FeatureValue::Float(self.diabetes_pedigree_function),
            FeatureValue::Int(self.age),
        ]
    }

    /// `(column, value)` pairs in payload order
    pub fn named_features(&self) -> impl Iterator<Item = (&'static str, FeatureValue)> {
        COLUMNS.into_iter().zip(self.features())
    }

    /// Enforce the form's minimum bounds server-side.
    ///
    /// Range checks come from the `Validate` derive; NaN slips past a
    /// `min` comparison, so continuous measures are also required to be
    /// finite.
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;

        for (spec, value) in FIELDS.iter().zip(self.features()) {
            if let FeatureValue::Float(v) = value {
                if !v.is_finite() {
                    return Err(format!("{} must be a finite number", spec.label));
                }
            }
        }
        Ok(())
    }
}

/// A single feature cell: integer counts or continuous measures
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for FeatureValue {
    /// Floats always carry a fractional part (`0.0`, `33.6`) so logged
    /// parameters read the same as the values the model received.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// Binary class returned by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiabetesLabel {
    #[serde(rename = "Diabetic")]
    Diabetic,
    #[serde(rename = "Not Diabetic")]
    NotDiabetic,
}

impl DiabetesLabel {
    /// Map a raw model output. Only exact 0 and 1 are classes.
    pub fn from_prediction(value: f64) -> Option<Self> {
        if value == 1.0 {
            Some(Self::Diabetic)
        } else if value == 0.0 {
            Some(Self::NotDiabetic)
        } else {
            None
        }
    }

    pub fn class(self) -> u8 {
        match self {
            Self::Diabetic => 1,
            Self::NotDiabetic => 0,
        }
    }

    /// Value written to the `label` run tag
    pub fn tag_value(self) -> &'static str {
        match self {
            Self::Diabetic => "Diabetic",
            Self::NotDiabetic => "Not_Diabetic",
        }
    }
}

impl fmt::Display for DiabetesLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diabetic => write!(f, "Diabetic"),
            Self::NotDiabetic => write!(f, "Not Diabetic"),
        }
    }
}

/// A completed prediction, ready to be reported
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
    pub request: PredictionRequest,
    pub label: DiabetesLabel,
    pub prediction: u8,
    pub timestamp: DateTime<Local>,
}

impl PredictionOutcome {
    pub fn new(request: PredictionRequest, label: DiabetesLabel) -> Self {
        Self {
            request,
            label,
            prediction: label.class(),
            timestamp: Local::now(),
        }
    }

    /// Local ISO-8601 timestamp with microseconds and no offset
    pub fn timestamp_tag(&self) -> String {
        self.timestamp
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string()
    }
}

#[cfg(test)]
pub(crate) fn minimum_request() -> PredictionRequest {
    PredictionRequest {
        pregnancies: 0,
        glucose: 0,
        blood_pressure: 0,
        skin_thickness: 0,
        insulin: 0,
        bmi: 0.0,
        diabetes_pedigree_function: 0.0,
        age: 0,
    }
}
