//! Feature-vector assembly, validation and prediction dispatch.
//!
//! A submission flows through [`FeaturePipeline::submit`] in a fixed order:
//! patient identity checks, assembly in canonical feature order, the zero-vector check,
//! and finally one call into the predictor with a single-row matrix.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    artifacts::Artifacts,
    error::{FlowError, IntegrationError, Result, ValidationError},
};

/// Oldest age the form accepts.
pub const MAX_PATIENT_AGE: u16 = 120;

/// One binary answer on the symptom form, carried as `0` / `1` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Answer {
    #[default]
    No,
    Yes,
}

impl Answer {
    pub const ALL: [Answer; 2] = [Answer::No, Answer::Yes];

    pub fn label(self) -> &'static str {
        match self {
            Answer::No => "Tidak",
            Answer::Yes => "Ya",
        }
    }
}

impl TryFrom<u8> for Answer {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Answer::No),
            1 => Ok(Answer::Yes),
            other => Err(format!("symptom answer must be 0 or 1, got {other}")),
        }
    }
}

impl From<Answer> for u8 {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::No => 0,
            Answer::Yes => 1,
        }
    }
}

impl From<bool> for Answer {
    fn from(value: bool) -> Self {
        if value { Answer::Yes } else { Answer::No }
    }
}

/// Answers keyed by feature name. Features that are absent count as [`Answer::No`].
pub type Selections = HashMap<String, Answer>;

/// 0/1 entries in the predictor's column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureVector(Vec<u8>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_all_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    pub fn selected_count(&self) -> usize {
        self.0.iter().filter(|&&v| v == 1).count()
    }

    /// The vector as a 1×N matrix.
    pub fn to_matrix(&self) -> Vec<Vec<f64>> {
        vec![self.0.iter().map(|&v| f64::from(v)).collect()]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentity {
    pub name: String,
    /// `None` means the age field was never filled in; `Some(0)` is a newborn.
    pub age: Option<u16>,
}

impl PatientIdentity {
    pub fn new(name: impl Into<String>, age: Option<u16>) -> Self {
        Self {
            name: name.into(),
            age,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.age.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.name.trim()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub patient: PatientIdentity,
    pub selections: Selections,
}

/// A successful prediction together with what produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub disease_name: String,
    pub vector: FeatureVector,
}

/// One form control as the presentation layer should show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub key: String,
    pub feature: String,
    pub label: String,
}

/// Feature controls split into two columns; the first column gets `len / 2` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormLayout {
    pub columns: [Vec<FormField>; 2],
}

/// Cosmetic label for a feature name: separators become spaces, then title case.
pub fn display_label(feature: &str) -> String {
    title_case(&feature.replace('_', " "))
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    artifacts: Arc<Artifacts>,
    require_patient_identity: bool,
}

impl FeaturePipeline {
    pub fn new(artifacts: Arc<Artifacts>, require_patient_identity: bool) -> Self {
        Self {
            artifacts,
            require_patient_identity,
        }
    }

    pub fn requires_patient_identity(&self) -> bool {
        self.require_patient_identity
    }

    pub fn artifacts(&self) -> &Arc<Artifacts> {
        &self.artifacts
    }

    pub fn form(&self) -> FormLayout {
        let features = self.artifacts.feature_names();
        let half = features.len() / 2;
        let mut columns: [Vec<FormField>; 2] = [Vec::with_capacity(half), Vec::new()];
        for (i, feature) in features.iter().enumerate() {
            let column = if i < half { 0 } else { 1 };
            columns[column].push(FormField {
                key: format!("feat_{i}"),
                feature: feature.to_string(),
                label: display_label(feature),
            });
        }
        FormLayout { columns }
    }

    /// Build the vector in canonical feature order. Unanswered features are 0; answers for
    /// names that are not features are rejected.
    pub fn assemble(&self, selections: &Selections) -> Result<FeatureVector> {
        let features = self.artifacts.feature_names();

        if let Some(unknown) = selections.keys().find(|name| !features.contains(name)) {
            return Err(ValidationError::UnknownSymptom(unknown.clone()).into());
        }

        let values = features
            .iter()
            .map(|name| u8::from(selections.get(name).copied().unwrap_or_default()))
            .collect();
        Ok(FeatureVector(values))
    }

    /// Dispatch a vector to the predictor and resolve the class label.
    pub fn predict(&self, vector: &FeatureVector) -> Result<String> {
        if vector.is_all_zero() {
            return Err(ValidationError::NoSymptomsSelected.into());
        }

        let predictions = self
            .artifacts
            .predictor()
            .predict(&vector.to_matrix())
            .inspect_err(|e| warn!(error = %e, "Predictor rejected the feature vector"))?;

        let [index] = predictions.as_slice() else {
            return Err(IntegrationError::UnexpectedPredictionCount(predictions.len()).into());
        };

        let disease_name = self
            .artifacts
            .class_labels()
            .resolve(*index)
            .inspect_err(|e| warn!(error = %e, "Predicted class index has no label"))?;

        debug!(index = *index, disease = %disease_name, "Resolved prediction");
        Ok(disease_name.to_string())
    }

    fn validate_patient(&self, patient: &PatientIdentity) -> Result<()> {
        if self.require_patient_identity && !patient.is_complete() {
            return Err(ValidationError::MissingPatientIdentity.into());
        }
        if let Some(age) = patient.age {
            if age > MAX_PATIENT_AGE {
                return Err(ValidationError::AgeOutOfRange(age).into());
            }
        }
        Ok(())
    }

    /// Validate, assemble and predict. Nothing reaches the predictor unless every check passes.
    pub fn submit(&self, submission: &Submission) -> Result<Diagnosis> {
        self.validate_patient(&submission.patient)?;

        let vector = self.assemble(&submission.selections)?;
        if vector.is_all_zero() {
            return Err(FlowError::Validation(ValidationError::NoSymptomsSelected));
        }

        let disease_name = self.predict(&vector)?;
        info!(
            disease = %disease_name,
            symptoms = vector.selected_count(),
            "Prediction completed"
        );

        Ok(Diagnosis {
            disease_name,
            vector,
        })
    }
}
