use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Message shown to the user whenever the loaded artifacts disagree with each other.
pub const GENERIC_FAILURE_MESSAGE: &str = "Terjadi kesalahan saat memproses prediksi.";

/// The three persisted resources produced by the training pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Model,
    ClassNames,
    FeatureNames,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Model => "model",
            ArtifactKind::ClassNames => "class names",
            ArtifactKind::FeatureNames => "feature names",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("{kind} artifact not found at {}", path.display())]
    ArtifactNotFound { kind: ArtifactKind, path: PathBuf },

    #[error("failed to load {kind} artifact from {}: {reason}", path.display())]
    ArtifactLoad {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl FlowError {
    /// Artifact failures leave nothing to interact with; everything else is local to one request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FlowError::ArtifactNotFound { .. } | FlowError::ArtifactLoad { .. }
        )
    }

    /// Text suitable for the person filling in the form.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::ArtifactNotFound { .. } => {
                "Error: File model tidak ditemukan.".to_string()
            }
            FlowError::ArtifactLoad { reason, .. } => {
                format!("Terjadi kesalahan saat memuat model: {reason}")
            }
            FlowError::Validation(err) => err.to_string(),
            FlowError::Integration(_) | FlowError::StorageError(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            FlowError::SessionNotFound(_) => "Sesi tidak ditemukan.".to_string(),
        }
    }
}

/// User-correctable problems with a submission. The form stays usable and no prediction is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Mohon isi Nama dan Usia Pasien di sidebar terlebih dahulu.")]
    MissingPatientIdentity,

    #[error("Anda tidak memilih gejala apapun. Silakan pilih minimal satu gejala.")]
    NoSymptomsSelected,

    #[error("Gejala tidak dikenal: {0}")]
    UnknownSymptom(String),

    #[error("Usia pasien harus di antara 0 dan {max} tahun (diterima: {0}).", max = crate::pipeline::MAX_PATIENT_AGE)]
    AgeOutOfRange(u16),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingPatientIdentity => "missing_patient_identity",
            ValidationError::NoSymptomsSelected => "no_symptoms_selected",
            ValidationError::UnknownSymptom(_) => "unknown_symptom",
            ValidationError::AgeOutOfRange(_) => "age_out_of_range",
        }
    }
}

/// The predictor, label table and feature list were not produced from the same training run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("feature vector has {actual} entries but the predictor expects {expected}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("predictor returned class index {index} but only {labels} class labels are loaded")]
    LabelIndexOutOfRange { index: usize, labels: usize },

    #[error("predictor returned {0} predictions for a single-row input")]
    UnexpectedPredictionCount(usize),
}

pub type Result<T> = std::result::Result<T, FlowError>;
