use serde::{Deserialize, Serialize};

use crate::pipeline::PatientIdentity;

/// The last successful prediction of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub disease_name: String,
    pub patient_name: String,
    pub patient_age: Option<u16>,
}

/// Single-slot result holder for one interactive session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    prediction: Option<PredictionResult>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was stored before.
    pub fn set(&mut self, disease_name: impl Into<String>, patient_name: impl Into<String>) {
        self.prediction = Some(PredictionResult {
            disease_name: disease_name.into(),
            patient_name: patient_name.into(),
            patient_age: None,
        });
    }

    pub fn set_for_patient(&mut self, disease_name: impl Into<String>, patient: &PatientIdentity) {
        self.prediction = Some(PredictionResult {
            disease_name: disease_name.into(),
            patient_name: patient.display_name().to_string(),
            patient_age: patient.age,
        });
    }

    pub fn clear(&mut self) {
        self.prediction = None;
    }

    pub fn get(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.prediction.is_none()
    }
}
