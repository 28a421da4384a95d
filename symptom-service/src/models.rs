use serde::{Deserialize, Serialize};
use symptom_flow::{Answer, FormLayout, PatientIdentity, ResultView, Selections, Submission};

/// Body of `POST /sessions/{id}/predict`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub patient_age: Option<u16>,
    #[serde(default)]
    pub selections: Selections,
}

impl From<PredictRequest> for Submission {
    fn from(request: PredictRequest) -> Self {
        Submission {
            patient: PatientIdentity::new(request.patient_name.unwrap_or_default(), request.patient_age),
            selections: request.selections,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: u8,
    pub label: String,
}

impl From<Answer> for AnswerOption {
    fn from(answer: Answer) -> Self {
        Self {
            value: answer.into(),
            label: answer.label().to_string(),
        }
    }
}

/// Everything the presentation layer needs to draw the symptom form
#[derive(Debug, Serialize)]
pub struct FormResponse {
    pub page_title: String,
    pub heading: String,
    pub prompt: String,
    pub require_patient_identity: bool,
    pub options: Vec<AnswerOption>,
    pub layout: FormLayout,
    pub submit_label: String,
    pub reset_label: String,
}

/// Warning or error shown instead of a result
#[derive(Debug, Serialize, Deserialize)]
pub struct NoticeResponse {
    pub level: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionViewResponse {
    pub session_id: String,
    pub result: ResultView,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub notice: String,
    pub result: ResultView,
}
