use serde::Serialize;

use crate::{
    catalog::{self, Severity},
    session::{PredictionResult, SessionState},
};

pub const RESULT_SECTION_TITLE: &str = "Hasil Diagnosa";
pub const DESCRIPTION_SUBHEADING: &str = "Deskripsi Singkat";
pub const DISCLAIMER: &str = "**Peringatan:** Ini adalah prediksi berdasarkan model AI dan **bukan** diagnosis medis profesional. Silakan berkonsultasi dengan dokter.";
pub const PLACEHOLDER: &str = "Hasil prediksi akan muncul di sini setelah Anda mengisi form dan menekan 'Prediksi'.";
pub const RESET_NOTICE: &str = "Formulir telah di-reset.";

/// Visual treatment of the headline notice, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeStyle {
    Error,
    Warning,
    Info,
    Success,
}

impl From<Severity> for NoticeStyle {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Danger => NoticeStyle::Error,
            Severity::Warning => NoticeStyle::Warning,
            Severity::Info => NoticeStyle::Info,
            Severity::Neutral => NoticeStyle::Success,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub disease_name: String,
    pub style: NoticeStyle,
    pub icon: String,
    pub headline: String,
    pub subheading: String,
    pub description: String,
    pub disclaimer: String,
}

/// What the result area shows for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResultView {
    Empty {
        title: String,
        message: String,
    },
    Ready {
        title: String,
        patient_header: String,
        presentation: Presentation,
    },
}

impl ResultView {
    pub fn presentation(&self) -> Option<&Presentation> {
        match self {
            ResultView::Empty { .. } => None,
            ResultView::Ready { presentation, .. } => Some(presentation),
        }
    }
}

pub fn render(disease_name: &str) -> Presentation {
    let info = catalog::lookup(disease_name);
    Presentation {
        disease_name: disease_name.to_string(),
        style: info.severity.into(),
        icon: info.icon.to_string(),
        headline: format!("**{} Hasil Prediksi: {}**", info.icon, disease_name),
        subheading: DESCRIPTION_SUBHEADING.to_string(),
        description: info.description.to_string(),
        disclaimer: DISCLAIMER.to_string(),
    }
}

pub fn patient_header(result: &PredictionResult) -> String {
    let age = result
        .patient_age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("Pasien: {} ({} tahun)", result.patient_name, age)
}

/// "Harap isi gejala untuk pasien: ..." line shown above the form.
pub fn form_prompt(patient_name: &str) -> String {
    let name = patient_name.trim();
    let name = if name.is_empty() { "..." } else { name };
    format!("Harap isi gejala untuk pasien: **{name}**")
}

pub fn render_session(state: &SessionState) -> ResultView {
    match state.get() {
        Some(result) => ResultView::Ready {
            title: RESULT_SECTION_TITLE.to_string(),
            patient_header: patient_header(result),
            presentation: render(&result.disease_name),
        },
        None => ResultView::Empty {
            title: RESULT_SECTION_TITLE.to_string(),
            message: PLACEHOLDER.to_string(),
        },
    }
}
