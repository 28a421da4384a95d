use serde::{Deserialize, Serialize};

/// How alarming a diagnosis should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Danger,
    Warning,
    Info,
    Neutral,
}

/// Presentation metadata for one disease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiseaseInfo {
    pub severity: Severity,
    pub icon: &'static str,
    pub description: &'static str,
}

/// Used for any disease name the catalog does not know about.
pub const DEFAULT_DISEASE_INFO: DiseaseInfo = DiseaseInfo {
    severity: Severity::Neutral,
    icon: "❓",
    description: "Tidak ada deskripsi untuk penyakit ini.",
};

const CATALOG: &[(&str, DiseaseInfo)] = &[
    (
        "ALLERGY",
        DiseaseInfo {
            severity: Severity::Info,
            icon: "🤧",
            description: "Alergi terjadi ketika sistem kekebalan tubuh Anda bereaksi \
                terhadap zat asing (seperti serbuk sari, bulu, atau tungau) \
                yang biasanya tidak berbahaya. Gejala utamanya seringkali gatal.",
        },
    ),
    (
        "FLU",
        DiseaseInfo {
            severity: Severity::Warning,
            icon: "🤒",
            description: "Flu (Influenza) adalah penyakit pernapasan menular yang disebabkan \
                oleh virus influenza. Gejalanya cenderung muncul tiba-tiba dan \
                melibatkan demam tinggi, nyeri otot, dan kelelahan ekstrem.",
        },
    ),
    (
        "COVID",
        DiseaseInfo {
            severity: Severity::Danger,
            icon: "🦠",
            description: "COVID-19 adalah penyakit menular yang disebabkan oleh virus SARS-CoV-2. \
                Gejalanya sangat bervariasi, tetapi seringkali mencakup demam, \
                batuk kering, dan kehilangan indra penciuman atau perasa.",
        },
    ),
    (
        "COLD",
        DiseaseInfo {
            severity: Severity::Neutral,
            icon: "🥶",
            description: "Pilek biasa (Common Cold) adalah infeksi virus ringan pada hidung \
                dan tenggorokan. Gejalanya biasanya berkembang perlahan dan \
                lebih ringan daripada flu, seperti hidung meler dan bersin.",
        },
    ),
];

/// Exact-match lookup; unknown names get [`DEFAULT_DISEASE_INFO`].
pub fn lookup(disease_name: &str) -> &'static DiseaseInfo {
    CATALOG
        .iter()
        .find(|(name, _)| *name == disease_name)
        .map(|(_, info)| info)
        .unwrap_or(&DEFAULT_DISEASE_INFO)
}

pub fn is_known(disease_name: &str) -> bool {
    CATALOG.iter().any(|(name, _)| *name == disease_name)
}

pub fn entries() -> impl Iterator<Item = (&'static str, &'static DiseaseInfo)> {
    CATALOG.iter().map(|(name, info)| (*name, info))
}
