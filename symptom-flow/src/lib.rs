pub mod artifacts;
pub mod catalog;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod presenter;
pub mod runner;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use artifacts::{ArtifactLoader, ArtifactPaths, Artifacts, ClassLabelTable, FeatureNames};
pub use catalog::{DiseaseInfo, Severity};
pub use error::{ArtifactKind, FlowError, IntegrationError, Result, ValidationError};
pub use model::{DecisionTree, LinearModel, ModelDocument, Predictor};
pub use pipeline::{
    Answer, Diagnosis, FeaturePipeline, FeatureVector, FormField, FormLayout, PatientIdentity,
    Selections, Submission,
};
pub use presenter::{NoticeStyle, Presentation, ResultView, render, render_session};
pub use runner::DiagnosisRunner;
pub use session::{PredictionResult, SessionState};
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
