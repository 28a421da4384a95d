use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::{
    error::{ArtifactKind, FlowError, IntegrationError, Result},
    model::{ModelDocument, Predictor},
};

pub const MODEL_FILE: &str = "model.json";
pub const CLASS_NAMES_FILE: &str = "class_names.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";

/// Where the three training artifacts live on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub class_names: PathBuf,
    pub feature_names: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside a single directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            class_names: dir.join(CLASS_NAMES_FILE),
            feature_names: dir.join(FEATURE_NAMES_FILE),
        }
    }
}

/// Ordered disease names; the predictor's output indexes into this table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabelTable(Vec<String>);

impl ClassLabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn resolve(&self, index: usize) -> std::result::Result<&str, IntegrationError> {
        self.0
            .get(index)
            .map(String::as_str)
            .ok_or(IntegrationError::LabelIndexOutOfRange {
                index,
                labels: self.0.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Feature names in the column order the predictor was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureNames(Vec<String>);

impl FeatureNames {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// The immutable result of a successful load, shared read-only by every interaction.
#[derive(Debug)]
pub struct Artifacts {
    predictor: Arc<dyn Predictor>,
    class_labels: ClassLabelTable,
    feature_names: FeatureNames,
}

impl Artifacts {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        class_labels: ClassLabelTable,
        feature_names: FeatureNames,
    ) -> Self {
        Self {
            predictor,
            class_labels,
            feature_names,
        }
    }

    /// Read all three artifacts. Any missing file is `ArtifactNotFound`; anything else that
    /// goes wrong is `ArtifactLoad`.
    pub fn read(paths: &ArtifactPaths) -> Result<Self> {
        let model: ModelDocument = read_json(ArtifactKind::Model, &paths.model)?;
        let class_names: Vec<String> = read_json(ArtifactKind::ClassNames, &paths.class_names)?;
        let feature_names: Vec<String> =
            read_json(ArtifactKind::FeatureNames, &paths.feature_names)?;

        if class_names.is_empty() {
            return Err(FlowError::ArtifactLoad {
                kind: ArtifactKind::ClassNames,
                path: paths.class_names.clone(),
                reason: "class label list is empty".to_string(),
            });
        }
        if feature_names.is_empty() {
            return Err(FlowError::ArtifactLoad {
                kind: ArtifactKind::FeatureNames,
                path: paths.feature_names.clone(),
                reason: "feature name list is empty".to_string(),
            });
        }

        // Inconsistencies are reported per prediction; here we only flag them early.
        if model.n_features() != feature_names.len() {
            warn!(
                model_features = model.n_features(),
                feature_names = feature_names.len(),
                "Predictor input width does not match the feature name list"
            );
        }
        if let Some(n_classes) = model.n_classes() {
            if n_classes > class_names.len() {
                warn!(
                    model_classes = n_classes,
                    class_names = class_names.len(),
                    "Predictor can return class indices beyond the label table"
                );
            }
        }

        info!(
            model_kind = model.kind(),
            features = feature_names.len(),
            classes = class_names.len(),
            "Artifacts loaded"
        );

        Ok(Self::new(
            Arc::new(model),
            ClassLabelTable::new(class_names),
            FeatureNames::new(feature_names),
        ))
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    pub fn class_labels(&self) -> &ClassLabelTable {
        &self.class_labels
    }

    pub fn feature_names(&self) -> &FeatureNames {
        &self.feature_names
    }
}

fn read_json<T: DeserializeOwned>(kind: ArtifactKind, path: &Path) -> Result<T> {
    debug!(artifact = %kind, path = %path.display(), "Reading artifact");

    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FlowError::ArtifactNotFound {
            kind,
            path: path.to_path_buf(),
        },
        _ => FlowError::ArtifactLoad {
            kind,
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    serde_json::from_slice(&bytes).map_err(|e| FlowError::ArtifactLoad {
        kind,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Loads the artifacts on first use and hands out the same `Arc` afterwards.
///
/// Two racing first loads may both read from disk; whichever result lands in the cache
/// first is kept and both callers receive it.
#[derive(Debug)]
pub struct ArtifactLoader {
    paths: ArtifactPaths,
    cache: OnceLock<Arc<Artifacts>>,
}

impl ArtifactLoader {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            cache: OnceLock::new(),
        }
    }

    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(ArtifactPaths::in_dir(dir))
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn load(&self) -> Result<Arc<Artifacts>> {
        if let Some(artifacts) = self.cache.get() {
            return Ok(artifacts.clone());
        }

        let loaded = Arc::new(Artifacts::read(&self.paths)?);
        Ok(self.cache.get_or_init(|| loaded).clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }
}
