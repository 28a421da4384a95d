//! Predictors consumed by the pipeline.
//!
//! The training pipeline is external; what arrives here is a serialized model document
//! (`model.json`) tagged by `kind`. Only inference lives in this crate.

use std::fmt;

use serde::Deserialize;

use crate::error::IntegrationError;

/// Leaf marker used in the `children_left` / `children_right` arrays.
pub const TREE_LEAF: i64 = -1;

/// An opaque trained classifier mapping feature rows to class indices.
pub trait Predictor: Send + Sync + fmt::Debug {
    /// Number of columns every input row must have.
    fn n_features(&self) -> usize;

    /// Upper bound on the class indices this predictor can return, when known.
    fn n_classes(&self) -> Option<usize> {
        None
    }

    /// Predict one class index per row.
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, IntegrationError>;
}

fn check_width(expected: usize, row: &[f64]) -> Result<(), IntegrationError> {
    if row.len() != expected {
        return Err(IntegrationError::FeatureCountMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// Serialized form of any supported model.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelDocument {
    DecisionTree(DecisionTree),
    Linear(LinearModel),
}

impl ModelDocument {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelDocument::DecisionTree(_) => "decision_tree",
            ModelDocument::Linear(_) => "linear",
        }
    }
}

impl Predictor for ModelDocument {
    fn n_features(&self) -> usize {
        match self {
            ModelDocument::DecisionTree(tree) => tree.n_features(),
            ModelDocument::Linear(model) => model.n_features(),
        }
    }

    fn n_classes(&self) -> Option<usize> {
        match self {
            ModelDocument::DecisionTree(tree) => tree.n_classes(),
            ModelDocument::Linear(model) => model.n_classes(),
        }
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, IntegrationError> {
        match self {
            ModelDocument::DecisionTree(tree) => tree.predict(rows),
            ModelDocument::Linear(model) => model.predict(rows),
        }
    }
}

/// Flat node arrays as exported from a fitted tree. Node 0 is the root and every child
/// index is greater than its parent's.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTreeNodes {
    pub n_features: usize,
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Class index for leaves, ignored for split nodes.
    pub value: Vec<Option<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

/// Binary decision tree; `x[feature] <= threshold` goes left.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "DecisionTreeNodes")]
pub struct DecisionTree {
    n_features: usize,
    nodes: Vec<Node>,
}

impl TryFrom<DecisionTreeNodes> for DecisionTree {
    type Error = String;

    fn try_from(raw: DecisionTreeNodes) -> Result<Self, Self::Error> {
        let n_nodes = raw.children_left.len();
        if n_nodes == 0 {
            return Err("decision tree has no nodes".to_string());
        }
        if raw.children_right.len() != n_nodes
            || raw.feature.len() != n_nodes
            || raw.threshold.len() != n_nodes
            || raw.value.len() != n_nodes
        {
            return Err(format!(
                "decision tree node arrays differ in length (children_left={}, children_right={}, feature={}, threshold={}, value={})",
                n_nodes,
                raw.children_right.len(),
                raw.feature.len(),
                raw.threshold.len(),
                raw.value.len()
            ));
        }

        let mut nodes = Vec::with_capacity(n_nodes);
        for id in 0..n_nodes {
            let (left, right) = (raw.children_left[id], raw.children_right[id]);
            if left == TREE_LEAF || right == TREE_LEAF {
                if left != right {
                    return Err(format!("node {id} has exactly one child"));
                }
                let class = raw.value[id].ok_or_else(|| format!("leaf {id} has no class"))?;
                nodes.push(Node::Leaf { class });
                continue;
            }

            let child = |c: i64| -> Result<usize, String> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > id && c < n_nodes)
                    .ok_or_else(|| format!("node {id} points at invalid child {c}"))
            };
            let feature = usize::try_from(raw.feature[id])
                .ok()
                .filter(|&f| f < raw.n_features)
                .ok_or_else(|| {
                    format!(
                        "node {id} splits on feature {} outside 0..{}",
                        raw.feature[id], raw.n_features
                    )
                })?;

            nodes.push(Node::Split {
                feature,
                threshold: raw.threshold[id],
                left: child(left)?,
                right: child(right)?,
            });
        }

        Ok(Self {
            n_features: raw.n_features,
            nodes,
        })
    }
}

impl DecisionTree {
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    fn predict_row(&self, row: &[f64]) -> usize {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { class } => return class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

impl Predictor for DecisionTree {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Leaf { class } => Some(class + 1),
                Node::Split { .. } => None,
            })
            .max()
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, IntegrationError> {
        rows.iter()
            .map(|row| {
                check_width(self.n_features, row)?;
                Ok(self.predict_row(row))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearWeights {
    /// One row per class, `[n_classes][n_features]`.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

/// One-vs-rest linear scorer; the class with the highest score wins, ties to the lowest index.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LinearWeights")]
pub struct LinearModel {
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl TryFrom<LinearWeights> for LinearModel {
    type Error = String;

    fn try_from(raw: LinearWeights) -> Result<Self, Self::Error> {
        let Some(first) = raw.coefficients.first() else {
            return Err("linear model has no classes".to_string());
        };
        let width = first.len();
        if width == 0 {
            return Err("linear model has no features".to_string());
        }
        if let Some(class) = raw.coefficients.iter().position(|c| c.len() != width) {
            return Err(format!(
                "coefficient row {class} has {} entries, expected {width}",
                raw.coefficients[class].len()
            ));
        }
        if raw.intercepts.len() != raw.coefficients.len() {
            return Err(format!(
                "{} intercepts for {} classes",
                raw.intercepts.len(),
                raw.coefficients.len()
            ));
        }
        Ok(Self {
            coefficients: raw.coefficients,
            intercepts: raw.intercepts,
        })
    }
}

impl LinearModel {
    fn predict_row(&self, row: &[f64]) -> usize {
        let mut best = (0, f64::NEG_INFINITY);
        for (class, (coef, intercept)) in self.coefficients.iter().zip(&self.intercepts).enumerate() {
            let score = intercept + coef.iter().zip(row).map(|(c, x)| c * x).sum::<f64>();
            if score > best.1 {
                best = (class, score);
            }
        }
        best.0
    }
}

impl Predictor for LinearModel {
    fn n_features(&self) -> usize {
        self.coefficients.first().map(Vec::len).unwrap_or(0)
    }

    fn n_classes(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, IntegrationError> {
        let width = self.n_features();
        rows.iter()
            .map(|row| {
                check_width(width, row)?;
                Ok(self.predict_row(row))
            })
            .collect()
    }
}
