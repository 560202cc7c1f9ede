//! Tree-ensemble inference for the fitted advice model.
//!
//! Models are sklearn `DecisionTreeClassifier` / `RandomForestClassifier` exports:
//!
//! ```json
//! {
//!   "model_type": "random_forest",
//!   "model_name": "advice",
//!   "n_features": 5,
//!   "classes": [0, 1, 2],
//!   "trees": [
//!     { "nodes": [
//!       { "feature": 2, "threshold": 0.13, "left": 1, "right": 2, "value": null },
//!       { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.9, 0.1, 0.0] },
//!       { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.0, 0.2, 0.8] }
//!     ]}
//!   ]
//! }
//! ```
//!
//! A decision tree uses the same layout with a single `"tree"` object instead of `"trees"`.
//! Nodes are stored in pre-order, so every child index is greater than its parent's.

use std::path::Path;
use std::sync::Arc;

use analysis_core::FEATURE_COUNT;
use serde::Deserialize;

use crate::advice::Classifier;
use crate::error::{MLError, MLResult};

/// A single node in an exported tree.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on (-1 for leaf nodes).
    pub feature: i32,
    pub threshold: f64,
    pub left: i32,
    pub right: i32,
    /// Class weights for leaf nodes, one per entry of `classes`.
    pub value: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct TreeJson {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Deserialize)]
struct ModelHeader {
    model_type: String,
}

#[derive(Debug, Deserialize)]
struct DecisionTreeJson {
    model_type: String,
    #[serde(default)]
    model_name: Option<String>,
    n_features: usize,
    classes: Vec<i64>,
    tree: TreeJson,
}

#[derive(Debug, Deserialize)]
struct RandomForestJson {
    model_type: String,
    #[serde(default)]
    model_name: Option<String>,
    n_features: usize,
    classes: Vec<i64>,
    trees: Vec<TreeJson>,
}

fn check_header(model_type: &str, expected: &str, n_features: usize, classes: &[i64]) -> MLResult<()> {
    if model_type != expected {
        return Err(MLError::InvalidModel(format!(
            "expected model_type '{expected}', got '{model_type}'"
        )));
    }
    if n_features != FEATURE_COUNT {
        return Err(MLError::InvalidModel(format!(
            "expected {FEATURE_COUNT} features, got {n_features}"
        )));
    }
    if classes.is_empty() {
        return Err(MLError::InvalidModel("model declares no classes".to_string()));
    }
    Ok(())
}

fn validate_nodes(nodes: &[TreeNode], n_classes: usize) -> MLResult<()> {
    if nodes.is_empty() {
        return Err(MLError::InvalidModel("tree has no nodes".to_string()));
    }

    for (i, node) in nodes.iter().enumerate() {
        if node.feature == -1 {
            match &node.value {
                Some(v) if v.len() == n_classes => {}
                Some(v) => {
                    return Err(MLError::InvalidModel(format!(
                        "leaf {i} has {} class weights, expected {n_classes}",
                        v.len()
                    )))
                }
                None => return Err(MLError::InvalidModel(format!("leaf {i} missing value array"))),
            }
            continue;
        }

        if node.feature < 0 || node.feature as usize >= FEATURE_COUNT {
            return Err(MLError::InvalidModel(format!(
                "node {i} has invalid feature index {}",
                node.feature
            )));
        }
        for child in [node.left, node.right] {
            // pre-order: children come strictly after their parent, which also rules out cycles
            if child <= i as i32 || child as usize >= nodes.len() {
                return Err(MLError::InvalidModel(format!("node {i} has invalid child {child}")));
            }
        }
    }
    Ok(())
}

/// Walk from the root to a leaf and return its class weights.
fn leaf_weights<'a>(nodes: &'a [TreeNode], features: &[f64; FEATURE_COUNT]) -> &'a [f64] {
    let mut idx = 0usize;
    loop {
        let node = &nodes[idx];
        if node.feature == -1 {
            return node.value.as_deref().unwrap_or(&[]);
        }
        let x = features[node.feature as usize];
        // NaN goes left
        idx = if x.is_nan() || x <= node.threshold {
            node.left as usize
        } else {
            node.right as usize
        };
    }
}

/// Index of the largest weight; first one wins on ties.
fn argmax(weights: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &w) in weights.iter().enumerate() {
        match best {
            Some((_, b)) if w <= b => {}
            _ if w.is_nan() => {}
            _ => best = Some((i, w)),
        }
    }
    best.map(|(i, _)| i)
}

/// Single decision tree loaded from an sklearn export
#[derive(Debug, Clone)]
pub struct DecisionTree {
    name: String,
    classes: Vec<i64>,
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn from_json_str(json: &str) -> MLResult<Self> {
        let model: DecisionTreeJson = serde_json::from_str(json)?;
        check_header(&model.model_type, "decision_tree", model.n_features, &model.classes)?;
        validate_nodes(&model.tree.nodes, model.classes.len())?;

        Ok(Self {
            name: format!("DecisionTree_{}", model.model_name.as_deref().unwrap_or("advice")),
            classes: model.classes,
            nodes: model.tree.nodes,
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MLResult<Self> {
        Self::from_json_str(&std::fs::read_to_string(path.as_ref())?)
    }
}

impl Classifier for DecisionTree {
    fn classify(&self, normalized: &[f64; FEATURE_COUNT]) -> i64 {
        match argmax(leaf_weights(&self.nodes, normalized)) {
            Some(i) => self.classes[i],
            None => -1,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Random forest loaded from an sklearn export; averages leaf probabilities across trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    name: String,
    classes: Vec<i64>,
    trees: Vec<Vec<TreeNode>>,
}

impl RandomForest {
    pub fn from_json_str(json: &str) -> MLResult<Self> {
        let model: RandomForestJson = serde_json::from_str(json)?;
        check_header(&model.model_type, "random_forest", model.n_features, &model.classes)?;
        if model.trees.is_empty() {
            return Err(MLError::InvalidModel("random forest has no trees".to_string()));
        }
        for tree in &model.trees {
            validate_nodes(&tree.nodes, model.classes.len())?;
        }

        Ok(Self {
            name: format!("RandomForest_{}", model.model_name.as_deref().unwrap_or("advice")),
            classes: model.classes,
            trees: model.trees.into_iter().map(|t| t.nodes).collect(),
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MLResult<Self> {
        Self::from_json_str(&std::fs::read_to_string(path.as_ref())?)
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Mean class probabilities across all trees.
    pub fn predict_proba(&self, normalized: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        let mut probs = vec![0.0; self.classes.len()];
        for nodes in &self.trees {
            let weights = leaf_weights(nodes, normalized);
            let total: f64 = weights.iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (p, w) in probs.iter_mut().zip(weights) {
                *p += w / total;
            }
        }
        let n = self.trees.len() as f64;
        probs.iter_mut().for_each(|p| *p /= n);
        probs
    }
}

impl Classifier for RandomForest {
    fn classify(&self, normalized: &[f64; FEATURE_COUNT]) -> i64 {
        match argmax(&self.predict_proba(normalized)) {
            Some(i) => self.classes[i],
            None => -1,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Load whichever tree model the file declares in `model_type`.
pub fn load_classifier<P: AsRef<Path>>(path: P) -> MLResult<Arc<dyn Classifier>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let header: ModelHeader = serde_json::from_str(&content)?;

    let model: Arc<dyn Classifier> = match header.model_type.as_str() {
        "random_forest" => Arc::new(RandomForest::from_json_str(&content)?),
        "decision_tree" => Arc::new(DecisionTree::from_json_str(&content)?),
        other => {
            return Err(MLError::InvalidModel(format!(
                "unsupported model_type '{other}' in {}",
                path.display()
            )))
        }
    };

    tracing::info!(model = model.name(), path = %path.display(), "loaded advice model");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_json() -> &'static str {
        r#"{
            "model_type": "decision_tree",
            "model_name": "test",
            "n_features": 5,
            "classes": [0, 1, 2],
            "tree": {
                "nodes": [
                    {"feature": 4, "threshold": 0.5, "left": 1, "right": 2, "value": null},
                    {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [8.0, 1.0, 1.0]},
                    {"feature": 2, "threshold": 0.0, "left": 3, "right": 4, "value": null},
                    {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.0, 5.0, 1.0]},
                    {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.0, 1.0, 9.0]}
                ]
            }
        }"#
    }

    fn forest_json() -> &'static str {
        r#"{
                "model_type": "random_forest",
                "model_name": "pair",
                "n_features": 5,
                "classes": [0, 1, 2],
                "trees": [
                    {"nodes": [
                        {"feature": 0, "threshold": 0.0, "left": 1, "right": 2, "value": null},
                        {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [1.0, 0.0, 0.0]},
                        {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.0, 0.0, 1.0]}
                    ]},
                    {"nodes": [
                        {"feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": [0.2, 0.8, 0.0]}
                    ]}
                ]
            }"#
    }

    #[test]
    fn test_decision_tree_paths() {
        let tree = DecisionTree::from_json_str(tree_json()).unwrap();
        assert_eq!(tree.name(), "DecisionTree_test");

        assert_eq!(tree.classify(&[0.0, 0.0, 0.0, 0.0, 0.1]), 0);
        assert_eq!(tree.classify(&[0.0, 0.0, -1.0, 0.0, 0.9]), 1);
        assert_eq!(tree.classify(&[0.0, 0.0, 1.0, 0.0, 0.9]), 2);
    }

    #[test]
    fn test_nan_goes_left() {
        let tree = DecisionTree::from_json_str(tree_json()).unwrap();
        assert_eq!(tree.classify(&[0.0, 0.0, 0.0, 0.0, f64::NAN]), 0);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = RandomForest::from_json_str(forest_json()).unwrap();
        assert_eq!(forest.n_estimators(), 2);

        // left leaf: [1,0,0] + [0.2,0.8,0] -> [0.6, 0.4, 0]
        let left = [-1.0, 0.0, 0.0, 0.0, 0.0];
        let probs = forest.predict_proba(&left);
        assert!((probs[0] - 0.6).abs() < 1e-12);
        assert_eq!(forest.classify(&left), 0);

        // right leaf: [0,0,1] + [0.2,0.8,0] -> [0.1, 0.4, 0.5]
        assert_eq!(forest.classify(&[1.0, 0.0, 0.0, 0.0, 0.0]), 2);
    }

    #[test]
    fn test_rejects_wrong_feature_count() {
        let json = tree_json().replace("\"n_features\": 5", "\"n_features\": 42");
        assert!(matches!(DecisionTree::from_json_str(&json), Err(MLError::InvalidModel(_))));
    }

    #[test]
    fn test_rejects_backward_child() {
        let json = tree_json().replace(
            r#"{"feature": 2, "threshold": 0.0, "left": 3, "right": 4, "value": null}"#,
            r#"{"feature": 2, "threshold": 0.0, "left": 0, "right": 4, "value": null}"#,
        );
        assert!(matches!(DecisionTree::from_json_str(&json), Err(MLError::InvalidModel(_))));
    }

    #[test]
    fn test_rejects_wrong_model_type() {
        assert!(RandomForest::from_json_str(tree_json()).is_err());
    }

    #[test]
    fn test_load_classifier_dispatches_on_model_type() {
        let path = std::env::temp_dir().join(format!("forest-test-{}.json", std::process::id()));
        std::fs::write(&path, forest_json()).unwrap();
        let model = load_classifier(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(model.name(), "RandomForest_pair");
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[0.5, 0.5, 0.0]), Some(0));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f64::NAN, 0.1]), Some(1));
    }
}
