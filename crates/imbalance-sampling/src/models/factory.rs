use crate::config::{ModelConfig, ModelType};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::decision_tree::DecisionTreeClassifier;
use crate::models::gbdt::GBDTClassifier;

/// Untrained oracle classifier for `params`: a CART tree or a gradient boosted ensemble.
pub fn build_model(params: ModelConfig) -> Box<dyn ClassifierModel> {
    match params.model_type {
        ModelType::DecisionTree(tree) => Box::new(DecisionTreeClassifier::new(tree)),
        ModelType::GBDT { .. } => Box::new(GBDTClassifier::new(params)),
    }
}
