pub mod classifier_trait;
pub mod decision_tree;
pub mod factory;
pub mod gbdt;

pub use classifier_trait::{ClassifierModel, LeafIndex};
pub use decision_tree::DecisionTreeClassifier;
pub use gbdt::GBDTClassifier;
