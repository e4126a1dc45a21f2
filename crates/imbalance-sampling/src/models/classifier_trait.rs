use ndarray::Array2;

use crate::data_handling::Label;
use crate::error::Result;

/// A small trait abstraction for the classifiers used as fitness oracles.
/// Implementations are trained on a candidate prototype set and then asked to
/// label a held-out set; only the predicted labels matter to the callers.
pub trait ClassifierModel: Send {
    /// Fit the model on rows of `x` labelled by `y`.
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<()>;

    /// Predict one label per row of `x`. Fails when called before `fit`.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>>;

    /// Name used in log lines.
    fn name(&self) -> &str { "classifier" }
}

/// Tree-structured models able to report which leaf a row falls into.
pub trait LeafIndex {
    /// Identifier of the leaf reached by `row`, `None` before fitting.
    fn leaf_id(&self, row: &[f64]) -> Option<usize>;
}
