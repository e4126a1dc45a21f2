//! Fitness oracle: scores a candidate training set by how well a wrapped
//! classifier trained on it labels a held-out set.
use std::collections::BTreeSet;

use ndarray::Array2;

use crate::config::{FitnessMeasure, ModelConfig};
use crate::data_handling::Label;
use crate::error::{ResampleError, Result};
use crate::models::factory::build_model;
use crate::models::ClassifierModel;
use crate::stats;

/// Scores of a trained model on a test set; both lie in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub auc: f64,
}

impl Evaluation {
    pub fn score(&self, measure: FitnessMeasure) -> f64 {
        match measure {
            FitnessMeasure::Accuracy => self.accuracy,
            FitnessMeasure::Auc => self.auc,
        }
    }
}

pub trait FitnessOracle: Send + Sync {
    fn measure(&self) -> FitnessMeasure;

    /// Train a model. Fails with a degenerate-training-set error below 2 classes.
    fn train(&self, x: &Array2<f64>, y: &[Label]) -> Result<Box<dyn ClassifierModel>>;

    fn evaluate(&self, model: &dyn ClassifierModel, x: &Array2<f64>, y: &[Label]) -> Result<Evaluation> {
        let predicted = model.predict(x)?;
        Ok(Evaluation {
            accuracy: stats::accuracy(y, &predicted),
            auc: stats::crisp_auc(y, &predicted),
        })
    }

    /// Train on one set, score on another with the configured measure.
    fn fitness(
        &self,
        train_x: &Array2<f64>,
        train_y: &[Label],
        test_x: &Array2<f64>,
        test_y: &[Label],
    ) -> Result<f64> {
        let model = self.train(train_x, train_y)?;
        let evaluation = self.evaluate(model.as_ref(), test_x, test_y)?;
        Ok(evaluation.score(self.measure()))
    }
}

/// Oracle backed by one of the crate's classifier models.
#[derive(Debug, Clone)]
pub struct ClassifierOracle {
    model: ModelConfig,
    measure: FitnessMeasure,
}

impl ClassifierOracle {
    pub fn new(model: ModelConfig, measure: FitnessMeasure) -> Self {
        ClassifierOracle { model, measure }
    }
}

impl FitnessOracle for ClassifierOracle {
    fn measure(&self) -> FitnessMeasure {
        self.measure
    }

    fn train(&self, x: &Array2<f64>, y: &[Label]) -> Result<Box<dyn ClassifierModel>> {
        let n_classes = y.iter().collect::<BTreeSet<_>>().len();
        if n_classes < 2 {
            return Err(ResampleError::degenerate_training_set(n_classes));
        }
        let mut model = build_model(self.model.clone());
        log::trace!("training {} on {} prototypes", model.name(), x.nrows());
        model.fit(x, y)?;
        Ok(model)
    }
}
