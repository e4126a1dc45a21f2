use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::Array2;

use crate::config::{ModelConfig, ModelType};
use crate::data_handling::Label;
use crate::error::{ResampleError, Result};
use crate::models::classifier_trait::ClassifierModel;

/// Gradient Boosting Decision Tree (GBDT) classifier for two-class problems.
///
/// The smaller label is encoded as -1 and the larger one as +1 for the
/// log-likelihood loss; predicted probabilities of at least 0.5 map back to
/// the larger label.
pub struct GBDTClassifier {
    model: Option<GBDT>,
    params: ModelConfig,
    /// (negative, positive) labels seen during fit.
    labels: Option<(Label, Label)>,
}

impl GBDTClassifier {
    pub fn new(params: ModelConfig) -> Self {
        GBDTClassifier {
            model: None,
            params,
            labels: None,
        }
    }

    fn to_data_vec(x: &Array2<f64>, targets: Option<&[f32]>) -> DataVec {
        let mut data = DataVec::new();
        for (i, row) in x.rows().into_iter().enumerate() {
            let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            let label = targets.map_or(0.0, |t| t[i]);
            data.push(Data::new_training_data(features, 1.0, label, None));
        }
        data
    }
}

impl ClassifierModel for GBDTClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<()> {
        let mut distinct: Vec<Label> = y.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != 2 {
            return Err(ResampleError::DegenerateInput(format!(
                "GBDT classifier supports exactly 2 classes, got {}",
                distinct.len()
            )));
        }
        let (negative, positive) = (distinct[0], distinct[1]);

        match &self.params.model_type {
            ModelType::GBDT {
                max_depth,
                num_boost_round,
                debug,
                training_optimization_level,
                loss_type,
            } => {
                let mut config = Config::new();

                config.set_feature_size(x.ncols());
                config.set_shrinkage(self.params.learning_rate);
                config.set_max_depth(*max_depth);
                config.set_iterations(*num_boost_round as usize);
                config.set_debug(*debug);
                config.set_training_optimization_level(*training_optimization_level);
                config.set_loss(loss_type);

                let mut gbdt = GBDT::new(&config);

                let targets: Vec<f32> = y
                    .iter()
                    .map(|&l| if l == positive { 1.0 } else { -1.0 })
                    .collect();
                let mut train_x = Self::to_data_vec(x, Some(&targets));
                gbdt.fit(&mut train_x);

                self.model = Some(gbdt);
                self.labels = Some((negative, positive));
                Ok(())
            }
            other => Err(ResampleError::invalid(
                "model_type",
                format!("{:?}", other),
                "GBDTClassifier expects ModelType::GBDT parameters",
            )),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>> {
        let (model, (negative, positive)) = match (&self.model, self.labels) {
            (Some(model), Some(labels)) => (model, labels),
            _ => {
                return Err(ResampleError::DegenerateInput(
                    "GBDT classifier used before fit".to_string(),
                ))
            }
        };
        let test_x = Self::to_data_vec(x, None);
        let probabilities = model.predict(&test_x);
        Ok(probabilities
            .into_iter()
            .map(|p| if p >= 0.5 { positive } else { negative })
            .collect())
    }

    fn name(&self) -> &str {
        "gbdt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn gbdt_params() -> ModelConfig {
        ModelConfig {
            learning_rate: 0.1,
            model_type: ModelType::GBDT {
                max_depth: 3,
                num_boost_round: 20,
                debug: false,
                training_optimization_level: 2,
                loss_type: "LogLikelyhood".to_string(),
            },
        }
    }

    #[test]
    fn test_gbdt_classifier() {
        let x = array![
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.1],
            [0.0, 0.9],
            [1.1, 0.0],
            [0.0, 1.2],
        ];
        let y = vec![3, 7, 3, 7, 3, 7];

        let mut classifier = GBDTClassifier::new(gbdt_params());
        classifier.fit(&x, &y).unwrap();
        let predictions = classifier.predict(&x).unwrap();
        assert_eq!(predictions.len(), y.len());
        assert!(predictions.iter().all(|l| *l == 3 || *l == 7));
    }

    #[test]
    fn test_gbdt_rejects_multiclass() {
        let x = array![[0.0], [1.0], [2.0]];
        let mut classifier = GBDTClassifier::new(gbdt_params());
        assert!(classifier.fit(&x, &[0, 1, 2]).is_err());
    }
}
