use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Distance used by the neighbourhood rules.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    /// HVDM-style metric mixing scaled numeric differences and nominal mismatches.
    Heterogeneous,
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "heterogeneous" | "hvdm" => Ok(DistanceMetric::Heterogeneous),
            _ => Err(format!(
                "Unknown distance metric: {}. Valid options are: euclidean, heterogeneous",
                s
            )),
        }
    }
}

/// How a nominal mismatch contributes to the heterogeneous distance.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NominalWeighting {
    /// 1 when the values differ, 0 otherwise.
    #[default]
    Overlap,
    /// Mismatch scaled by the difference of class-conditional probabilities.
    ValueDifference,
}

/// Score reported by the fitness oracle.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMeasure {
    Accuracy,
    #[default]
    Auc,
}

impl FromStr for FitnessMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accuracy" | "acc" => Ok(FitnessMeasure::Accuracy),
            "auc" => Ok(FitnessMeasure::Auc),
            _ => Err(format!("Unknown fitness measure: {}. Valid options are: accuracy, auc", s)),
        }
    }
}

/// Hyper-parameters of the CART decision tree.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: 8,
            min_samples_leaf: 1,
        }
    }
}

/// Configuration of the classifier used as fitness oracle.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ModelConfig {
    pub learning_rate: f32,

    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub enum ModelType {
    DecisionTree(TreeParams),
    GBDT {
        max_depth: u32,
        num_boost_round: u32,
        debug: bool,
        training_optimization_level: u8,
        loss_type: String,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::DecisionTree(TreeParams::default())
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" | "decision_tree" | "cart" => Ok(ModelType::DecisionTree(TreeParams::default())),
            "gbdt" => Ok(ModelType::GBDT {
                max_depth: 6,
                num_boost_round: 3,
                debug: false,
                training_optimization_level: 2,
                loss_type: "LogLikelyhood".to_string(),
            }),
            _ => Err(format!(
                "Unknown model type: {}. Valid options are: tree, gbdt",
                s
            )),
        }
    }
}

impl ModelConfig {
    pub fn new(learning_rate: f32, model_type: ModelType) -> Self {
        Self {
            learning_rate,
            model_type,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            model_type: ModelType::default(),
        }
    }
}

/// Settings shared by every resampling algorithm.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SamplerConfig {
    /// Seed of the run's random generator. `None` seeds from the wall clock.
    pub seed: Option<u64>,
    pub distance: DistanceMetric,
    pub nominal_weighting: NominalWeighting,
    /// Min-max scale features to [0, 1] before processing.
    pub normalize: bool,
    /// Shuffle instance order before processing (affects tie-breaks only).
    pub randomize_order: bool,
    /// Log a before/after summary of the run.
    pub verbose: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            seed: None,
            distance: DistanceMetric::Euclidean,
            nominal_weighting: NominalWeighting::Overlap,
            normalize: false,
            randomize_order: false,
            verbose: false,
        }
    }
}

impl SamplerConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed for this run, falling back to the current time in milliseconds.
    pub fn resolve_seed(&self) -> u64 {
        self.seed
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().unsigned_abs())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EnnConfig {
    #[serde(flatten)]
    pub common: SamplerConfig,
    pub k: usize,
}

impl Default for EnnConfig {
    fn default() -> Self {
        EnnConfig {
            common: SamplerConfig::default(),
            k: 3,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NearMissConfig {
    #[serde(flatten)]
    pub common: SamplerConfig,
    /// Selection rule, one of 1, 2 or 3.
    pub version: u8,
    pub n_neighbours: usize,
    /// Retained majority instances per minority instance.
    pub ratio: f64,
}

impl Default for NearMissConfig {
    fn default() -> Self {
        NearMissConfig {
            common: SamplerConfig::default(),
            version: 1,
            n_neighbours: 3,
            ratio: 1.0,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NclConfig {
    #[serde(flatten)]
    pub common: SamplerConfig,
    pub k: usize,
    /// Classes with more than `threshold * n_samples` instances may be cleaned.
    pub threshold: f64,
}

impl Default for NclConfig {
    fn default() -> Self {
        NclConfig {
            common: SamplerConfig::default(),
            k: 3,
            threshold: 0.5,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IpadeConfig {
    #[serde(flatten)]
    pub common: SamplerConfig,
    /// Differential evolution iterations per optimisation call.
    pub iterations: usize,
    /// Mutation strategy used by the local-search iterations, one of 1..=4.
    pub strategy: u8,
    /// Pick the instance added for the untouchable class at random instead of farthest-first.
    pub random_choice: bool,
    pub measure: FitnessMeasure,
    pub oracle: ModelConfig,
    /// Tree whose leaves partition the data into initial clusters.
    pub init_tree: TreeParams,
}

impl Default for IpadeConfig {
    fn default() -> Self {
        IpadeConfig {
            common: SamplerConfig {
                normalize: true,
                ..SamplerConfig::default()
            },
            iterations: 50,
            strategy: 1,
            random_choice: true,
            measure: FitnessMeasure::Auc,
            oracle: ModelConfig::default(),
            init_tree: TreeParams {
                max_depth: 8,
                min_samples_leaf: 2,
            },
        }
    }
}
