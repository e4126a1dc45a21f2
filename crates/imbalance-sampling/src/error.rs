use std::error::Error;
use std::fmt;

/// Error raised by the resampling algorithms and their collaborators.
///
/// Every variant is unrecoverable for the current call; a run either returns a
/// complete result or fails with one of these before producing any output.
#[derive(Debug, Clone, PartialEq)]
pub enum ResampleError {
    /// A discrete or numeric parameter outside its supported range.
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
    /// Input that cannot be processed (too few classes, empty neighbour pool, ...).
    DegenerateInput(String),
    /// Spatial query against an index holding no points.
    EmptyIndex,
    /// Matrix construction failed.
    Shape(String),
}

impl ResampleError {
    pub fn invalid(name: &'static str, value: impl fmt::Display, reason: impl Into<String>) -> Self {
        ResampleError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn insufficient_neighbours(context: &str) -> Self {
        ResampleError::DegenerateInput(format!("insufficient neighbours: empty pool while {}", context))
    }

    pub fn degenerate_training_set(n_classes: usize) -> Self {
        ResampleError::DegenerateInput(format!(
            "degenerate training set: {} class(es) present, at least 2 required",
            n_classes
        ))
    }

    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, ResampleError::InvalidParameter { .. })
    }
}

impl fmt::Display for ResampleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResampleError::InvalidParameter { name, value, reason } => {
                write!(f, "Invalid parameter `{}` = {}: {}", name, value, reason)
            }
            ResampleError::DegenerateInput(msg) => write!(f, "Degenerate input: {}", msg),
            ResampleError::EmptyIndex => write!(f, "Spatial index is empty"),
            ResampleError::Shape(msg) => write!(f, "Shape error: {}", msg),
        }
    }
}

impl Error for ResampleError {}

impl From<ndarray::ShapeError> for ResampleError {
    fn from(err: ndarray::ShapeError) -> Self {
        ResampleError::Shape(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResampleError>;
