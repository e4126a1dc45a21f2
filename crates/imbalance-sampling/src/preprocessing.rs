//! Min-max scaling of continuous attributes to [0, 1].
//!
//! Nominal attributes keep their integer codes. Attributes with zero range map
//! to 0.0 and are restored to their constant value by `inverse_transform`.

use ndarray::{Array2, Axis};

use crate::data_handling::Dataset;

#[derive(Clone, Debug)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub nominal: Vec<bool>,
}

impl MinMaxScaler {
    /// Fit per-attribute bounds. An empty dataset yields a no-op scaler.
    pub fn fit(data: &Dataset) -> Self {
        let ncols = data.n_features();
        let mut min = vec![0.0; ncols];
        let mut max = vec![0.0; ncols];
        for (c, column) in data.x.axis_iter(Axis(1)).enumerate() {
            let (lo, hi) = column
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            if lo.is_finite() && hi.is_finite() {
                min[c] = lo;
                max[c] = hi;
            }
        }
        MinMaxScaler {
            min,
            max,
            nominal: data.nominal.clone(),
        }
    }

    fn range(&self, c: usize) -> f64 {
        self.max[c] - self.min[c]
    }

    pub fn transform_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for ((_, c), v) in out.indexed_iter_mut() {
            if self.nominal[c] {
                continue;
            }
            let range = self.range(c);
            *v = if range > 0.0 { (*v - self.min[c]) / range } else { 0.0 };
        }
        out
    }

    pub fn inverse_transform_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for ((_, c), v) in out.indexed_iter_mut() {
            if self.nominal[c] {
                continue;
            }
            *v = self.min[c] + *v * self.range(c);
        }
        out
    }

    pub fn transform(&self, data: &Dataset) -> Dataset {
        Dataset {
            x: self.transform_matrix(&data.x),
            y: data.y.clone(),
            nominal: data.nominal.clone(),
        }
    }

    pub fn inverse_transform(&self, data: &Dataset) -> Dataset {
        Dataset {
            x: self.inverse_transform_matrix(&data.x),
            y: data.y.clone(),
            nominal: data.nominal.clone(),
        }
    }
}

/// Fit a scaler and return the scaled dataset in one call.
pub fn fit_transform(data: &Dataset) -> (MinMaxScaler, Dataset) {
    let scaler = MinMaxScaler::fit(data);
    let scaled = scaler.transform(data);
    (scaler, scaled)
}
