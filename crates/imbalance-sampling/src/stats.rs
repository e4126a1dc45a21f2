use std::collections::BTreeSet;

use crate::data_handling::Label;

/// Fraction of predictions equal to the truth. Empty input scores 0.
pub fn accuracy(truth: &[Label], predicted: &[Label]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, p)| t == p)
        .count();
    hits as f64 / truth.len() as f64
}

/// Accuracy restricted to the instances whose true label is `label` (its recall).
///
/// Returns `None` when the class does not occur in `truth`.
pub fn class_accuracy(truth: &[Label], predicted: &[Label], label: Label) -> Option<f64> {
    let (hits, total) = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, _)| **t == label)
        .fold((0usize, 0usize), |(hits, total), (t, p)| {
            (hits + usize::from(t == p), total + 1)
        });
    if total == 0 {
        None
    } else {
        Some(hits as f64 / total as f64)
    }
}

/// Area under the ROC curve of crisp predictions.
///
/// For one class against the rest a crisp classifier has a single operating
/// point, so AUC = (TPR + TNR) / 2. The result is the macro average over the
/// classes present in `truth`; a single-class truth degenerates to its recall.
pub fn crisp_auc(truth: &[Label], predicted: &[Label]) -> f64 {
    let classes: BTreeSet<Label> = truth.iter().copied().collect();
    if classes.is_empty() {
        return 0.0;
    }
    if classes.len() == 1 {
        return accuracy(truth, predicted);
    }

    let per_class: Vec<f64> = classes
        .iter()
        .map(|&c| {
            let (mut tp, mut pos, mut tn, mut neg) = (0usize, 0usize, 0usize, 0usize);
            for (&t, &p) in truth.iter().zip(predicted.iter()) {
                if t == c {
                    pos += 1;
                    tp += usize::from(p == c);
                } else {
                    neg += 1;
                    tn += usize::from(p != c);
                }
            }
            let tpr = tp as f64 / pos as f64;
            let tnr = tn as f64 / neg as f64;
            (tpr + tnr) / 2.0
        })
        .collect();
    per_class.iter().sum::<f64>() / per_class.len() as f64
}
