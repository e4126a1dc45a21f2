use std::collections::BTreeMap;

use ndarray::Array2;

use crate::config::TreeParams;
use crate::data_handling::Label;
use crate::error::{ResampleError, Result};
use crate::models::classifier_trait::{ClassifierModel, LeafIndex};

#[derive(Debug, Clone)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        label: Label,
    },
}

/// CART classification tree (Gini impurity, axis-aligned thresholds).
///
/// Nodes live in an arena; a leaf's identifier is its arena index.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    params: TreeParams,
    nodes: Vec<TreeNode>,
    /// Sorted distinct training labels; class ids index into it.
    classes: Vec<Label>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams) -> Self {
        DecisionTreeClassifier {
            params,
            nodes: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    fn class_counts(&self, ids: &[usize], y: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for &i in ids {
            counts[y[i]] += 1;
        }
        counts
    }

    /// Majority class; ties resolve to the smallest label.
    fn leaf_label(&self, counts: &[usize]) -> Label {
        let mut best = 0;
        for (c, &n) in counts.iter().enumerate() {
            if n > counts[best] {
                best = c;
            }
        }
        self.classes[best]
    }

    fn best_split(&self, x: &Array2<f64>, y: &[usize], ids: &[usize], parent: &[usize]) -> Option<Split> {
        let n = ids.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_gini = gini(parent, n);
        let mut best: Option<Split> = None;

        for feature in 0..x.ncols() {
            let mut sorted = ids.to_vec();
            sorted.sort_by(|&a, &b| x[(a, feature)].total_cmp(&x[(b, feature)]).then(a.cmp(&b)));

            let mut left = vec![0usize; self.classes.len()];
            let mut right = parent.to_vec();
            for pos in 0..n - 1 {
                let c = y[sorted[pos]];
                left[c] += 1;
                right[c] -= 1;

                let here = x[(sorted[pos], feature)];
                let next = x[(sorted[pos + 1], feature)];
                let n_left = pos + 1;
                let n_right = n - n_left;
                if here == next || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                let gain = parent_gini - weighted;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn grow(&mut self, x: &Array2<f64>, y: &[usize], ids: &[usize], depth: usize) -> usize {
        let counts = self.class_counts(ids, y);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        let split = if pure || depth >= self.params.max_depth || ids.len() < 2 {
            None
        } else {
            self.best_split(x, y, ids, &counts)
        };

        match split {
            None => {
                let label = self.leaf_label(&counts);
                self.nodes.push(TreeNode::Leaf { label });
                self.nodes.len() - 1
            }
            Some(split) => {
                // reserve the slot so the parent precedes its children
                let slot = self.nodes.len();
                self.nodes.push(TreeNode::Leaf { label: self.leaf_label(&counts) });

                let (left_ids, right_ids): (Vec<usize>, Vec<usize>) = ids
                    .iter()
                    .copied()
                    .partition(|&i| x[(i, split.feature)] <= split.threshold);
                let left = self.grow(x, y, &left_ids, depth + 1);
                let right = self.grow(x, y, &right_ids, depth + 1);
                self.nodes[slot] = TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                slot
            }
        }
    }

    fn walk(&self, row: &[f64]) -> Option<usize> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                TreeNode::Leaf { .. } => return Some(node),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

impl ClassifierModel for DecisionTreeClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[Label]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(ResampleError::DegenerateInput(format!(
                "decision tree needs a non-empty training set ({} rows, {} labels)",
                x.nrows(),
                y.len()
            )));
        }
        let index: BTreeMap<Label, usize> = y
            .iter()
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect();
        self.classes = index.keys().copied().collect();
        let encoded: Vec<usize> = y.iter().map(|l| index[l]).collect();

        self.nodes.clear();
        let ids: Vec<usize> = (0..x.nrows()).collect();
        self.grow(x, &encoded, &ids, 0);

        log::trace!(
            "decision tree fitted on {} rows: {} nodes, {} leaves",
            x.nrows(),
            self.n_nodes(),
            self.n_leaves()
        );
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<Label>> {
        if self.nodes.is_empty() {
            return Err(ResampleError::DegenerateInput(
                "decision tree used before fit".to_string(),
            ));
        }
        x.rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                match self.walk(&row).map(|id| &self.nodes[id]) {
                    Some(TreeNode::Leaf { label }) => Ok(*label),
                    _ => Err(ResampleError::DegenerateInput(
                        "decision tree walk did not end in a leaf".to_string(),
                    )),
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "decision_tree"
    }
}

impl LeafIndex for DecisionTreeClassifier {
    fn leaf_id(&self, row: &[f64]) -> Option<usize> {
        self.walk(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_decision_tree_separates_classes() {
        let x = array![
            [0.1, 1.0],
            [0.2, 0.9],
            [0.3, 1.1],
            [0.8, 0.0],
            [0.9, 0.1],
            [0.7, 0.2],
            [0.5, 5.0],
        ];
        let y = vec![0, 0, 0, 1, 1, 1, 2];
        let mut tree = DecisionTreeClassifier::new(TreeParams {
            max_depth: 4,
            min_samples_leaf: 1,
        });
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_leaf_ids_partition_rows() {
        let x = array![[0.0], [0.1], [1.0], [1.1]];
        let y = vec![0, 0, 1, 1];
        let mut tree = DecisionTreeClassifier::new(TreeParams::default());
        assert_eq!(tree.leaf_id(&[0.0]), None);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.n_leaves(), 2);
        let a = tree.leaf_id(&[0.0]).unwrap();
        let b = tree.leaf_id(&[1.1]).unwrap();
        assert_ne!(a, b);
        assert_eq!(tree.leaf_id(&[0.1]), Some(a));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let tree = DecisionTreeClassifier::new(TreeParams::default());
        assert!(tree.predict(&array![[0.0]]).is_err());
    }
}
