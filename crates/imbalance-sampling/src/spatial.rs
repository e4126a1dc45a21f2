//! Euclidean kd-tree answering k-nearest and k-farthest queries.
//!
//! Every node keeps the bounding box of its points. Nearest queries prune on
//! the minimum distance to a box, farthest queries on the maximum distance.
//! Equal distances are ordered by ascending point index so results do not
//! depend on traversal order.
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::Array2;

use crate::data_handling::Label;
use crate::error::{ResampleError, Result};

/// Direction of a neighbour query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Ascending distance.
    Nearest,
    /// Descending distance.
    Farthest,
}

/// One entry of a neighbour query result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    pub index: usize,
    pub distance: f64,
    pub label: Label,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf { start: usize, end: usize },
    Split { left: usize, right: usize },
}

#[derive(Debug, Clone)]
struct Node {
    lo: Vec<f64>,
    hi: Vec<f64>,
    kind: NodeKind,
}

/// Heap entry; the heap top is the current worst of the kept candidates.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    /// Squared distance for nearest queries, its negation for farthest ones.
    key: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then(self.index.cmp(&other.index))
    }
}

#[derive(Debug, Clone)]
pub struct KdTree {
    points: Array2<f64>,
    labels: Vec<Label>,
    /// Point indices reordered so every leaf owns a contiguous range.
    order: Vec<usize>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl KdTree {
    const LEAF_SIZE: usize = 16;

    pub fn build(points: &Array2<f64>, labels: &[Label]) -> Result<Self> {
        if points.nrows() != labels.len() {
            return Err(ResampleError::DegenerateInput(format!(
                "kd-tree: {} points but {} labels",
                points.nrows(),
                labels.len()
            )));
        }
        let mut tree = KdTree {
            points: points.clone(),
            labels: labels.to_vec(),
            order: (0..points.nrows()).collect(),
            nodes: Vec::new(),
            root: None,
        };
        if !tree.order.is_empty() {
            let n = tree.order.len();
            tree.root = Some(tree.build_node(0, n));
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.points.ncols()
    }

    pub fn label(&self, index: usize) -> Label {
        self.labels[index]
    }

    fn bounding_box(&self, start: usize, end: usize) -> (Vec<f64>, Vec<f64>) {
        let dim = self.dimension();
        let mut lo = vec![f64::INFINITY; dim];
        let mut hi = vec![f64::NEG_INFINITY; dim];
        for &i in &self.order[start..end] {
            for (d, &v) in self.points.row(i).iter().enumerate() {
                lo[d] = lo[d].min(v);
                hi[d] = hi[d].max(v);
            }
        }
        (lo, hi)
    }

    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let (lo, hi) = self.bounding_box(start, end);
        let len = end - start;

        let spread = |d: usize| hi[d] - lo[d];
        let split_dim = (0..self.dimension())
            .max_by(|&a, &b| spread(a).total_cmp(&spread(b)))
            .unwrap_or(0);

        if len <= Self::LEAF_SIZE || self.dimension() == 0 || spread(split_dim) <= 0.0 {
            self.nodes.push(Node {
                lo,
                hi,
                kind: NodeKind::Leaf { start, end },
            });
            return self.nodes.len() - 1;
        }

        let mid = start + len / 2;
        let points = &self.points;
        self.order[start..end].select_nth_unstable_by(len / 2, |&a, &b| {
            points[(a, split_dim)]
                .total_cmp(&points[(b, split_dim)])
                .then(a.cmp(&b))
        });

        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        self.nodes.push(Node {
            lo,
            hi,
            kind: NodeKind::Split { left, right },
        });
        self.nodes.len() - 1
    }

    fn squared_distance(&self, index: usize, query: &[f64]) -> f64 {
        self.points
            .row(index)
            .iter()
            .zip(query.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Bound on the best key reachable inside a node's box.
    fn box_bound(&self, node: &Node, query: &[f64], mode: QueryMode) -> f64 {
        let mut sum = 0.0;
        for (d, &q) in query.iter().enumerate() {
            let gap = match mode {
                QueryMode::Nearest => {
                    if q < node.lo[d] {
                        node.lo[d] - q
                    } else if q > node.hi[d] {
                        q - node.hi[d]
                    } else {
                        0.0
                    }
                }
                QueryMode::Farthest => (q - node.lo[d]).abs().max((node.hi[d] - q).abs()),
            };
            sum += gap * gap;
        }
        match mode {
            QueryMode::Nearest => sum,
            QueryMode::Farthest => -sum,
        }
    }

    /// Up to `k` points ordered by `mode`. Fails with `EmptyIndex` on an empty tree.
    pub fn n_neighbours(&self, query: &[f64], k: usize, mode: QueryMode) -> Result<Vec<Neighbour>> {
        let root = self.root.ok_or(ResampleError::EmptyIndex)?;
        if query.len() != self.dimension() {
            return Err(ResampleError::DegenerateInput(format!(
                "query of dimension {} against an index of dimension {}",
                query.len(),
                self.dimension()
            )));
        }
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.search(root, query, k, mode, &mut heap);

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbour {
                index: c.index,
                distance: c.key.abs().sqrt(),
                label: self.labels[c.index],
            })
            .collect())
    }

    fn search(
        &self,
        node_id: usize,
        query: &[f64],
        k: usize,
        mode: QueryMode,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = &self.nodes[node_id];
        if heap.len() == k {
            if let Some(worst) = heap.peek() {
                if self.box_bound(node, query, mode) > worst.key {
                    return;
                }
            }
        }

        match node.kind {
            NodeKind::Leaf { start, end } => {
                for &index in &self.order[start..end] {
                    let sq = self.squared_distance(index, query);
                    let key = match mode {
                        QueryMode::Nearest => sq,
                        QueryMode::Farthest => -sq,
                    };
                    let candidate = Candidate { key, index };
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if let Some(worst) = heap.peek() {
                        if candidate < *worst {
                            heap.pop();
                            heap.push(candidate);
                        }
                    }
                }
            }
            NodeKind::Split { left, right } => {
                let bl = self.box_bound(&self.nodes[left], query, mode);
                let br = self.box_bound(&self.nodes[right], query, mode);
                let (first, second) = if bl <= br { (left, right) } else { (right, left) };
                self.search(first, query, k, mode, heap);
                self.search(second, query, k, mode, heap);
            }
        }
    }
}
