//! Isolation forest outlier model.
//!
//! Trees isolate points by random axis-aligned splits; outliers sit at
//! shallow depths. Scoring follows the usual convention: `score_samples`
//! lands in (-1, 0) with more negative meaning more anomalous, and
//! `decision_function` shifts it by a contamination-quantile offset computed
//! on the training sample so that roughly the contamination fraction of
//! training points falls below zero.

use rand::Rng;

pub const DEFAULT_TREES: usize = 100;
const MAX_SUBSAMPLE: usize = 256;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

pub struct IsolationForest {
    trees: Vec<Tree>,
    // c(psi), normalizes path depths across subsample sizes
    path_norm: f64,
    offset: f64,
}

struct Tree {
    nodes: Vec<Node>,
}

#[derive(Clone, Copy)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationForest {
    /// Fit a forest of `n_trees` on `data`, calibrating the decision offset
    /// so that about `contamination` of the training points are labeled
    /// outliers.
    pub fn fit(data: &[Vec<f64>], n_trees: usize, contamination: f64, rng: &mut impl Rng) -> Self {
        debug_assert!(!data.is_empty());
        let psi = data.len().min(MAX_SUBSAMPLE);
        let height_limit = (psi as f64).log2().ceil() as usize;

        let mut trees = Vec::with_capacity(n_trees);
        for _ in 0..n_trees {
            let rows = rand::seq::index::sample(rng, data.len(), psi).into_vec();
            let mut nodes = Vec::new();
            build_node(&mut nodes, data, rows, 0, height_limit, rng);
            trees.push(Tree { nodes });
        }

        let mut forest = Self {
            trees,
            path_norm: average_path_length(psi),
            offset: 0.0,
        };

        let mut train_scores: Vec<f64> = data.iter().map(|x| forest.score_samples(x)).collect();
        train_scores.sort_by(|a, b| a.total_cmp(b));
        forest.offset = quantile(&train_scores, contamination);
        forest
    }

    /// Raw anomaly score in (-1, 0); more negative = more anomalous.
    pub fn score_samples(&self, x: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(x)).sum();
        let avg_depth = total / self.trees.len() as f64;
        -(2f64.powf(-avg_depth / self.path_norm))
    }

    /// Score shifted by the training offset; negative means outlier.
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.score_samples(x) - self.offset
    }

    /// The model's native binary in/out-of-distribution label.
    pub fn is_outlier(&self, x: &[f64]) -> bool {
        self.decision_function(x) < 0.0
    }
}

impl Tree {
    fn path_length(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { size } => return depth + average_path_length(size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] < threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

fn build_node(
    nodes: &mut Vec<Node>,
    data: &[Vec<f64>],
    rows: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut impl Rng,
) -> usize {
    if depth >= height_limit || rows.len() <= 1 {
        nodes.push(Node::Leaf { size: rows.len() });
        return nodes.len() - 1;
    }

    let dims = data[rows[0]].len();
    let splittable: Vec<usize> = (0..dims)
        .filter(|&f| {
            let (lo, hi) = min_max(data, &rows, f);
            hi > lo
        })
        .collect();
    if splittable.is_empty() {
        // all remaining points identical
        nodes.push(Node::Leaf { size: rows.len() });
        return nodes.len() - 1;
    }

    let feature = splittable[rng.gen_range(0..splittable.len())];
    let (lo, hi) = min_max(data, &rows, feature);
    let threshold = rng.gen_range(lo..hi);

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&r| data[r][feature] < threshold);

    let idx = nodes.len();
    nodes.push(Node::Leaf { size: 0 }); // placeholder until children exist
    let left = build_node(nodes, data, left_rows, depth + 1, height_limit, rng);
    let right = build_node(nodes, data, right_rows, depth + 1, height_limit, rng);
    nodes[idx] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    idx
}

fn min_max(data: &[Vec<f64>], rows: &[usize], feature: usize) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &r in rows {
        let v = data[r][feature];
        if v < lo {
            lo = v;
        }
        if v > hi {
            hi = v;
        }
    }
    (lo, hi)
}

/// Average path length of an unsuccessful search in a BST of `n` nodes.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
    }
}
