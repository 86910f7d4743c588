use super::ForestConfig;
use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// A multi-output CART regression tree.
///
/// Splits minimize the summed squared error over all outputs. Leaves hold the
/// mean output of their samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    cost: f64,
}

struct Grower<'a, R> {
    x: &'a DMatrix<f64>,
    y: &'a DMatrix<f64>,
    config: &'a ForestConfig,
    rng: &'a mut R,
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on the rows of `x` and `y` listed in `samples`.
    ///
    /// `samples` may repeat rows, as in a bootstrap sample, and must not be empty.
    pub fn fit<R: Rng>(
        x: &DMatrix<f64>,
        y: &DMatrix<f64>,
        samples: Vec<usize>,
        config: &ForestConfig,
        rng: &mut R,
    ) -> Self {
        let mut grower = Grower {
            x,
            y,
            config,
            rng,
            nodes: Vec::new(),
        };
        grower.grow(samples, 0);
        Self {
            nodes: grower.nodes,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { value } => return value,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth_from(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Split { left, right, .. } => {
                    1 + depth_from(nodes, *left).max(depth_from(nodes, *right))
                }
                Node::Leaf { .. } => 0,
            }
        }
        depth_from(&self.nodes, 0)
    }

    pub fn leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }
}

impl<R: Rng> Grower<'_, R> {
    /// Returns the index of the new node.
    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let at_limit = samples.len() < self.config.min_samples_split
            || self.config.max_depth.is_some_and(|max| depth >= max)
            || self.is_pure(&samples);

        let split = if at_limit {
            None
        } else {
            self.best_split(&samples)
        };

        let Some(split) = split else {
            let value = self.mean(&samples);
            self.nodes.push(Node::Leaf { value });
            return self.nodes.len() - 1;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.x[(i, split.feature)] <= split.threshold);

        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { value: Vec::new() });
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn is_pure(&self, samples: &[usize]) -> bool {
        let first = self.y.row(samples[0]);
        samples[1..].iter().all(|&i| self.y.row(i) == first)
    }

    fn mean(&self, samples: &[usize]) -> Vec<f64> {
        let n = samples.len() as f64;
        (0..self.y.ncols())
            .map(|o| samples.iter().map(|&i| self.y[(i, o)]).sum::<f64>() / n)
            .collect()
    }

    fn features(&mut self) -> Vec<usize> {
        let n_features = self.x.ncols();
        match self.config.max_features {
            Some(max) if max < n_features => {
                rand::seq::index::sample(&mut *self.rng, n_features, max.max(1)).into_vec()
            }
            _ => (0..n_features).collect(),
        }
    }

    fn best_split(&mut self, samples: &[usize]) -> Option<Split> {
        let n = samples.len();
        let outputs = self.y.ncols();
        let min_leaf = self.config.min_samples_leaf;

        let mut total_sum = vec![0.0; outputs];
        let mut total_sq = vec![0.0; outputs];
        for &i in samples {
            for o in 0..outputs {
                let v = self.y[(i, o)];
                total_sum[o] += v;
                total_sq[o] += v * v;
            }
        }

        let mut best: Option<Split> = None;
        let mut sorted = samples.to_vec();
        for feature in self.features() {
            sorted.sort_by(|&a, &b| self.x[(a, feature)].total_cmp(&self.x[(b, feature)]));

            let mut left_sum = vec![0.0; outputs];
            let mut left_sq = vec![0.0; outputs];
            for k in 0..n - 1 {
                let i = sorted[k];
                for o in 0..outputs {
                    let v = self.y[(i, o)];
                    left_sum[o] += v;
                    left_sq[o] += v * v;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let here = self.x[(i, feature)];
                let next = self.x[(sorted[k + 1], feature)];
                if next <= here {
                    continue;
                }

                let cost = (0..outputs)
                    .map(|o| {
                        let right_sum = total_sum[o] - left_sum[o];
                        let right_sq = total_sq[o] - left_sq[o];
                        (left_sq[o] - left_sum[o] * left_sum[o] / n_left as f64)
                            + (right_sq - right_sum * right_sum / n_right as f64)
                    })
                    .sum::<f64>();

                if best.as_ref().is_none_or(|b| cost < b.cost) {
                    let mid = here + (next - here) / 2.0;
                    // The midpoint can round up onto `next` for adjacent floats.
                    let threshold = if mid < next { mid } else { here };
                    best = Some(Split {
                        feature,
                        threshold,
                        cost,
                    });
                }
            }
        }

        best
    }
}
