// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use ndarray::{Array2, ArrayView1};

/// Shared N-D point cloud with a KD-tree for range queries.
///
/// Points are stored sample-major (`points[i]` is one K-dimensional sample),
/// which is the layout kiddo expects.
pub struct NdDataset<const K: usize> {
    pub points: Vec<[f64; K]>,
    pub n: usize,
    pub tree: ImmutableKdTree<f64, K>,
}

impl<const K: usize> NdDataset<K> {
    pub fn from_points(points: Vec<[f64; K]>) -> Self {
        let n = points.len();
        let tree = ImmutableKdTree::new_from_slice(&points);
        Self { points, n, tree }
    }

    /// Stacks K equally long 1-D vectors as the coordinates of each sample.
    ///
    /// # Panics
    /// If the vectors differ in length.
    pub fn points_from_columns(columns: [ArrayView1<'_, f64>; K]) -> Vec<[f64; K]> {
        let n = columns.first().map_or(0, |c| c.len());
        assert!(
            columns.iter().all(|c| c.len() == n),
            "all columns must have the same length"
        );
        (0..n)
            .map(|i| {
                let mut p = [0.0; K];
                for (dim, col) in columns.iter().enumerate() {
                    p[dim] = col[i];
                }
                p
            })
            .collect()
    }

    pub fn from_columns(columns: [ArrayView1<'_, f64>; K]) -> Self {
        Self::from_points(Self::points_from_columns(columns))
    }

    /// Samples as a `(K, n)` matrix, one variable per row.
    pub fn variables_by_row(&self) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((K, self.n));
        for (i, p) in self.points.iter().enumerate() {
            for dim in 0..K {
                out[[dim, i]] = p[dim];
            }
        }
        out
    }

    /// Indices of all samples within squared Euclidean distance `radius_sq` of `query`.
    pub fn within(&self, query: &[f64; K], radius_sq: f64) -> Vec<usize> {
        self.tree
            .within_unsorted::<SquaredEuclidean>(query, radius_sq)
            .into_iter()
            .map(|neighbour| neighbour.item as usize)
            .collect()
    }
}
