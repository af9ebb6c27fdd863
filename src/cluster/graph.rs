//! Shared-nearest-neighbor similarity graph.
//!
//! Two points are linked only when each is in the other's k-neighbor set
//! (mutual neighbors). The link weight is the number of neighbors they have in
//! common. Mutual neighbors that share nothing are still stored, with weight
//! zero, so an `eps` of zero links exactly the mutual pairs. Every other pair
//! is absent and reads as zero.
//!
//! The graph is built in one pass and frozen as a CSR matrix: rows are
//! computed independently (in parallel), then assembled once. There is no way
//! to mutate it afterwards, so every downstream phase reads a finished graph.

use std::time::Instant;

use log::{debug, trace};
use rayon::prelude::*;
use sprs::{CsMat, CsVecView, TriMat};

use super::neighbors::NeighborSets;

/// Symmetric sparse SNN similarity matrix.
#[derive(Debug, Clone)]
pub struct SimilarityGraph {
    matrix: CsMat<u32>,
}

impl SimilarityGraph {
    /// Build the graph from per-point neighbor sets.
    ///
    /// Only pairs drawn from a point's own neighbor set can pass the mutual
    /// gate, so each row walks its `k` neighbors rather than all `n` points.
    /// Row `i` and row `j` each compute the `(i, j)` intersection; both get
    /// the same count, which keeps the matrix symmetric.
    pub fn build(neighbors: &NeighborSets) -> Self {
        let start = Instant::now();
        let n = neighbors.len();

        let rows: Vec<Vec<(usize, u32)>> = (0..n)
            .into_par_iter()
            .map(|i| {
                // Neighbor sets are sorted, so rows come out column-ordered.
                neighbors
                    .get(i)
                    .iter()
                    .copied()
                    .filter(|&j| neighbors.contains(j, i))
                    .map(|j| (j, neighbors.shared(i, j) as u32))
                    .collect()
            })
            .collect();

        let nnz: usize = rows.iter().map(Vec::len).sum();
        trace!("SNN rows computed in {:?}", start.elapsed());

        let mut triplets = TriMat::with_capacity((n, n), nnz);
        for (i, row) in rows.iter().enumerate() {
            for &(j, w) in row {
                triplets.add_triplet(i, j, w);
            }
        }
        let matrix: CsMat<u32> = triplets.to_csr();

        debug!(
            "SNN graph: {} points, {} links, built in {:?}",
            n,
            nnz / 2,
            start.elapsed()
        );

        Self { matrix }
    }

    /// Number of points (rows).
    pub fn n_points(&self) -> usize {
        self.matrix.rows()
    }

    /// Number of undirected links (mutual neighbor pairs).
    pub fn n_edges(&self) -> usize {
        self.matrix.nnz() / 2
    }

    /// Link weight between `i` and `j`, if they are mutual neighbors.
    ///
    /// `Some(0)` is a link without shared neighbors; `None` is no link.
    pub fn edge(&self, i: usize, j: usize) -> Option<u32> {
        self.matrix.get(i, j).copied()
    }

    /// SNN similarity of `i` and `j`; zero when they are not linked.
    pub fn weight(&self, i: usize, j: usize) -> u32 {
        self.edge(i, j).unwrap_or(0)
    }

    /// Links of point `i` as a sparse row, ascending by column.
    pub fn row(&self, i: usize) -> Option<CsVecView<'_, u32>> {
        self.matrix.outer_view(i)
    }

    /// SNN density: per point, the number of links with weight `>= eps`.
    pub fn density(&self, eps: usize) -> Vec<usize> {
        (0..self.n_points())
            .into_par_iter()
            .map(|i| {
                self.row(i).map_or(0, |row| {
                    row.iter().filter(|&(_, &w)| w as usize >= eps).count()
                })
            })
            .collect()
    }

    /// Whether every stored link `(i, j)` has an identical `(j, i)`.
    pub fn is_symmetric(&self) -> bool {
        (0..self.n_points()).all(|i| {
            self.row(i).map_or(true, |row| {
                row.iter().all(|(j, &w)| self.edge(j, i) == Some(w))
            })
        })
    }
}
