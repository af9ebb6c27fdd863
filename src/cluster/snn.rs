//! SNN: Shared Nearest Neighbor clustering.
//!
//! # The Algorithm (Ertöz, Steinbach & Kumar, 2003)
//!
//! DBSCAN measures density with a fixed spatial radius, so it cannot find a
//! dense cluster and a sparse one in the same pass. SNN replaces spatial
//! distance with a similarity that adapts to local density: two points are
//! similar when their k-nearest-neighbor lists overlap.
//!
//! ## Core Concepts
//!
//! - **K**: size of each point's nearest-neighbor list.
//! - **SNN similarity**: for mutual k-nearest neighbors, the number of
//!   neighbors they share; zero otherwise.
//! - **Eps**: minimum SNN similarity for two points to count as linked. This
//!   is a shared-neighbor count, not a distance.
//! - **MinPts**: minimum number of links for a point to be "core".
//! - **Border point**: not core, but linked to at least one core point.
//! - **Noise point**: linked to no core point.
//!
//! ## Algorithm Steps
//!
//! 1. Find the `K` nearest neighbors of every point.
//! 2. Link mutual neighbors, weighted by how many neighbors they share.
//! 3. SNN density: count each point's links with weight `>= Eps`.
//! 4. Core points: density `>= MinPts`.
//! 5. Connect core points whose link weight is `>= Eps`; each connected
//!    component is one cluster.
//! 6. Each non-core point joins the cluster of its most similar core point,
//!    provided some core point reaches `Eps`. Otherwise it is noise.
//!
//! ## Complexity
//!
//! - **Time**: `n` k-NN queries, then `O(n k²)` for the graph; expansion and
//!   border assignment walk the sparse graph.
//! - **Space**: `O(n k)`.
//!
//! ## Parameters
//!
//! `MinPts < K` is required: a point cannot have more qualifying links than
//! it has neighbors. `Eps` is usually somewhere around `K / 2`.
//!
//! ## References
//!
//! Ertöz, L., Steinbach, M., Kumar, V. (2003). "Finding Clusters of Different
//! Sizes, Shapes, and Densities in Noisy, High Dimensional Data." SDM 2003.

use std::collections::VecDeque;
use std::time::Instant;

use log::{debug, info, trace, warn};
use rayon::prelude::*;

use super::graph::SimilarityGraph;
use super::neighbors::{BruteForceIndex, KdTreeIndex, NeighborSets, NeighborTies, NnAlgorithm};
use super::traits::Clustering;
use super::util::UnionFind;
use crate::error::{Error, Result};

/// Label of points that belong to no cluster. Clusters are labeled `1..=C`.
pub const NOISE: usize = 0;

/// How core points are grouped into clusters.
///
/// Both strategies produce identical labels: clusters are numbered in order of
/// their lowest-indexed core point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpansionStrategy {
    /// Queue-driven traversal from each unvisited core point.
    #[default]
    Worklist,
    /// Union every qualifying core-core link, then number the components.
    UnionFind,
}

/// SNN clustering algorithm.
#[derive(Debug, Clone)]
pub struct Snn {
    /// Neighbors per point.
    k: usize,
    /// Minimum shared-neighbor count for a link to qualify.
    eps: usize,
    /// Minimum qualifying links for a core point.
    min_pts: usize,
    nn_algorithm: NnAlgorithm,
    ties: NeighborTies,
    expansion: ExpansionStrategy,
}

impl Snn {
    /// Create a new SNN clusterer.
    ///
    /// # Arguments
    ///
    /// * `k` - Nearest neighbors per point.
    /// * `eps` - Minimum shared neighbors for two points to be linked.
    /// * `min_pts` - Minimum links for a core point; must be smaller than `k`.
    pub fn new(k: usize, eps: usize, min_pts: usize) -> Self {
        Self {
            k,
            eps,
            min_pts,
            nn_algorithm: NnAlgorithm::default(),
            ties: NeighborTies::default(),
            expansion: ExpansionStrategy::default(),
        }
    }

    /// Set the number of neighbors per point.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the link threshold.
    pub fn with_eps(mut self, eps: usize) -> Self {
        self.eps = eps;
        self
    }

    /// Set the core-point threshold.
    pub fn with_min_pts(mut self, min_pts: usize) -> Self {
        self.min_pts = min_pts;
        self
    }

    /// Set the nearest-neighbor backend.
    pub fn with_nn_algorithm(mut self, nn_algorithm: NnAlgorithm) -> Self {
        self.nn_algorithm = nn_algorithm;
        self
    }

    /// Set how points tied with the k-th neighbor are handled.
    pub fn with_ties(mut self, ties: NeighborTies) -> Self {
        self.ties = ties;
        self
    }

    /// Set the core expansion strategy.
    pub fn with_expansion(mut self, expansion: ExpansionStrategy) -> Self {
        self.expansion = expansion;
        self
    }

    /// Neighbors per point.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Link threshold on shared-neighbor counts.
    pub fn eps(&self) -> usize {
        self.eps
    }

    /// Links a point needs to be core.
    pub fn min_pts(&self) -> usize {
        self.min_pts
    }

    /// Nearest-neighbor backend, before `Auto` is resolved.
    pub fn nn_algorithm(&self) -> NnAlgorithm {
        self.nn_algorithm
    }

    /// Tie policy at the k-th neighbor.
    pub fn ties(&self) -> NeighborTies {
        self.ties
    }

    /// Core expansion strategy.
    pub fn expansion(&self) -> ExpansionStrategy {
        self.expansion
    }

    fn validate_params(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }

        if self.min_pts == 0 {
            return Err(Error::InvalidParameter {
                name: "min_pts",
                message: "must be at least 1",
            });
        }

        if self.min_pts >= self.k {
            return Err(Error::InvalidParameter {
                name: "min_pts",
                message: "must be smaller than k",
            });
        }

        Ok(())
    }

    /// Check the data against the parameters. Returns the dimensionality.
    fn validate_input(&self, data: &[Vec<f32>]) -> Result<usize> {
        let n = data.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }

        let d = data[0].len();
        if d == 0 {
            return Err(Error::InvalidParameter {
                name: "dimension",
                message: "must be at least 1",
            });
        }
        for (row, point) in data.iter().enumerate() {
            if point.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: point.len(),
                    row,
                });
            }
            if point.iter().any(|x| !x.is_finite()) {
                return Err(Error::NonFiniteCoordinate { row });
            }
        }

        if n <= self.k {
            return Err(Error::InsufficientPoints {
                k: self.k,
                n_items: n,
            });
        }

        Ok(d)
    }

    /// Run the full pipeline, keeping every intermediate result.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<SnnFit> {
        self.validate_params()?;
        let dim = self.validate_input(data)?;
        let n = data.len();

        let algorithm = self.nn_algorithm.resolve(dim);
        info!(
            "SNN: n={} dim={} k={} eps={} min_pts={} index={:?}",
            n, dim, self.k, self.eps, self.min_pts, algorithm
        );
        if self.eps > self.k {
            warn!(
                "eps={} exceeds k={}; points rarely share more than k neighbors",
                self.eps, self.k
            );
        }

        let start = Instant::now();
        let neighbors = match algorithm {
            NnAlgorithm::KdTree => {
                let index = KdTreeIndex::new(data)?;
                NeighborSets::build(&index, self.k, self.ties)?
            }
            _ => NeighborSets::build(&BruteForceIndex::new(data), self.k, self.ties)?,
        };
        trace!("neighbor sets built in {:?}", start.elapsed());

        let graph = SimilarityGraph::build(&neighbors);
        let density = graph.density(self.eps);

        let core: Vec<bool> = density.iter().map(|&d| d >= self.min_pts).collect();
        let core_points: Vec<usize> = (0..n).filter(|&i| core[i]).collect();
        debug!("core points: {:?}", core_points);

        let mut labels = vec![NOISE; n];
        let n_clusters = match self.expansion {
            ExpansionStrategy::Worklist => {
                expand_worklist(&graph, &core, &core_points, self.eps, &mut labels)
            }
            ExpansionStrategy::UnionFind => {
                expand_union_find(&graph, &core, &core_points, self.eps, &mut labels)
            }
        };
        debug!("labels after core expansion: {:?}", labels);

        assign_border(&graph, &core, self.eps, &mut labels);

        let fit = SnnFit {
            neighbors,
            graph,
            density,
            core,
            core_points,
            labels,
            n_clusters,
        };
        info!(
            "SNN: {} links, {} core points, {} clusters, {} noise points in {:?}",
            fit.graph.n_edges(),
            fit.core_points.len(),
            fit.n_clusters,
            fit.n_noise(),
            start.elapsed()
        );
        Ok(fit)
    }

    /// Fit and predict, returning `None` for noise points and `Some(1..=C)`
    /// for cluster members.
    pub fn fit_predict_with_noise(&self, data: &[Vec<f32>]) -> Result<Vec<Option<usize>>> {
        Ok(self.fit(data)?.labels_with_noise())
    }
}

impl Default for Snn {
    fn default() -> Self {
        Self::new(20, 10, 5)
    }
}

impl Clustering for Snn {
    /// Labels are `1..=C` for clusters and [`NOISE`] (0) for noise.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.into_labels())
    }

    /// SNN discovers clusters dynamically, so this returns 0.
    ///
    /// Use [`SnnFit::n_clusters`] for the discovered count.
    fn n_clusters(&self) -> usize {
        0
    }
}

/// Cluster a point matrix in one call.
///
/// Equivalent to `Snn::new(k, eps, min_pts).fit_predict(data)`.
pub fn snn_labels(data: &[Vec<f32>], k: usize, eps: usize, min_pts: usize) -> Result<Vec<usize>> {
    Snn::new(k, eps, min_pts).fit_predict(data)
}

/// Everything an SNN run computed.
#[derive(Debug, Clone)]
pub struct SnnFit {
    neighbors: NeighborSets,
    graph: SimilarityGraph,
    density: Vec<usize>,
    core: Vec<bool>,
    core_points: Vec<usize>,
    labels: Vec<usize>,
    n_clusters: usize,
}

impl SnnFit {
    /// One label per point: [`NOISE`] or `1..=n_clusters()`.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Consume the fit, keeping only the labels.
    pub fn into_labels(self) -> Vec<usize> {
        self.labels
    }

    /// Labels with noise as `None`.
    pub fn labels_with_noise(&self) -> Vec<Option<usize>> {
        self.labels
            .iter()
            .map(|&l| if l == NOISE { None } else { Some(l) })
            .collect()
    }

    /// Number of clusters found.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of points labeled [`NOISE`].
    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// SNN density of every point.
    pub fn density(&self) -> &[usize] {
        &self.density
    }

    /// Whether point `i` is a core point.
    pub fn is_core(&self, i: usize) -> bool {
        self.core[i]
    }

    /// Core point indices, ascending.
    pub fn core_points(&self) -> &[usize] {
        &self.core_points
    }

    /// The shared-neighbor similarity graph.
    pub fn graph(&self) -> &SimilarityGraph {
        &self.graph
    }

    /// Each point's k-neighbor set.
    pub fn neighbors(&self) -> &NeighborSets {
        &self.neighbors
    }
}

fn push_core_links(
    graph: &SimilarityGraph,
    core: &[bool],
    visited: &[bool],
    eps: usize,
    p: usize,
    queue: &mut VecDeque<usize>,
) {
    if let Some(row) = graph.row(p) {
        queue.extend(
            row.iter()
                .filter(|&(q, &w)| core[q] && !visited[q] && w as usize >= eps)
                .map(|(q, _)| q),
        );
    }
}

/// Label connected components of the core subgraph by traversal. Returns the
/// number of clusters.
fn expand_worklist(
    graph: &SimilarityGraph,
    core: &[bool],
    core_points: &[usize],
    eps: usize,
    labels: &mut [usize],
) -> usize {
    let mut visited = vec![false; labels.len()];
    let mut queue = VecDeque::new();
    let mut cluster = NOISE;

    for &p in core_points {
        if visited[p] {
            continue;
        }
        visited[p] = true;
        cluster += 1;
        labels[p] = cluster;

        push_core_links(graph, core, &visited, eps, p, &mut queue);
        while let Some(q) = queue.pop_front() {
            // A point can be queued by several neighbors before it is reached.
            if visited[q] {
                continue;
            }
            visited[q] = true;
            labels[q] = cluster;
            push_core_links(graph, core, &visited, eps, q, &mut queue);
        }
    }

    cluster
}

/// Same components as [`expand_worklist`], found with a disjoint-set forest.
fn expand_union_find(
    graph: &SimilarityGraph,
    core: &[bool],
    core_points: &[usize],
    eps: usize,
    labels: &mut [usize],
) -> usize {
    let mut uf = UnionFind::new(labels.len());
    for &p in core_points {
        let Some(row) = graph.row(p) else { continue };
        for (q, &w) in row.iter() {
            if q > p && core[q] && w as usize >= eps {
                uf.union(p, q);
            }
        }
    }

    // Number components in order of their lowest core point.
    let mut root_label = vec![NOISE; labels.len()];
    let mut cluster = NOISE;
    for &p in core_points {
        let root = uf.find(p);
        if root_label[root] == NOISE {
            cluster += 1;
            root_label[root] = cluster;
        }
        labels[p] = root_label[root];
    }

    cluster
}

/// The core point a non-core point `i` joins, if any.
///
/// The best core is the first (lowest index) to strictly exceed the running
/// maximum similarity, starting from zero. It is only used when some core
/// point reaches `eps`; the maximum is taken over all cores regardless.
/// With `eps = 0` a point can be linked to cores by zero-weight links alone;
/// no core is more similar than another then, and the point stays noise.
fn best_core(graph: &SimilarityGraph, core: &[bool], eps: usize, i: usize) -> Option<usize> {
    let row = graph.row(i)?;

    let mut linked = false;
    let mut best = None;
    let mut max_sim = 0;
    // Cores missing from the row have similarity zero and never beat `max_sim`.
    for (p, &sim) in row.iter().filter(|&(p, _)| core[p]) {
        if sim as usize >= eps {
            linked = true;
        }
        if sim > max_sim {
            max_sim = sim;
            best = Some(p);
        }
    }

    if linked {
        best
    } else {
        None
    }
}

/// Give each non-core point the label of its best core, or leave it noise.
fn assign_border(graph: &SimilarityGraph, core: &[bool], eps: usize, labels: &mut [usize]) {
    // Best cores are core points, whose labels are final at this point.
    let cluster_of: &[usize] = labels;
    let assigned: Vec<(usize, usize)> = (0..cluster_of.len())
        .into_par_iter()
        .filter(|&i| !core[i])
        .filter_map(|i| best_core(graph, core, eps, i).map(|p| (i, cluster_of[p])))
        .collect();

    for (i, label) in assigned {
        labels[i] = label;
    }
}
