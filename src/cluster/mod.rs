//! Shared Nearest Neighbor clustering for dense vectors.
//!
//! ## Why shared neighbors
//!
//! Radius-based density clustering (DBSCAN) needs one distance threshold that
//! fits every cluster. When one cluster is ten times denser than another, no
//! single radius separates both from the noise around them.
//!
//! SNN measures similarity by *overlap of neighbor lists* instead. Two points
//! in a sparse cluster are as similar as two points in a dense one, as long as
//! they see the same neighbors. The thresholds (`eps`, `min_pts`) are then
//! counts of shared neighbors and links, and mean the same thing at every
//! density.
//!
//! ## Pipeline
//!
//! | stage | type | output |
//! |-------|------|--------|
//! | k-NN queries | [`NeighborIndex`] ([`KdTreeIndex`], [`BruteForceIndex`]) | nearest points per query |
//! | neighbor sets | [`NeighborSets`] | `k` neighbors per point plus distance ties, self excluded |
//! | similarity | [`SimilarityGraph`] | sparse symmetric shared-neighbor counts |
//! | density, core, expansion, border | [`Snn`] | one label per point |
//!
//! Each stage is a batch pass over immutable output of the previous one. The
//! per-point stages run in parallel; the result does not depend on thread
//! count or scheduling.
//!
//! ## Labels
//!
//! Clusters are labeled `1..=C` in order of their lowest-indexed core point,
//! and noise is [`NOISE`] (`0`).
//!
//! ## Usage
//!
//! ```rust
//! use snnclust::cluster::{Clustering, Snn, NOISE};
//!
//! let mut data = Vec::new();
//! for i in 0..12 {
//!     let t = i as f32 * 0.1;
//!     data.push(vec![t, (i % 3) as f32 * 0.1]);
//!     data.push(vec![10.0 + t, 10.0 + (i % 3) as f32 * 0.1]);
//! }
//!
//! let labels = Snn::new(6, 3, 2).fit_predict(&data).unwrap();
//! assert_eq!(labels.len(), data.len());
//! assert_ne!(labels[0], NOISE);
//! assert_ne!(labels[0], labels[1]);
//! ```

mod graph;
mod neighbors;
mod snn;
mod traits;
mod util;

pub use graph::SimilarityGraph;
pub use neighbors::{
    BruteForceIndex, KdTreeIndex, NeighborIndex, NeighborSets, NeighborTies, NnAlgorithm,
};
pub use snn::{snn_labels, ExpansionStrategy, Snn, SnnFit, NOISE};
pub use traits::Clustering;
