//! Shared Nearest Neighbor clustering.
//!
//! `snnclust` finds clusters of different sizes, shapes, and densities by
//! replacing raw distance with the number of nearest neighbors two points
//! share (Ertöz, Steinbach & Kumar, 2003).
//!
//! The primary public API is under [`cluster`], which provides:
//! - [`Snn`], the clusterer, with [`SnnFit`] exposing the intermediate products
//!   (neighbor sets, similarity graph, density, core points)
//! - the building blocks: k-NN indexes, [`NeighborSets`], [`SimilarityGraph`]
//!
//! The crate logs through the [`log`] facade and never installs a logger.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;

pub use cluster::{
    snn_labels, BruteForceIndex, Clustering, ExpansionStrategy, KdTreeIndex, NeighborIndex,
    NeighborSets, NeighborTies, NnAlgorithm, SimilarityGraph, Snn, SnnFit, NOISE,
};
pub use error::{Error, Result};
