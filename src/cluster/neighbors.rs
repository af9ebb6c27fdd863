//! k-nearest-neighbor queries and neighbor-set construction.
//!
//! SNN clustering only ever asks one question of the input geometry: "which
//! `k` points are closest to point `i`?". The answer is materialized once per
//! point as a [`NeighborSets`] table; everything downstream works on indices.
//!
//! ## Duplicates and self-exclusion
//!
//! When points coincide, the query point is not guaranteed to be the first
//! hit of a nearest-neighbor search. Dropping "the first result" would then
//! discard a real neighbor and keep the query itself. Here the query is
//! removed by index identity, and hits at equal distance are ordered by
//! ascending index so the table never depends on a tree's visiting order.
//!
//! ## Index choice
//!
//! KD-trees are exact and fast in low dimensions but degrade toward a linear
//! scan as dimensionality grows (roughly past 20), where brute force wins.

use std::cmp::Ordering;

use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Dimensionality at which [`NnAlgorithm::Auto`] stops using a KD-tree.
const KD_TREE_MAX_DIM: usize = 20;

/// Nearest-neighbor search backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NnAlgorithm {
    /// KD-tree below 20 dimensions, brute force otherwise.
    #[default]
    Auto,
    /// Exact linear scan over all points.
    BruteForce,
    /// KD-tree (the `kdtree` crate).
    KdTree,
}

impl NnAlgorithm {
    /// Resolve `Auto` for data of the given dimensionality.
    pub fn resolve(self, dim: usize) -> NnAlgorithm {
        match self {
            NnAlgorithm::Auto if dim < KD_TREE_MAX_DIM => NnAlgorithm::KdTree,
            NnAlgorithm::Auto => NnAlgorithm::BruteForce,
            other => other,
        }
    }
}

/// What to do with points tied at the distance of the k-th neighbor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NeighborTies {
    /// Keep every point tied with the k-th neighbor, so a set may exceed `k`.
    ///
    /// A group of coincident points then all see each other, and neighbor
    /// sets do not depend on the order the points were given in.
    #[default]
    Keep,
    /// Keep exactly `k` neighbors; lower indices win ties.
    Truncate,
}

/// A nearest-neighbor index over a fixed set of points.
pub trait NeighborIndex: Sync {
    /// Number of indexed points.
    fn len(&self) -> usize;

    /// Whether the index holds no points.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `count` points closest to indexed point `query`, plus any further
    /// points tied with the last of them.
    ///
    /// Returns `(squared distance, index)` pairs ordered by distance, then by
    /// index. The query itself is part of the result (at distance zero).
    fn nearest(&self, query: usize, count: usize) -> Result<Vec<(f32, usize)>>;
}

#[inline]
fn by_distance_then_index(a: &(f32, usize), b: &(f32, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

fn check_query(query: usize, len: usize) -> Result<()> {
    if query >= len {
        return Err(Error::Other(format!(
            "query index {query} out of range for {len} indexed points"
        )));
    }
    Ok(())
}

/// Exact nearest neighbors by linear scan.
#[derive(Debug, Clone, Copy)]
pub struct BruteForceIndex<'a> {
    data: &'a [Vec<f32>],
}

impl<'a> BruteForceIndex<'a> {
    /// Index `data` (rows must share one dimensionality).
    pub fn new(data: &'a [Vec<f32>]) -> Self {
        Self { data }
    }
}

impl NeighborIndex for BruteForceIndex<'_> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn nearest(&self, query: usize, count: usize) -> Result<Vec<(f32, usize)>> {
        check_query(query, self.data.len())?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let point = self.data[query].as_slice();
        let mut hits: Vec<(f32, usize)> = self
            .data
            .iter()
            .enumerate()
            .map(|(j, other)| (squared_euclidean(point, other.as_slice()), j))
            .collect();

        if count < hits.len() {
            let (_, &mut (boundary, _), _) =
                hits.select_nth_unstable_by(count - 1, by_distance_then_index);
            hits.retain(|&(d, _)| d <= boundary);
        }
        hits.sort_unstable_by(by_distance_then_index);
        Ok(hits)
    }
}

/// Exact nearest neighbors through a KD-tree (squared Euclidean distance).
pub struct KdTreeIndex<'a> {
    tree: KdTree<f32, usize, &'a [f32]>,
    data: &'a [Vec<f32>],
}

impl<'a> KdTreeIndex<'a> {
    /// Build the tree over `data`. Rows must be finite and share one
    /// dimensionality.
    pub fn new(data: &'a [Vec<f32>]) -> Result<Self> {
        let dim = data.first().map_or(0, Vec::len);
        let mut tree = KdTree::new(dim);
        for (i, point) in data.iter().enumerate() {
            tree.add(point.as_slice(), i)
                .map_err(|e| Error::Other(format!("kd-tree insert of row {i} failed: {e:?}")))?;
        }
        Ok(Self { tree, data })
    }
}

impl std::fmt::Debug for KdTreeIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdTreeIndex")
            .field("n_points", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl NeighborIndex for KdTreeIndex<'_> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn nearest(&self, query: usize, count: usize) -> Result<Vec<(f32, usize)>> {
        check_query(query, self.data.len())?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let n = self.data.len();
        let point = self.data[query].as_slice();

        // Which of several equidistant points the tree returns depends on its
        // layout, so widen the search until it reaches past the boundary
        // distance and every tied point is in hand.
        let mut want = (count + 1).min(n);
        loop {
            let hits = self
                .tree
                .nearest(point, want, &squared_euclidean)
                .map_err(|e| Error::Other(format!("kd-tree query for row {query} failed: {e:?}")))?;

            let boundary = match hits.get(count - 1) {
                Some(&(d, _)) => d,
                None => f32::INFINITY,
            };
            let past_boundary = hits.last().is_some_and(|&(d, _)| d > boundary);

            if past_boundary || want >= n {
                let mut out: Vec<(f32, usize)> = hits
                    .into_iter()
                    .filter(|&(d, _)| d <= boundary)
                    .map(|(d, &j)| (d, j))
                    .collect();
                out.sort_unstable_by(by_distance_then_index);
                return Ok(out);
            }
            want = (want * 2).min(n);
        }
    }
}

/// The k-neighbor set of every point, self excluded.
///
/// Each set is stored sorted by point index, so membership is a binary search
/// and intersections are a two-pointer merge.
#[derive(Debug, Clone)]
pub struct NeighborSets {
    k: usize,
    sets: Vec<Vec<usize>>,
}

impl NeighborSets {
    /// Query `index` for every point's `k` nearest neighbors.
    ///
    /// Points are independent, so the queries run in parallel.
    pub fn build<I>(index: &I, k: usize, ties: NeighborTies) -> Result<Self>
    where
        I: NeighborIndex + ?Sized,
    {
        let n = index.len();
        if n <= k {
            return Err(Error::InsufficientPoints { k, n_items: n });
        }

        let sets = (0..n)
            .into_par_iter()
            .map(|i| neighbor_set(index, i, k, ties))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { k, sets })
    }

    /// Requested neighbors per point.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether there are no points.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Neighbors of point `i`, ascending by index.
    pub fn get(&self, i: usize) -> &[usize] {
        &self.sets[i]
    }

    /// Whether `j` is one of `i`'s neighbors.
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.sets[i].binary_search(&j).is_ok()
    }

    /// Whether `i` and `j` are in each other's neighbor sets.
    pub fn are_mutual(&self, i: usize, j: usize) -> bool {
        self.contains(i, j) && self.contains(j, i)
    }

    /// Number of neighbors `i` and `j` have in common.
    pub fn shared(&self, i: usize, j: usize) -> usize {
        let (a, b) = (&self.sets[i], &self.sets[j]);
        let (mut x, mut y, mut count) = (0, 0, 0);
        while x < a.len() && y < b.len() {
            match a[x].cmp(&b[y]) {
                Ordering::Less => x += 1,
                Ordering::Greater => y += 1,
                Ordering::Equal => {
                    count += 1;
                    x += 1;
                    y += 1;
                }
            }
        }
        count
    }
}

fn neighbor_set<I>(index: &I, query: usize, k: usize, ties: NeighborTies) -> Result<Vec<usize>>
where
    I: NeighborIndex + ?Sized,
{
    let hits = index.nearest(query, k + 1)?;

    let mut set = Vec::with_capacity(k);
    let mut boundary = f32::NEG_INFINITY;
    for (dist, j) in hits.into_iter().filter(|&(_, j)| j != query) {
        if set.len() < k {
            set.push(j);
            boundary = dist;
        } else if ties == NeighborTies::Keep && dist.total_cmp(&boundary).is_eq() {
            set.push(j);
        } else {
            break;
        }
    }

    if set.len() < k {
        return Err(Error::Other(format!(
            "index returned {} neighbors for row {query}, expected {k}",
            set.len()
        )));
    }

    set.sort_unstable();
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![i as f32, 0.0]).collect()
    }

    #[test]
    fn auto_resolves_by_dimension() {
        assert_eq!(NnAlgorithm::Auto.resolve(2), NnAlgorithm::KdTree);
        assert_eq!(NnAlgorithm::Auto.resolve(64), NnAlgorithm::BruteForce);
        assert_eq!(NnAlgorithm::BruteForce.resolve(2), NnAlgorithm::BruteForce);
        assert_eq!(NnAlgorithm::KdTree.resolve(64), NnAlgorithm::KdTree);
    }

    #[test]
    fn brute_force_orders_by_distance() {
        let data = line(6);
        let index = BruteForceIndex::new(&data);
        let hits = index.nearest(0, 3).unwrap();
        let idx: Vec<usize> = hits.iter().map(|&(_, j)| j).collect();
        assert_eq!(idx, vec![0, 1, 2]);
        assert_eq!(hits[2].0, 4.0);
    }

    #[test]
    fn nearest_includes_boundary_ties() {
        // From point 2, points 1 and 3 are equidistant.
        let data = line(5);
        let brute = BruteForceIndex::new(&data);
        let kd = KdTreeIndex::new(&data).unwrap();

        let expected = vec![(0.0, 2), (1.0, 1), (1.0, 3)];
        assert_eq!(brute.nearest(2, 2).unwrap(), expected);
        assert_eq!(kd.nearest(2, 2).unwrap(), expected);
    }

    #[test]
    fn kd_tree_matches_brute_force() {
        let data: Vec<Vec<f32>> = (0..40)
            .map(|i| {
                let t = i as f32;
                vec![(t * 1.7).sin() * 5.0, (t * 0.3).cos() * 3.0 + t * 0.1]
            })
            .collect();
        let brute = BruteForceIndex::new(&data);
        let kd = KdTreeIndex::new(&data).unwrap();

        for i in 0..data.len() {
            assert_eq!(brute.nearest(i, 6).unwrap(), kd.nearest(i, 6).unwrap());
        }
    }

    #[test]
    fn query_out_of_range() {
        let data = line(3);
        assert!(BruteForceIndex::new(&data).nearest(3, 1).is_err());
        assert!(KdTreeIndex::new(&data).unwrap().nearest(7, 1).is_err());
    }

    #[test]
    fn sets_exclude_self() {
        let data = line(6);
        let index = BruteForceIndex::new(&data);
        let sets = NeighborSets::build(&index, 2, NeighborTies::Truncate).unwrap();

        assert_eq!(sets.len(), 6);
        assert_eq!(sets.get(0), &[1, 2]);
        // Point 3: neighbors 2 and 4 at distance 1.
        assert_eq!(sets.get(3), &[2, 4]);
        for i in 0..sets.len() {
            assert!(!sets.contains(i, i));
            assert_eq!(sets.get(i).len(), 2);
        }
    }

    #[test]
    fn duplicates_keep_self_out() {
        // Four coincident points: the query may come back anywhere among the
        // zero-distance hits, but it must never appear in its own set.
        let data = vec![vec![1.0, 1.0]; 4];
        let kd = KdTreeIndex::new(&data).unwrap();
        let sets = NeighborSets::build(&kd, 2, NeighborTies::Truncate).unwrap();

        assert_eq!(sets.get(0), &[1, 2]);
        assert_eq!(sets.get(1), &[0, 2]);
        assert_eq!(sets.get(2), &[0, 1]);
        assert_eq!(sets.get(3), &[0, 1]);
    }

    #[test]
    fn keep_ties_extends_sets() {
        assert_eq!(NeighborTies::default(), NeighborTies::Keep);

        let data = vec![vec![1.0, 1.0]; 4];
        let index = BruteForceIndex::new(&data);
        let sets = NeighborSets::build(&index, 2, NeighborTies::default()).unwrap();

        assert_eq!(sets.get(0), &[1, 2, 3]);
        assert_eq!(sets.get(3), &[0, 1, 2]);
    }

    #[test]
    fn shared_and_mutual() {
        let data = line(6);
        let index = BruteForceIndex::new(&data);
        let sets = NeighborSets::build(&index, 2, NeighborTies::Truncate).unwrap();

        // N(1) = {0, 2}, N(2) = {1, 3}: mutual, nothing shared.
        assert!(sets.are_mutual(1, 2));
        assert_eq!(sets.shared(1, 2), 0);
        // N(0) = {1, 2}: 0 is in N(1) but not in N(2).
        assert!(sets.are_mutual(0, 1));
        assert!(!sets.are_mutual(0, 2));
        assert_eq!(sets.shared(0, 1), 1);
    }

    #[test]
    fn too_few_points() {
        let data = line(3);
        let index = BruteForceIndex::new(&data);
        let err = NeighborSets::build(&index, 3, NeighborTies::Truncate).unwrap_err();
        assert!(matches!(err, Error::InsufficientPoints { k: 3, n_items: 3 }));
    }
}
