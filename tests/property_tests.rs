use snnclust::cluster::{Clustering, ExpansionStrategy, NnAlgorithm, Snn, NOISE};
use proptest::prelude::*;

/// Points plus parameters satisfying `1 <= min_pts < k < n` and `1 <= eps <= k`.
fn dataset_and_params() -> impl Strategy<Value = (Vec<Vec<f32>>, usize, usize, usize)> {
    (2usize..7).prop_flat_map(|k| {
        (
            prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), (k + 1)..40),
            Just(k),
            1..=k,
            1..k,
        )
    })
}

proptest! {
    #[test]
    fn prop_one_label_per_point((data, k, eps, min_pts) in dataset_and_params()) {
        let labels = Snn::new(k, eps, min_pts).fit_predict(&data).unwrap();
        prop_assert_eq!(labels.len(), data.len());
    }

    #[test]
    fn prop_graph_is_symmetric((data, k, eps, min_pts) in dataset_and_params()) {
        let fit = Snn::new(k, eps, min_pts).fit(&data).unwrap();
        let graph = fit.graph();
        prop_assert!(graph.is_symmetric());

        for i in 0..data.len() {
            for j in 0..data.len() {
                prop_assert_eq!(graph.weight(i, j), graph.weight(j, i));
                let bound = fit.neighbors().get(i).len().min(fit.neighbors().get(j).len());
                prop_assert!(graph.weight(i, j) as usize <= bound);
                if graph.edge(i, j).is_some() {
                    prop_assert!(fit.neighbors().are_mutual(i, j));
                }
            }
        }
    }

    #[test]
    fn prop_core_iff_dense((data, k, eps, min_pts) in dataset_and_params()) {
        let fit = Snn::new(k, eps, min_pts).fit(&data).unwrap();

        for i in 0..data.len() {
            prop_assert_eq!(fit.is_core(i), fit.density()[i] >= min_pts);
            if fit.is_core(i) {
                prop_assert_ne!(fit.labels()[i], NOISE);
            }
        }
    }

    #[test]
    fn prop_labels_are_contiguous((data, k, eps, min_pts) in dataset_and_params()) {
        let fit = Snn::new(k, eps, min_pts).fit(&data).unwrap();

        let mut seen: Vec<usize> = fit.labels().iter().copied().filter(|&l| l != NOISE).collect();
        seen.sort_unstable();
        seen.dedup();
        let expected: Vec<usize> = (1..=fit.n_clusters()).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_linked_cores_share_a_cluster((data, k, eps, min_pts) in dataset_and_params()) {
        let fit = Snn::new(k, eps, min_pts).fit(&data).unwrap();
        let graph = fit.graph();

        for &p in fit.core_points() {
            for &q in fit.core_points() {
                if graph.weight(p, q) as usize >= eps {
                    prop_assert_eq!(fit.labels()[p], fit.labels()[q]);
                }
            }
        }
    }

    #[test]
    fn prop_noise_has_no_linked_core((data, k, eps, min_pts) in dataset_and_params()) {
        let fit = Snn::new(k, eps, min_pts).fit(&data).unwrap();
        let graph = fit.graph();

        for i in 0..data.len() {
            let linked_core = fit
                .core_points()
                .iter()
                .find(|&&p| graph.weight(i, p) as usize >= eps);

            if fit.labels()[i] == NOISE {
                prop_assert!(linked_core.is_none(), "noise point {} links to a core", i);
            } else if !fit.is_core(i) {
                // Border points take the label of a core they are linked to.
                let label = fit.labels()[i];
                prop_assert!(fit
                    .core_points()
                    .iter()
                    .any(|&p| graph.weight(i, p) as usize >= eps && fit.labels()[p] == label));
            }
        }
    }

    #[test]
    fn prop_eps_zero_counts_every_mutual_pair((data, k, _eps, min_pts) in dataset_and_params()) {
        let fit = Snn::new(k, 0, min_pts).fit(&data).unwrap();

        for i in 0..data.len() {
            let mutual = (0..data.len())
                .filter(|&j| j != i && fit.neighbors().are_mutual(i, j))
                .count();
            prop_assert_eq!(fit.density()[i], mutual);
        }
    }

    #[test]
    fn prop_deterministic((data, k, eps, min_pts) in dataset_and_params()) {
        let snn = Snn::new(k, eps, min_pts);
        prop_assert_eq!(snn.fit_predict(&data).unwrap(), snn.fit_predict(&data).unwrap());
    }

    #[test]
    fn prop_backends_agree((data, k, eps, min_pts) in dataset_and_params()) {
        let reference = Snn::new(k, eps, min_pts)
            .with_nn_algorithm(NnAlgorithm::BruteForce)
            .fit_predict(&data)
            .unwrap();

        let kd = Snn::new(k, eps, min_pts)
            .with_nn_algorithm(NnAlgorithm::KdTree)
            .fit_predict(&data)
            .unwrap();
        prop_assert_eq!(&kd, &reference);

        let union_find = Snn::new(k, eps, min_pts)
            .with_nn_algorithm(NnAlgorithm::BruteForce)
            .with_expansion(ExpansionStrategy::UnionFind)
            .fit_predict(&data)
            .unwrap();
        prop_assert_eq!(&union_find, &reference);
    }

    #[test]
    fn prop_min_pts_at_least_k_rejected(
        data in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), 10..20),
        k in 1usize..6,
        extra in 0usize..3,
    ) {
        let err = Snn::new(k, 1, k + extra).fit_predict(&data).unwrap_err();
        prop_assert!(err.is_invalid_parameter());
    }
}
