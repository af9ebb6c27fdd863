//! SNN on two Gaussian blobs of different spread, plus a far outlier.
//!
//! Stands in for a loader/plotter: builds the matrix in memory, clusters it,
//! and prints the labels per point. Run with `RUST_LOG=debug` to see the
//! core points and the labels after core expansion.

use rand::prelude::*;
use rand_distr::Normal;
use snnclust::{Snn, NOISE};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut rng = StdRng::seed_from_u64(42);
    let tight = Normal::new(0.0f32, 0.5).unwrap();
    let wide = Normal::new(0.0f32, 1.5).unwrap();

    let mut data: Vec<Vec<f32>> = Vec::new();
    // Blob A around (0, 0.5)
    for _ in 0..30 {
        data.push(vec![tight.sample(&mut rng), 0.5 + tight.sample(&mut rng)]);
    }
    // Blob B around (10, 0.5), three times wider
    for _ in 0..30 {
        data.push(vec![10.0 + wide.sample(&mut rng), 0.5 + wide.sample(&mut rng)]);
    }
    // Outlier
    data.push(vec![5.0, 25.0]);

    let snn = Snn::new(20, 10, 5);
    let fit = match snn.fit(&data) {
        Ok(fit) => fit,
        Err(e) => {
            eprintln!("clustering failed: {e}");
            std::process::exit(1);
        }
    };

    println!(
        "=== SNN (k={}, eps={}, min_pts={}) ===",
        snn.k(),
        snn.eps(),
        snn.min_pts()
    );
    for (i, &label) in fit.labels().iter().enumerate() {
        let tag = if label == NOISE {
            "NOISE".to_string()
        } else {
            format!("cluster {}", label)
        };
        let kind = if fit.is_core(i) { "core" } else { "    " };
        println!(
            "  point {:2} ({:6.2}, {:6.2}) {} => {}",
            i, data[i][0], data[i][1], kind, tag
        );
    }
    println!(
        "\n{} clusters, {} noise points, {} core points, {} SNN links",
        fit.n_clusters(),
        fit.n_noise(),
        fit.core_points().len(),
        fit.graph().n_edges()
    );
}
