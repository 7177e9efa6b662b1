//! Baseline algorithms producing random output.
//!
//! They exist to exercise the scheduler's pacing independently of any real
//! algorithmic correctness: neither of them ever converges on its own, so a
//! run stops exactly at the iteration cap (or when cancelled).

use rand::rngs::StdRng;
use rand::Rng;

use crate::algorithm::{
    check_counts, clamp_cluster_count, seeded_rng, Algorithm, AlgorithmError, ConfigError,
    Snapshot,
};
use crate::dataset::Dataset;

/// Relabels every instance with a uniformly random cluster index in
/// `[1, clusters]` on each iteration.
pub struct RandomClusterer {
    clusters: usize,
    max_iterations: usize,
    update_interval: usize,
    rng: StdRng,
}

impl RandomClusterer {
    /// Builds a baseline clusterer; the cluster count is clamped the same
    /// way as for the real one.
    pub fn new(
        max_iterations: usize,
        update_interval: usize,
        clusters: usize,
        instances: usize,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        check_counts(max_iterations, update_interval)?;
        Ok(RandomClusterer {
            clusters: clamp_cluster_count(clusters, instances),
            max_iterations,
            update_interval,
            rng: seeded_rng(seed),
        })
    }

    /// The clamped cluster count.
    pub fn clusters(&self) -> usize {
        self.clusters
    }
}

impl Algorithm for RandomClusterer {
    fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn update_interval(&self) -> usize {
        self.update_interval
    }

    fn to_continue(&self) -> bool {
        true
    }

    fn iterate(&mut self, dataset: &mut Dataset) -> Result<(), AlgorithmError> {
        let names: Vec<String> = dataset.labels().keys().cloned().collect();
        for name in names {
            let cluster = self.rng.gen_range(1..=self.clusters);
            dataset.update_label(&name, cluster.to_string())?;
        }
        Ok(())
    }

    fn snapshot(&self, dataset: &Dataset) -> Snapshot {
        Snapshot::Clusters(dataset.series())
    }
}

/// Emits a random 2-D linear separator on each iteration: the x coefficient
/// is uniform in -10..=10, the y coefficient is fixed at 10 and the
/// constant is uniform in 0..=10.
pub struct RandomClassifier {
    max_iterations: usize,
    update_interval: usize,
    separator: (i64, i64, i64),
    rng: StdRng,
}

impl RandomClassifier {
    pub fn new(
        max_iterations: usize,
        update_interval: usize,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        check_counts(max_iterations, update_interval)?;
        Ok(RandomClassifier {
            max_iterations,
            update_interval,
            separator: (0, 10, 0),
            rng: seeded_rng(seed),
        })
    }
}

impl Algorithm for RandomClassifier {
    fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn update_interval(&self) -> usize {
        self.update_interval
    }

    fn to_continue(&self) -> bool {
        true
    }

    fn iterate(&mut self, _dataset: &mut Dataset) -> Result<(), AlgorithmError> {
        let x_coefficient = -(((2. * self.rng.gen::<f64>() - 1.) * 10.).round() as i64);
        let y_coefficient = 10;
        let constant: i64 = self.rng.gen_range(0..=10);
        self.separator = (x_coefficient, y_coefficient, constant);
        Ok(())
    }

    fn snapshot(&self, _dataset: &Dataset) -> Snapshot {
        let (x_coefficient, y_coefficient, constant) = self.separator;
        Snapshot::Separator {
            x_coefficient,
            y_coefficient,
            constant,
        }
    }
}
