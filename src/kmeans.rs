use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::algorithm::{
    check_counts, clamp_cluster_count, seeded_rng, Algorithm, AlgorithmError, ConfigError,
    Snapshot,
};
use crate::dataset::Dataset;
use crate::space::{euclid_dist, mean, Point};

/// K-means clustering over a labeled 2-D dataset.
///
/// Every iteration relabels each instance with the index of its nearest
/// centroid, then recomputes the centroids; the run converges once no
/// centroid moves between two iterations.
pub struct KMeansClusterer {
    clusters: usize,
    max_iterations: usize,
    update_interval: usize,
    to_continue: bool,
    centroids: Vec<Point>,
    rng: StdRng,
}

impl KMeansClusterer {
    /// Builds a clusterer for a dataset of `instances` instances. The
    /// requested cluster count is clamped into [2, 4]; zero iteration
    /// counts are rejected.
    pub fn new(
        max_iterations: usize,
        update_interval: usize,
        clusters: usize,
        instances: usize,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        check_counts(max_iterations, update_interval)?;
        Ok(KMeansClusterer {
            clusters: clamp_cluster_count(clusters, instances),
            max_iterations,
            update_interval,
            to_continue: false,
            centroids: vec![],
            rng: seeded_rng(seed),
        })
    }

    /// The clamped cluster count.
    pub fn clusters(&self) -> usize {
        self.clusters
    }

    /// Relabels every instance with the index of its nearest centroid.
    fn assign_labels(&self, dataset: &mut Dataset) -> Result<(), AlgorithmError> {
        let assignments: Vec<(String, usize)> = dataset
            .locations()
            .iter()
            .map(|(name, location)| (name.clone(), self.nearest_centroid(location)))
            .collect();
        for (name, cluster) in assignments {
            dataset.update_label(&name, cluster.to_string())?;
        }
        Ok(())
    }

    /// Index of the nearest centroid; ties keep the earliest index.
    fn nearest_centroid(&self, location: &Point) -> usize {
        let mut min_distance = f64::MAX;
        let mut min_index = 0;
        for (i, centroid) in self.centroids.iter().enumerate() {
            let distance = euclid_dist(centroid, location);
            if distance < min_distance {
                min_distance = distance;
                min_index = i;
            }
        }
        min_index
    }

    /// Recomputes every centroid, recording whether any of them moved.
    fn recompute_centroids(&mut self, dataset: &Dataset) {
        self.to_continue = false;
        for i in 0..self.clusters {
            let tag = i.to_string();
            let members = dataset
                .labels()
                .iter()
                .filter(|(_, label)| **label == tag)
                .map(|(name, _)| &dataset.locations()[name]);
            // an empty cluster keeps its previous centroid for this iteration
            if let Some(centroid) = mean(members) {
                if centroid != self.centroids[i] {
                    self.centroids[i] = centroid;
                    self.to_continue = true;
                }
            }
        }
    }
}

impl Algorithm for KMeansClusterer {
    fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn update_interval(&self) -> usize {
        self.update_interval
    }

    fn to_continue(&self) -> bool {
        self.to_continue
    }

    /// Seeds the centroids with the locations of distinct instances chosen
    /// uniformly at random without replacement.
    fn initialize(&mut self, dataset: &mut Dataset) -> Result<(), AlgorithmError> {
        if dataset.len() < self.clusters {
            return Err(AlgorithmError::TooFewInstances {
                requested: self.clusters,
                available: dataset.len(),
            });
        }
        let names: Vec<&String> = dataset.labels().keys().collect();
        self.centroids = names
            .choose_multiple(&mut self.rng, self.clusters)
            .map(|name| dataset.locations()[*name])
            .collect();
        self.to_continue = true;
        Ok(())
    }

    fn iterate(&mut self, dataset: &mut Dataset) -> Result<(), AlgorithmError> {
        self.assign_labels(dataset)?;
        self.recompute_centroids(dataset);
        Ok(())
    }

    fn snapshot(&self, dataset: &Dataset) -> Snapshot {
        Snapshot::Clusters(dataset.series())
    }
}
