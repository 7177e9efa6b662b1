use serde::{Deserialize, Serialize};

use crate::algorithm::{Algorithm, ConfigError};
use crate::kmeans::KMeansClusterer;
use crate::random::{RandomClassifier, RandomClusterer};
use crate::runner::Mode;

/// A run request: which algorithm to run and how to pace it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    pub algorithm: String,
    pub max_iterations: usize,
    pub update_interval: usize,
    /// True runs to completion on a timer, false blocks at every interval
    /// for an advance signal.
    #[serde(default = "continuous_default")]
    pub continuous: bool,
    /// Required by the clustering algorithms, ignored by the classifier.
    #[serde(default)]
    pub clusters: Option<usize>,
    /// Fixes the random generator for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn continuous_default() -> bool {
    true
}

impl StartRequest {
    pub fn mode(&self) -> Mode {
        Mode::from_continuous(self.continuous)
    }
}

type Factory = fn(&StartRequest, usize) -> Result<Box<dyn Algorithm>, ConfigError>;

/// The algorithms the engine can resolve by identifier.
const ALGORITHMS: &[(&str, Factory)] = &[
    ("kmeans", build_kmeans),
    ("random-clusterer", build_random_clusterer),
    ("random-classifier", build_random_classifier),
];

/// Resolves a start request against a dataset of `instances` instances.
pub fn build(request: &StartRequest, instances: usize) -> Result<Box<dyn Algorithm>, ConfigError> {
    let factory = ALGORITHMS
        .iter()
        .find(|(name, _)| *name == request.algorithm)
        .map(|(_, factory)| factory)
        .ok_or_else(|| ConfigError::UnknownAlgorithm(request.algorithm.clone()))?;
    factory(request, instances)
}

/// Identifiers of every registered algorithm.
pub fn names() -> Vec<&'static str> {
    ALGORITHMS.iter().map(|(name, _)| *name).collect()
}

fn build_kmeans(request: &StartRequest, instances: usize) -> Result<Box<dyn Algorithm>, ConfigError> {
    let clusters = request.clusters.ok_or(ConfigError::MissingClusterCount)?;
    Ok(Box::new(KMeansClusterer::new(
        request.max_iterations,
        request.update_interval,
        clusters,
        instances,
        request.seed,
    )?))
}

fn build_random_clusterer(
    request: &StartRequest,
    instances: usize,
) -> Result<Box<dyn Algorithm>, ConfigError> {
    let clusters = request.clusters.ok_or(ConfigError::MissingClusterCount)?;
    Ok(Box::new(RandomClusterer::new(
        request.max_iterations,
        request.update_interval,
        clusters,
        instances,
        request.seed,
    )?))
}

fn build_random_classifier(
    request: &StartRequest,
    _instances: usize,
) -> Result<Box<dyn Algorithm>, ConfigError> {
    Ok(Box::new(RandomClassifier::new(
        request.max_iterations,
        request.update_interval,
        request.seed,
    )?))
}
