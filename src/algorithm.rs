use std::error::Error;
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, DatasetError, Series};

/// A published, renderable view of a run in progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Snapshot {
    /// The current partition of a clustering run.
    Clusters(Vec<Series>),
    /// The linear separator produced by a classification run.
    Separator {
        x_coefficient: i64,
        y_coefficient: i64,
        constant: i64,
    },
}

/// Faults rejected when an algorithm is configured.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    ZeroMaxIterations,
    ZeroUpdateInterval,
    MissingClusterCount,
    UnknownAlgorithm(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroMaxIterations => write!(f, "max iterations must be positive"),
            ConfigError::ZeroUpdateInterval => write!(f, "update interval must be positive"),
            ConfigError::MissingClusterCount => write!(f, "a cluster count is required"),
            ConfigError::UnknownAlgorithm(name) => write!(f, "unknown algorithm '{}'", name),
        }
    }
}

impl Error for ConfigError {}

/// Faults surfaced while an algorithm is running.
#[derive(Clone, Debug, PartialEq)]
pub enum AlgorithmError {
    /// The dataset holds fewer instances than the requested cluster count.
    TooFewInstances { requested: usize, available: usize },
    Dataset(DatasetError),
}

impl fmt::Display for AlgorithmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmError::TooFewInstances {
                requested,
                available,
            } => write!(
                f,
                "{} clusters requested but only {} instances available",
                requested, available
            ),
            AlgorithmError::Dataset(fault) => fault.fmt(f),
        }
    }
}

impl Error for AlgorithmError {}

impl From<DatasetError> for AlgorithmError {
    fn from(fault: DatasetError) -> Self {
        AlgorithmError::Dataset(fault)
    }
}

/// Contract shared by every algorithm the engine can run.
///
/// An algorithm only holds its own state (counters, centroids, output); the
/// dataset is lent to it one call at a time by the scheduler, which owns the
/// iteration loop and the publication pacing.
pub trait Algorithm: Send {
    /// Iteration cap for the whole run, fixed at construction.
    fn max_iterations(&self) -> usize;

    /// Number of iterations between two published snapshots, fixed at
    /// construction.
    fn update_interval(&self) -> usize;

    /// True while the run should keep iterating. An algorithm that has
    /// converged sets this false; the baselines always report true.
    fn to_continue(&self) -> bool;

    /// One-time setup before the first iteration.
    fn initialize(&mut self, _dataset: &mut Dataset) -> Result<(), AlgorithmError> {
        Ok(())
    }

    /// Executes exactly one iteration against the dataset. Never
    /// interruptible mid-phase.
    fn iterate(&mut self, dataset: &mut Dataset) -> Result<(), AlgorithmError>;

    /// Extracts the current renderable view.
    fn snapshot(&self, dataset: &Dataset) -> Snapshot;
}

/// Validates the two iteration counts shared by every algorithm.
pub(crate) fn check_counts(
    max_iterations: usize,
    update_interval: usize,
) -> Result<(), ConfigError> {
    if max_iterations == 0 {
        return Err(ConfigError::ZeroMaxIterations);
    }
    if update_interval == 0 {
        return Err(ConfigError::ZeroUpdateInterval);
    }
    Ok(())
}

/// Clamps a requested cluster count `k` for a dataset of `j` instances into
/// the closed range [2, 4].
///
/// The branch table is inherited as-is, including the non-monotonic
/// `k == 4, j == 3` case that wins over the general upper clamp.
pub fn clamp_cluster_count(k: usize, j: usize) -> usize {
    if k < 2 || j <= 2 {
        2
    } else if k == 4 && j == 3 {
        3
    } else if k > 4 {
        4
    } else {
        k
    }
}

/// A generator seeded for reproducible runs, or from entropy.
pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
