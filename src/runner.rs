use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;

use crate::algorithm::{Algorithm, Snapshot};
use crate::dataset::Dataset;
use crate::signal::{AdvanceSignal, Wait};

/// Pause observed before every published snapshot, so progress stays
/// visible on the rendering side.
pub const PUBLISH_DELAY: Duration = Duration::from_secs(1);

/// Pacing mode of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Run to completion, pausing only for the publication delay.
    Continuous,
    /// Block at every interval boundary until an advance signal arrives.
    Stepwise,
}

impl Mode {
    /// Maps the boolean run configuration flag to a mode.
    pub fn from_continuous(continuous: bool) -> Self {
        if continuous {
            Mode::Continuous
        } else {
            Mode::Stepwise
        }
    }
}

/// Terminal report of a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    /// The algorithm stopped moving before the iteration cap.
    Converged { iterations: usize },
    /// The iteration cap was reached while the algorithm was still moving.
    Exhausted { iterations: usize },
    /// The run was stopped early; the dataset keeps its last committed
    /// state.
    Cancelled { iterations: usize },
    /// A configuration or dataset fault surfaced mid-run.
    Failed { reason: String },
}

/// Dual-mode scheduler: runs one algorithm instance on a background thread
/// and hands snapshots to the controlling side over a channel.
///
/// The dataset moves into the run and comes back from [`RunHandle::join`],
/// so nothing else can mutate it while the run is in flight.
pub struct Runner {
    mode: Mode,
    publish_delay: Duration,
}

impl Runner {
    pub fn new(mode: Mode) -> Self {
        Runner {
            mode,
            publish_delay: PUBLISH_DELAY,
        }
    }

    /// Overrides the publication delay. Tests run dry with a zero delay.
    pub fn publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = delay;
        self
    }

    /// Starts the run on a background thread.
    pub fn spawn(self, mut algorithm: Box<dyn Algorithm>, mut dataset: Dataset) -> RunHandle {
        let signal = Arc::new(AdvanceSignal::new());
        let (producer, snapshots) = channel();
        let worker_signal = signal.clone();
        let worker = thread::spawn(move || {
            let outcome = drive(
                algorithm.as_mut(),
                &mut dataset,
                self.mode,
                self.publish_delay,
                &worker_signal,
                &producer,
            );
            (dataset, outcome)
        });
        RunHandle {
            signal,
            snapshots,
            worker,
        }
    }
}

/// Handle held by the controlling thread while a run is in flight.
pub struct RunHandle {
    signal: Arc<AdvanceSignal>,
    snapshots: Receiver<Snapshot>,
    worker: JoinHandle<(Dataset, Outcome)>,
}

impl RunHandle {
    /// Delivers one advance signal. Returns `false` when no run was
    /// waiting: the signal is lost, not queued.
    pub fn advance(&self) -> bool {
        self.signal.advance()
    }

    /// Requests termination; honored between iterations or at a blocked
    /// interval boundary.
    pub fn cancel(&self) {
        self.signal.cancel()
    }

    /// Receiving end of every published snapshot, in publication order.
    pub fn snapshots(&self) -> &Receiver<Snapshot> {
        &self.snapshots
    }

    /// True once the background thread has terminated.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// True while the run is blocked at a stepwise interval boundary.
    pub(crate) fn is_waiting(&self) -> bool {
        self.signal.is_waiting()
    }

    /// Waits for the run to end and gives the dataset back.
    pub fn join(self) -> (Dataset, Outcome) {
        self.worker.join().expect("algorithm thread panicked")
    }
}

/// The iteration loop shared by every algorithm.
fn drive(
    algorithm: &mut dyn Algorithm,
    dataset: &mut Dataset,
    mode: Mode,
    delay: Duration,
    signal: &AdvanceSignal,
    producer: &Sender<Snapshot>,
) -> Outcome {
    if let Err(fault) = algorithm.initialize(dataset) {
        warn!("run aborted during initialization: {}", fault);
        return Outcome::Failed {
            reason: fault.to_string(),
        };
    }
    let max_iterations = algorithm.max_iterations();
    let update_interval = algorithm.update_interval();
    info!(
        "run started: max_iterations={}, update_interval={}, mode={:?}",
        max_iterations, update_interval, mode
    );

    let mut iterations = 0;
    let mut interval_counter = 0;
    while iterations < max_iterations && algorithm.to_continue() {
        if signal.is_cancelled() {
            warn!("run cancelled after {} iterations", iterations);
            return Outcome::Cancelled { iterations };
        }
        if let Err(fault) = algorithm.iterate(dataset) {
            warn!("run failed at iteration {}: {}", iterations, fault);
            return Outcome::Failed {
                reason: fault.to_string(),
            };
        }
        iterations += 1;
        interval_counter += 1;

        // the terminal iteration publishes unconditionally, but only once
        // even when it lands on an interval boundary
        let terminal = iterations == max_iterations || !algorithm.to_continue();
        if interval_counter == update_interval || terminal {
            interval_counter = 0;
            if mode == Mode::Stepwise && signal.wait() == Wait::Cancelled {
                warn!("stepwise wait cancelled after {} iterations", iterations);
                return Outcome::Cancelled { iterations };
            }
            thread::sleep(delay);
            publish(algorithm.snapshot(dataset), producer);
            debug!("iteration {}: snapshot published", iterations);
        }
    }

    if algorithm.to_continue() {
        info!("iteration cap reached after {} iterations", iterations);
        Outcome::Exhausted { iterations }
    } else {
        info!("converged after {} iterations", iterations);
        Outcome::Converged { iterations }
    }
}

fn publish(snapshot: Snapshot, producer: &Sender<Snapshot>) {
    if producer.send(snapshot).is_err() {
        debug!("snapshot receiver dropped, nobody is rendering");
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use crate::dataset::tests::sample_dataset;
    use crate::kmeans::KMeansClusterer;
    use crate::random::{RandomClassifier, RandomClusterer};
    use crate::runner::*;

    const RECV_PATIENCE: Duration = Duration::from_secs(5);

    fn runner(mode: Mode) -> Runner {
        Runner::new(mode).publish_delay(Duration::ZERO)
    }

    fn deliver_advance(handle: &RunHandle) {
        while !handle.advance() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Drains a stepwise run to completion, one advance per snapshot.
    fn drain_stepwise(handle: &RunHandle, expected: usize) -> Vec<Snapshot> {
        let mut snapshots = vec![];
        for _ in 0..expected {
            deliver_advance(handle);
            snapshots.push(handle.snapshots().recv_timeout(RECV_PATIENCE).unwrap());
        }
        snapshots
    }

    #[test]
    fn test_continuous_snapshot_count_with_remainder() {
        // 5 iterations published every 2: boundaries at 2 and 4 plus the
        // terminal iteration
        let algorithm = RandomClusterer::new(5, 2, 2, 4, Some(1)).unwrap();
        let handle = runner(Mode::Continuous).spawn(Box::new(algorithm), sample_dataset());
        let snapshots: Vec<Snapshot> = handle.snapshots().iter().collect();
        assert_eq!(3, snapshots.len());
        let (_, outcome) = handle.join();
        assert_eq!(Outcome::Exhausted { iterations: 5 }, outcome);
    }

    #[test]
    fn test_continuous_snapshot_count_exact_multiple() {
        let algorithm = RandomClusterer::new(4, 2, 2, 4, Some(1)).unwrap();
        let handle = runner(Mode::Continuous).spawn(Box::new(algorithm), sample_dataset());
        let snapshots: Vec<Snapshot> = handle.snapshots().iter().collect();
        // the terminal iteration lands on a boundary and publishes once
        assert_eq!(2, snapshots.len());
        let (_, outcome) = handle.join();
        assert_eq!(Outcome::Exhausted { iterations: 4 }, outcome);
    }

    #[test]
    fn test_single_iteration_single_snapshot() {
        let dataset = sample_dataset();
        let algorithm = KMeansClusterer::new(1, 1, 2, dataset.len(), Some(7)).unwrap();
        let handle = runner(Mode::Continuous).spawn(Box::new(algorithm), dataset);
        let snapshots: Vec<Snapshot> = handle.snapshots().iter().collect();
        // the first snapshot is also the terminal one
        assert_eq!(1, snapshots.len());
        let (dataset, outcome) = handle.join();
        assert_eq!(Outcome::Exhausted { iterations: 1 }, outcome);
        assert!(dataset
            .labels()
            .values()
            .all(|label| label == "0" || label == "1"));
    }

    #[test]
    fn test_kmeans_converges_and_publishes_terminal_snapshot() {
        let dataset = sample_dataset();
        let algorithm = KMeansClusterer::new(500, 1, 2, dataset.len(), Some(7)).unwrap();
        let handle = runner(Mode::Continuous).spawn(Box::new(algorithm), dataset);
        let snapshots: Vec<Snapshot> = handle.snapshots().iter().collect();
        assert!(!snapshots.is_empty());
        let (dataset, outcome) = handle.join();
        let iterations = match outcome {
            Outcome::Converged { iterations } => iterations,
            other => panic!("expected convergence, got {:?}", other),
        };
        assert!(iterations < 500);
        // the last snapshot reflects the final dataset state
        assert_eq!(
            Snapshot::Clusters(dataset.series()),
            *snapshots.last().unwrap()
        );
    }

    #[test]
    fn test_stepwise_equals_continuous_for_kmeans() {
        let continuous =
            KMeansClusterer::new(40, 3, 2, sample_dataset().len(), Some(42)).unwrap();
        let handle = runner(Mode::Continuous).spawn(Box::new(continuous), sample_dataset());
        let continuous_snapshots: Vec<Snapshot> = handle.snapshots().iter().collect();
        let (continuous_dataset, continuous_outcome) = handle.join();

        let stepwise = KMeansClusterer::new(40, 3, 2, sample_dataset().len(), Some(42)).unwrap();
        let handle = runner(Mode::Stepwise).spawn(Box::new(stepwise), sample_dataset());
        let stepwise_snapshots = drain_stepwise(&handle, continuous_snapshots.len());
        let (stepwise_dataset, stepwise_outcome) = handle.join();

        assert_eq!(continuous_snapshots, stepwise_snapshots);
        assert_eq!(continuous_dataset.labels(), stepwise_dataset.labels());
        assert_eq!(continuous_outcome, stepwise_outcome);
    }

    #[test]
    fn test_stepwise_equals_continuous_for_classifier() {
        let continuous = RandomClassifier::new(7, 3, Some(9)).unwrap();
        let handle = runner(Mode::Continuous).spawn(Box::new(continuous), sample_dataset());
        let continuous_snapshots: Vec<Snapshot> = handle.snapshots().iter().collect();
        let (_, outcome) = handle.join();
        assert_eq!(Outcome::Exhausted { iterations: 7 }, outcome);
        // ceil(7 / 3) intervals
        assert_eq!(3, continuous_snapshots.len());

        let stepwise = RandomClassifier::new(7, 3, Some(9)).unwrap();
        let handle = runner(Mode::Stepwise).spawn(Box::new(stepwise), sample_dataset());
        let stepwise_snapshots = drain_stepwise(&handle, 3);
        let (_, outcome) = handle.join();
        assert_eq!(Outcome::Exhausted { iterations: 7 }, outcome);
        assert_eq!(continuous_snapshots, stepwise_snapshots);
    }

    #[test]
    fn test_advance_after_completion_is_lost() {
        let algorithm = RandomClusterer::new(2, 1, 2, 4, Some(1)).unwrap();
        let handle = runner(Mode::Continuous).spawn(Box::new(algorithm), sample_dataset());
        let _: Vec<Snapshot> = handle.snapshots().iter().collect();
        assert!(!handle.advance());
        let (_, outcome) = handle.join();
        assert_eq!(Outcome::Exhausted { iterations: 2 }, outcome);
    }

    #[test]
    fn test_cancel_at_stepwise_boundary() {
        let algorithm = RandomClusterer::new(10, 2, 2, 4, Some(1)).unwrap();
        let handle = runner(Mode::Stepwise).spawn(Box::new(algorithm), sample_dataset());
        while !handle.is_waiting() {
            thread::sleep(Duration::from_millis(1));
        }
        handle.cancel();
        let (dataset, outcome) = handle.join();
        assert_eq!(Outcome::Cancelled { iterations: 2 }, outcome);
        // the dataset keeps its last committed relabeling
        assert!(dataset
            .labels()
            .values()
            .all(|label| label == "1" || label == "2"));
    }

    #[test]
    fn test_initialization_fault_reports_failure() {
        // the clamp keeps 3 clusters for j=3, but the dataset only has 2
        let dataset = Dataset::from_records(vec![
            (
                "@a".to_string(),
                crate::dataset::UNLABELED.to_string(),
                crate::space::Point::new(0., 0.),
            ),
            (
                "@b".to_string(),
                crate::dataset::UNLABELED.to_string(),
                crate::space::Point::new(1., 1.),
            ),
        ])
        .unwrap();
        let algorithm = KMeansClusterer::new(5, 1, 3, 3, Some(1)).unwrap();
        let handle = runner(Mode::Continuous).spawn(Box::new(algorithm), dataset);
        let (_, outcome) = handle.join();
        match outcome {
            Outcome::Failed { reason } => assert!(reason.contains("2 instances")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
