use std::error::Error;
use std::io;
use std::sync::mpsc::{Receiver, RecvError, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::algorithm::Snapshot;
use crate::dataset::Dataset;
use crate::registry::{self, StartRequest};
use crate::runner::{Mode, Outcome, RunHandle, Runner, PUBLISH_DELAY};

/// How often a stepwise run is polled for reaching its next boundary.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One line of the command stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Command {
    /// Replaces the current dataset.
    Load(Dataset),
    /// Starts a run over the current dataset.
    Start(StartRequest),
    /// Unblocks a stepwise run waiting at an interval boundary.
    Advance,
    /// Stops the run in flight.
    Cancel,
}

/// One line of the reply stream.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Reply {
    Loaded { instances: usize },
    Snapshot(Snapshot),
    Done(Outcome),
    Error { message: String },
}

/// Drives the engine from a line-oriented command stream.
///
/// The same driver serves standard input and the websocket service; only
/// the input iterator and the reply writer differ.
pub struct Streamer<In, Out, Err>
where
    In: Iterator<Item = Result<String, Err>>,
    Out: FnMut(String),
{
    commands: In,
    write: Out,
    publish_delay: Duration,
}

impl<In, Out, Err> Streamer<In, Out, Err>
where
    In: Iterator<Item = Result<String, Err>>,
    Out: FnMut(String),
    Err: Error + 'static,
{
    pub fn new(commands: In, write: Out) -> Self {
        Self {
            commands,
            write,
            publish_delay: PUBLISH_DELAY,
        }
    }

    /// Overrides the publication delay of the runs this streamer spawns.
    pub fn publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = delay;
        self
    }

    /// Interprets commands until the input is exhausted.
    pub fn run(mut streamer: Streamer<In, Out, Err>) -> Result<(), Box<dyn Error>> {
        let mut dataset: Option<Dataset> = None;
        while let Some(input) = streamer.commands.next() {
            let line = input?;
            match serde_json::from_str(&line) {
                Ok(Command::Load(loaded)) => {
                    streamer.reply(&Reply::Loaded {
                        instances: loaded.len(),
                    })?;
                    dataset = Some(loaded);
                }
                Ok(Command::Start(request)) => match dataset.take() {
                    Some(data) => dataset = Some(streamer.drive_run(&request, data)?),
                    None => streamer.reply(&Reply::Error {
                        message: String::from("no dataset loaded"),
                    })?,
                },
                Ok(Command::Advance) | Ok(Command::Cancel) => {
                    // no run is waiting here; the signal is lost, not queued
                    debug!("advance or cancel with no run in flight");
                }
                Err(reason) => streamer.reply(&Reply::Error {
                    message: reason.to_string(),
                })?,
            }
        }
        Ok(())
    }

    /// Spawns one run and streams its snapshots; gives the dataset back
    /// once the run is over.
    fn drive_run(
        &mut self,
        request: &StartRequest,
        dataset: Dataset,
    ) -> Result<Dataset, Box<dyn Error>> {
        let algorithm = match registry::build(request, dataset.len()) {
            Ok(algorithm) => algorithm,
            Err(fault) => {
                self.reply(&Reply::Error {
                    message: fault.to_string(),
                })?;
                return Ok(dataset);
            }
        };
        let handle = Runner::new(request.mode())
            .publish_delay(self.publish_delay)
            .spawn(algorithm, dataset);
        match request.mode() {
            Mode::Continuous => {
                for snapshot in handle.snapshots().iter() {
                    self.reply(&Reply::Snapshot(snapshot))?;
                }
            }
            Mode::Stepwise => self.drive_stepwise(&handle)?,
        }
        let (dataset, outcome) = handle.join();
        self.reply(&Reply::Done(outcome))?;
        Ok(dataset)
    }

    /// Feeds a stepwise run: one advance command per interval, replying
    /// with the snapshot that interval publishes.
    fn drive_stepwise(&mut self, handle: &RunHandle) -> Result<(), Box<dyn Error>> {
        loop {
            while !handle.is_finished() && !handle.is_waiting() {
                thread::sleep(POLL_INTERVAL);
            }
            if handle.is_finished() {
                while let Ok(snapshot) = handle.snapshots().try_recv() {
                    self.reply(&Reply::Snapshot(snapshot))?;
                }
                return Ok(());
            }
            // the run is blocked at a boundary: the next command decides
            let line = match self.commands.next() {
                Some(input) => input?,
                None => {
                    // input closed with a run still waiting
                    warn!("command stream closed mid-run, cancelling");
                    handle.cancel();
                    return Ok(());
                }
            };
            match serde_json::from_str(&line) {
                Ok(Command::Advance) => {
                    if handle.advance() {
                        if let Ok(snapshot) = handle.snapshots().recv() {
                            self.reply(&Reply::Snapshot(snapshot))?;
                        }
                    }
                }
                Ok(Command::Cancel) => handle.cancel(),
                Ok(_) => self.reply(&Reply::Error {
                    message: String::from("a run is in flight"),
                })?,
                Err(reason) => self.reply(&Reply::Error {
                    message: reason.to_string(),
                })?,
            }
        }
    }

    fn reply(&mut self, reply: &Reply) -> Result<(), Box<dyn Error>> {
        let line = serde_json::to_string(reply)?;
        (self.write)(line);
        Ok(())
    }
}

/// Binds the engine to standard input and output.
pub fn stdio() -> (
    impl Iterator<Item = Result<String, io::Error>>,
    impl FnMut(String),
) {
    let commands = io::stdin().lines();
    let write = |reply: String| println!("{}", reply);
    (commands, write)
}

/// Binds the engine to a pair of channels. Used by the websocket service.
pub fn channels(
    commands: Receiver<String>,
    replies: Sender<String>,
) -> (
    impl Iterator<Item = Result<String, RecvError>>,
    impl FnMut(String),
) {
    let inputs = commands.into_iter().map(Ok::<String, RecvError>);
    let write = move |reply: String| {
        if replies.send(reply).is_err() {
            debug!("reply channel closed");
        }
    };
    (inputs, write)
}
