use std::error::Error;
use std::time::Duration;

use clap::Parser;

use paced_data::service::service;
use paced_data::streamer::{stdio, Streamer};

/// Iterative algorithm engine for labeled 2-D datasets, driven by JSON
/// command lines over stdio or websockets.
#[derive(Parser)]
#[clap(author, version, about)]
struct Args {
    /// Serve the engine over websockets instead of stdio.
    #[clap(long)]
    service: bool,
    /// Address the websocket service binds to.
    #[clap(long, default_value = "127.0.0.1:9001")]
    bind: String,
    /// Pause before each published snapshot, in milliseconds.
    #[clap(long, default_value_t = 1000)]
    publish_delay_ms: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let delay = Duration::from_millis(args.publish_delay_ms);
    if args.service {
        let (commands, write) = service(&args.bind);
        let streamer = Streamer::new(commands, write).publish_delay(delay);
        Streamer::run(streamer)
    } else {
        let (commands, write) = stdio();
        let streamer = Streamer::new(commands, write).publish_delay(delay);
        Streamer::run(streamer)
    }
}
