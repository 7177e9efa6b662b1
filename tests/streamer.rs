use std::io;
use std::time::Duration;

use serde_json::json;

use paced_data::streamer::Streamer;

use utilities::{assert_blobs_recovered, assert_replies, gaussian_dataset};

fn start_line(continuous: bool) -> String {
    json!({
        "start": {
            "algorithm": "kmeans",
            "max_iterations": 200,
            "update_interval": 5,
            "continuous": continuous,
            "clusters": 2,
            "seed": 42,
        }
    })
    .to_string()
}

fn run_protocol(commands: Vec<String>) -> Vec<String> {
    let points = commands.into_iter().map(Ok::<String, io::Error>);
    let mut result: Vec<String> = vec![];
    let write = |reply: String| result.push(reply);
    let streamer = Streamer::new(points, write).publish_delay(Duration::ZERO);
    Streamer::run(streamer).unwrap();
    result
}

#[test]
fn test_streamer() {
    let dataset = gaussian_dataset(100);
    let load = json!({ "load": dataset }).to_string();
    let result = run_protocol(vec![load, start_line(true)]);
    assert_replies(&result, 100);
    assert!(result.last().unwrap().contains("converged"));
    assert_blobs_recovered(&result[result.len() - 2]);
}

#[test]
fn test_stepwise_streamer_matches_continuous() {
    let dataset = gaussian_dataset(100);
    let load = json!({ "load": dataset }).to_string();
    let continuous = run_protocol(vec![load.clone(), start_line(true)]);

    let advance = json!("advance").to_string();
    let mut commands = vec![load, start_line(false)];
    commands.extend(std::iter::repeat(advance).take(200));
    let stepwise = run_protocol(commands);

    assert_eq!(continuous, stepwise);
}
