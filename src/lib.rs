pub mod space;
pub mod dataset;
pub mod algorithm;
pub mod kmeans;
pub mod random;
pub mod registry;
pub mod runner;
pub mod streamer;
pub mod service;

mod signal;
