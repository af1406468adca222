pub mod config;
pub mod curve;
pub mod metrics;
pub mod run;
pub mod schedule;
pub mod sink;
pub mod synth;
pub mod wave;
