//! Time-stepped energy balance simulator for renewable grids with short-term
//! storage, hydrogen, backup generation, interconnectors, and direct air capture.

pub mod cli;
pub mod config;
pub mod error;
/// CSV readers and CSV/JSON writers.
pub mod io;
pub mod series;
/// Dispatch kernel, simulation loop, and summary metrics.
pub mod sim;
pub mod supply;
pub mod sweep;
pub mod units;
