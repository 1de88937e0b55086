//! Vitrine Benchmark Library
//!
//! Data generators and store setup shared by the benchmarks.

pub mod data_gen;
pub mod stores;
