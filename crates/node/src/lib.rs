#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]

//! Node shell for Cerulean: configuration loading, logging initialization,
//! and Prometheus metrics export. The binary entry point that wires a
//! concrete chain, pool, and execution engine into the worker and network
//! lives outside this repository.

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{Config, LoggingConfig, MetricsConfig, NetworkSettings};
pub use logging::{LogFormat, LogLevel};
