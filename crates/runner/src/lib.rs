//! Test-runner glue: spec discovery, failure reporting, sync adapters.

pub mod config;
pub mod reporter;
pub mod syncify;

pub use config::{RunnerConfig, RunnerError};
pub use reporter::{
    Color, ColoredFailureReporter, FailedExpectation, Reporter, RunSummary, SpecResult,
    SpecStatus, SummaryReporter, colored,
};
pub use syncify::syncify;
