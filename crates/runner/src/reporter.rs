//! Spec result reporting.
//!
//! Runners report through a [`Reporter`]. [`ColoredFailureReporter`] sits in
//! front of another reporter and prints every failed expectation in full (name,
//! message, stack) before forwarding the result, so failures are readable in CI
//! logs without changing what the wrapped reporter does.

use std::io::{self, Write};

use console::Style;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    Red,
    Yellow,
    None,
}

/// Wrap `text` in the ANSI codes for `color`. Always styled, even when stdout
/// is not a terminal: CI log viewers render the codes.
pub fn colored(color: Color, text: &str) -> String {
    let style = match color {
        Color::Green => Style::new().green(),
        Color::Red => Style::new().red(),
        Color::Yellow => Style::new().yellow(),
        Color::None => return text.to_string(),
    };
    style.force_styling(true).apply_to(text).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecStatus {
    Passed,
    Failed,
    Pending,
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedExpectation {
    pub message: String,
    #[serde(default)]
    pub stack: String,
}

/// Outcome of one spec, in the shape JS runners emit (`fullName`,
/// `failedExpectations`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecResult {
    pub full_name: String,
    pub status: SpecStatus,
    #[serde(default)]
    pub failed_expectations: Vec<FailedExpectation>,
}

impl SpecResult {
    pub fn passed(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            status: SpecStatus::Passed,
            failed_expectations: Vec::new(),
        }
    }

    pub fn failed(full_name: impl Into<String>, failed: Vec<FailedExpectation>) -> Self {
        Self {
            full_name: full_name.into(),
            status: SpecStatus::Failed,
            failed_expectations: failed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.pending
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Receives spec results as a run progresses.
pub trait Reporter {
    fn spec_done(&mut self, result: &SpecResult);

    /// Called once after the last spec.
    fn finished(&mut self) -> RunSummary;
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn spec_done(&mut self, result: &SpecResult) {
        (**self).spec_done(result)
    }

    fn finished(&mut self) -> RunSummary {
        (**self).finished()
    }
}

/// Counts results and prints a one-line summary at the end.
#[derive(Debug)]
pub struct SummaryReporter<W = io::Stdout> {
    out: W,
    summary: RunSummary,
}

impl SummaryReporter {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> SummaryReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            summary: RunSummary::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for SummaryReporter<W> {
    fn spec_done(&mut self, result: &SpecResult) {
        match result.status {
            SpecStatus::Passed => self.summary.passed += 1,
            SpecStatus::Failed => self.summary.failed += 1,
            SpecStatus::Pending | SpecStatus::Excluded => self.summary.pending += 1,
        }
    }

    fn finished(&mut self) -> RunSummary {
        let s = self.summary;
        let color = if s.success() { Color::Green } else { Color::Red };
        let mut line = format!("{} specs, {} failures", s.total(), s.failed);
        if s.pending > 0 {
            line.push_str(&format!(", {} pending", s.pending));
        }
        if let Err(e) = writeln!(self.out, "{}", colored(color, &line)) {
            warn!(error = %e, "failed to write run summary");
        }
        s
    }
}

/// Decorates a reporter with full failure output.
#[derive(Debug)]
pub struct ColoredFailureReporter<R, W = io::Stdout> {
    inner: R,
    out: W,
}

impl<R: Reporter> ColoredFailureReporter<R> {
    pub fn stdout(inner: R) -> Self {
        Self::new(inner, io::stdout())
    }
}

impl<R: Reporter, W: Write> ColoredFailureReporter<R, W> {
    pub fn new(inner: R, out: W) -> Self {
        Self { inner, out }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_parts(self) -> (R, W) {
        (self.inner, self.out)
    }

    fn write_failures(&mut self, result: &SpecResult) -> io::Result<()> {
        writeln!(self.out, "\n")?;
        for expectation in &result.failed_expectations {
            writeln!(self.out, "{}", result.full_name)?;
            writeln!(self.out, "{}", colored(Color::Red, &expectation.message))?;
            writeln!(self.out, "{}", colored(Color::Red, &expectation.stack))?;
            writeln!(self.out, "\n")?;
        }
        self.out.flush()
    }
}

impl<R: Reporter, W: Write> Reporter for ColoredFailureReporter<R, W> {
    fn spec_done(&mut self, result: &SpecResult) {
        if result.status == SpecStatus::Failed {
            if let Err(e) = self.write_failures(result) {
                warn!(spec = %result.full_name, error = %e, "failed to write failure report");
            }
        }
        self.inner.spec_done(result);
    }

    fn finished(&mut self) -> RunSummary {
        self.inner.finished()
    }
}
