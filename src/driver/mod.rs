//! Measurement protocol shared by every backend.
//!
//! Each case moves through [`CaseState`]: set up (lazily creating the
//! runtimes it needs), one untimed warm-up invocation, the timed repetitions,
//! and teardown. Invocation failures fail the case and the series goes on;
//! setup failures abort the series.

use std::{fmt, time::Duration, time::Instant};

use log::{debug, info, warn};
use thiserror::Error;

use crate::backend::{
    BackendKind, BenchmarkCase, InvocationBackend, NativeEntryBackend, VmDirectBackend,
    VmGuestBackend,
};
use crate::error::{InvocationError, SetupError};
use crate::runtime::Runtimes;

pub mod config;
pub mod contention;
pub mod mode;

pub use config::{DriverConfig, Repetition};
pub use mode::ExecMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Uninitialized,
    SetUp,
    WarmedUp,
    Timing,
    TornDown,
}

impl CaseState {
    /// Forward steps of the protocol, plus teardown from any live state.
    pub fn can_transition_to(self, next: CaseState) -> bool {
        use CaseState::*;
        matches!(
            (self, next),
            (Uninitialized, SetUp)
                | (SetUp, WarmedUp)
                | (WarmedUp, Timing)
                | (SetUp | WarmedUp | Timing, TornDown)
        )
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaseState::Uninitialized => "uninitialized",
            CaseState::SetUp => "set-up",
            CaseState::WarmedUp => "warmed-up",
            CaseState::Timing => "timing",
            CaseState::TornDown => "torn-down",
        };
        write!(f, "{}", s)
    }
}

/// Where an invocation error struck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    WarmUp,
    Timing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Prepare => "prepare",
            Stage::WarmUp => "warm-up",
            Stage::Timing => "timing",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum CaseError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("{stage} failed: {error}")]
    Invocation {
        stage: Stage,
        #[source]
        error: InvocationError,
    },
    #[error("illegal case transition {from} -> {to}")]
    IllegalTransition { from: CaseState, to: CaseState },
}

#[derive(Debug, Clone)]
pub enum CaseOutcome {
    Completed {
        samples: Vec<Duration>,
        last_result: f64,
    },
    Failed {
        stage: Stage,
        error: InvocationError,
    },
}

#[derive(Debug, Clone)]
pub struct CaseReport {
    pub case: BenchmarkCase,
    pub outcome: CaseOutcome,
    pub final_state: CaseState,
}

impl CaseReport {
    pub fn last_result(&self) -> Option<f64> {
        match &self.outcome {
            CaseOutcome::Completed { last_result, .. } => Some(*last_result),
            CaseOutcome::Failed { .. } => None,
        }
    }

    pub fn samples(&self) -> &[Duration] {
        match &self.outcome {
            CaseOutcome::Completed { samples, .. } => samples,
            CaseOutcome::Failed { .. } => &[],
        }
    }

    pub fn mean(&self) -> Option<Duration> {
        let samples = self.samples();
        if samples.is_empty() {
            return None;
        }
        let total: Duration = samples.iter().sum();
        Some(total / samples.len() as u32)
    }
}

/// Tracks one case through the protocol.
#[derive(Debug)]
struct CaseTracker {
    state: CaseState,
}

impl CaseTracker {
    fn new() -> Self {
        Self {
            state: CaseState::Uninitialized,
        }
    }

    fn advance(&mut self, next: CaseState) -> Result<(), CaseError> {
        if !self.state.can_transition_to(next) {
            return Err(CaseError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("case {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

pub struct BenchmarkDriver {
    config: DriverConfig,
    runtimes: Runtimes,
    native: NativeEntryBackend,
    direct: VmDirectBackend,
    guest: VmGuestBackend,
}

impl BenchmarkDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            runtimes: Runtimes::with_context_config(config.context.clone()),
            native: NativeEntryBackend::new(),
            direct: VmDirectBackend::new(config.vm.clone()),
            guest: VmGuestBackend::new(config.vm.clone(), config.context.clone()),
            config,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn runtimes(&self) -> &Runtimes {
        &self.runtimes
    }

    fn parts(&mut self, kind: BackendKind) -> (&mut Runtimes, &mut dyn InvocationBackend) {
        let backend: &mut dyn InvocationBackend = match kind {
            BackendKind::NativeEntry => &mut self.native,
            BackendKind::VmDirect => &mut self.direct,
            BackendKind::VmGuest => &mut self.guest,
        };
        (&mut self.runtimes, backend)
    }

    /// Runs one case to completion. Only setup failures are returned as
    /// errors; invocation failures are recorded in the report.
    pub fn run_case(&mut self, case: &BenchmarkCase) -> Result<CaseReport, CaseError> {
        let mut tracker = CaseTracker::new();
        let started = self
            .set_up_and_warm(case, &mut tracker)
            .and_then(|first| tracker.advance(CaseState::Timing).map(|()| first));
        let outcome = match started {
            Ok(first) => self.time(case, first),
            Err(CaseError::Invocation { stage, error }) => CaseOutcome::Failed { stage, error },
            Err(err) => {
                self.tear_down(case.backend);
                return Err(err);
            }
        };
        self.tear_down(case.backend);
        tracker.advance(CaseState::TornDown)?;

        match &outcome {
            CaseOutcome::Completed {
                samples,
                last_result,
            } => info!(
                "{}: {} samples, last result {:.2} km",
                case,
                samples.len(),
                last_result
            ),
            CaseOutcome::Failed { stage, error } => warn!("{}: {} failed: {}", case, stage, error),
        }
        Ok(CaseReport {
            case: *case,
            outcome,
            final_state: tracker.state,
        })
    }

    /// Runs every case in order, stopping at the first setup failure.
    pub fn run_series(&mut self, cases: &[BenchmarkCase]) -> Result<Vec<CaseReport>, CaseError> {
        cases.iter().map(|case| self.run_case(case)).collect()
    }

    /// Sets up and warms a case, leaving the timed loop to the caller.
    pub fn prepare(&mut self, case: &BenchmarkCase) -> Result<PreparedCase<'_>, CaseError> {
        let mut tracker = CaseTracker::new();
        match self.set_up_and_warm(case, &mut tracker) {
            Ok(_) => Ok(PreparedCase {
                driver: self,
                case: *case,
                tracker,
            }),
            Err(err) => {
                self.tear_down(case.backend);
                Err(err)
            }
        }
    }

    fn set_up_and_warm(
        &mut self,
        case: &BenchmarkCase,
        tracker: &mut CaseTracker,
    ) -> Result<f64, CaseError> {
        let (runtimes, backend) = self.parts(case.backend);
        backend.set_up(runtimes, case)?;
        tracker.advance(CaseState::SetUp)?;
        backend
            .prepare(case)
            .map_err(|error| CaseError::Invocation {
                stage: Stage::Prepare,
                error,
            })?;
        let first = backend.invoke(case).map_err(|error| CaseError::Invocation {
            stage: Stage::WarmUp,
            error,
        })?;
        tracker.advance(CaseState::WarmedUp)?;
        Ok(first)
    }

    fn time(&mut self, case: &BenchmarkCase, warm: f64) -> CaseOutcome {
        let repetition = self.config.repetition;
        let (_, backend) = self.parts(case.backend);
        let mut samples = Vec::new();
        let mut last_result = warm;
        let started = Instant::now();
        loop {
            let done = match repetition {
                Repetition::Iterations(n) => samples.len() as u64 >= n,
                Repetition::TimeBudgetMs(_) => {
                    !samples.is_empty()
                        && repetition
                            .time_budget()
                            .is_some_and(|budget| started.elapsed() >= budget)
                }
            };
            if done {
                break;
            }
            let start = Instant::now();
            let result = backend.invoke(case);
            samples.push(start.elapsed());
            match result {
                Ok(value) => last_result = value,
                Err(error) => {
                    return CaseOutcome::Failed {
                        stage: Stage::Timing,
                        error,
                    };
                }
            }
        }
        CaseOutcome::Completed {
            samples,
            last_result,
        }
    }

    fn tear_down(&mut self, kind: BackendKind) {
        let reuse = self.config.reuse_context;
        let (runtimes, backend) = self.parts(kind);
        backend.tear_down();
        if reuse {
            return;
        }
        backend.release();
        if kind.uses_vm() {
            runtimes.destroy_vm();
        } else {
            runtimes.destroy_isolate();
        }
    }
}

/// A set-up, warmed-up case whose timed loop is driven externally. Dropping
/// it tears the case down.
pub struct PreparedCase<'d> {
    driver: &'d mut BenchmarkDriver,
    case: BenchmarkCase,
    tracker: CaseTracker,
}

impl PreparedCase<'_> {
    pub fn case(&self) -> &BenchmarkCase {
        &self.case
    }

    pub fn state(&self) -> CaseState {
        self.tracker.state
    }

    pub fn invoke(&mut self) -> Result<f64, InvocationError> {
        if self.tracker.state == CaseState::WarmedUp {
            self.tracker.state = CaseState::Timing;
        }
        let (_, backend) = self.driver.parts(self.case.backend);
        backend.invoke(&self.case)
    }

    pub fn finish(self) {}
}

impl Drop for PreparedCase<'_> {
    fn drop(&mut self) {
        self.driver.tear_down(self.case.backend);
        self.tracker.state = CaseState::TornDown;
    }
}

#[cfg(test)]
mod driver_test;
