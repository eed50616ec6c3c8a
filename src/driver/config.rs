//! Driver configuration, loaded from JSON with every field optional.

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::UsageError;
use crate::guest::ContextConfig;
use crate::runtime::vm::VmOptions;

/// How many timed invocations a case runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repetition {
    Iterations(u64),
    /// Invoke until the budget is spent; at least one call is always made.
    TimeBudgetMs(u64),
}

impl Repetition {
    pub fn time_budget(self) -> Option<Duration> {
        match self {
            Repetition::Iterations(_) => None,
            Repetition::TimeBudgetMs(ms) => Some(Duration::from_millis(ms)),
        }
    }
}

impl Default for Repetition {
    fn default() -> Self {
        Repetition::Iterations(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub repetition: Repetition,
    /// Keep the isolate and VM alive between cases instead of tearing them
    /// down after each one.
    pub reuse_context: bool,
    pub context: ContextConfig,
    pub vm: VmOptions,
}

impl DriverConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, UsageError> {
        let config_error = |message: String| UsageError::Config {
            path: path.display().to_string(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|err| config_error(err.to_string()))?;
        Self::from_json(&text).map_err(|err| config_error(err.to_string()))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
