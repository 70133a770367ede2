use std::env;

use tracing::warn;

use crate::jobs::DEFAULT_JOB_CAPACITY;
use crate::signals::SignalPolicy;

pub const DEFAULT_PROMPT: &str = "msh> ";

/// Runtime settings for the engine and the interactive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of background jobs tracked at once (`MSH_JOB_CAPACITY`).
    pub job_capacity: usize,
    /// Prompt printed before each line when stdin is a terminal (`MSH_PROMPT`).
    pub prompt: String,
    /// Signals ignored by the interpreter and reset in every child.
    pub signals: SignalPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_capacity: DEFAULT_JOB_CAPACITY,
            prompt: DEFAULT_PROMPT.to_string(),
            signals: SignalPolicy::interactive(),
        }
    }
}

impl Config {
    /// Defaults overridden by `MSH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `MSH_*` key.
    /// Unusable values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("MSH_JOB_CAPACITY") {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.job_capacity = capacity,
                _ => warn!(value = %raw, "ignoring invalid MSH_JOB_CAPACITY"),
            }
        }

        if let Some(prompt) = lookup("MSH_PROMPT") {
            config.prompt = prompt;
        }

        config
    }
}
