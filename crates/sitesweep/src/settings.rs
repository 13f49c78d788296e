//! Run-time overrides for plugin timing.
//!
//! Precedence is explicit value (CLI flag) > environment variable >
//! plugin default. Unparseable environment values are ignored with a
//! warning.

use std::time::Duration;

use serde::Serialize;

use crate::collect::Timing;

pub const ENV_SCROLL_DELAY_MS: &str = "SITESWEEP_SCROLL_DELAY_MS";
pub const ENV_MAX_SCROLLS: &str = "SITESWEEP_MAX_SCROLLS";
pub const ENV_NAV_TIMEOUT_MS: &str = "SITESWEEP_NAV_TIMEOUT_MS";
pub const ENV_RESULTS_TIMEOUT_MS: &str = "SITESWEEP_RESULTS_TIMEOUT_MS";

/// Optional replacements for a plugin's [`Timing`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Overrides {
    pub scroll_delay: Option<Duration>,
    pub max_rounds: Option<u32>,
    pub navigation_timeout: Option<Duration>,
    pub results_timeout: Option<Duration>,
}

impl Overrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str| parse_env::<u64>(key, lookup(key)).map(Duration::from_millis);
        Self {
            scroll_delay: millis(ENV_SCROLL_DELAY_MS),
            max_rounds: parse_env(ENV_MAX_SCROLLS, lookup(ENV_MAX_SCROLLS)),
            navigation_timeout: millis(ENV_NAV_TIMEOUT_MS),
            results_timeout: millis(ENV_RESULTS_TIMEOUT_MS),
        }
    }

    /// Values set in `self` win over those in `fallback`.
    pub fn or(self, fallback: Overrides) -> Overrides {
        Overrides {
            scroll_delay: self.scroll_delay.or(fallback.scroll_delay),
            max_rounds: self.max_rounds.or(fallback.max_rounds),
            navigation_timeout: self.navigation_timeout.or(fallback.navigation_timeout),
            results_timeout: self.results_timeout.or(fallback.results_timeout),
        }
    }

    pub fn apply(&self, timing: Timing) -> Timing {
        Timing {
            navigation_timeout: self.navigation_timeout.unwrap_or(timing.navigation_timeout),
            results_timeout: self.results_timeout.unwrap_or(timing.results_timeout),
            scroll_delay: self.scroll_delay.unwrap_or(timing.scroll_delay),
            max_rounds: self.max_rounds.unwrap_or(timing.max_rounds),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: Option<String>) -> Option<T> {
    let raw = value?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {key}={raw:?}: not a valid number");
            None
        }
    }
}
