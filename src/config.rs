//! Runtime configuration for the instrumentation layer.

use once_cell::sync::Lazy;
use std::env;

#[derive(Debug)]
pub struct Settings {
    /// Paths excluded from instrumentation (liveness/readiness probes and
    /// the scrape endpoint itself).
    pub probe_paths: Vec<String>,
    /// Lower bound of the success-class status range.
    pub success_min: u16,
    /// Upper bound of the success-class status range.
    pub success_max: u16,
}

impl Settings {
    fn from_env() -> Self {
        let probe_paths = env::var("PROBE_PATHS")
            .unwrap_or_else(|_| "/healthz,/readyz,/metrics".into())
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let success_min = env::var("SUCCESS_MIN")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(200);

        let success_max = env::var("SUCCESS_MAX")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(299);

        let (success_min, success_max) = success_bounds(success_min, success_max);

        Settings {
            probe_paths,
            success_min,
            success_max,
        }
    }
}

/// An inverted range would be empty and silently stop all `sent`
/// accounting, so fall back to the defaults instead.
fn success_bounds(min: u16, max: u16) -> (u16, u16) {
    if min > max {
        log::warn!("inverted success range {min}-{max}, using 200-299");
        (200, 299)
    } else {
        (min, max)
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
