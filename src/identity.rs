//! Build identity of the running binary.
//!
//! The name/version pair is attached as constant labels to every metric so
//! scraped series can be sliced by deployed build.

use serde::Serialize;
use std::env;

#[derive(Debug, Clone, Serialize)]
pub struct BuildIdentity {
    pub name: String,
    pub version: String,
}

impl BuildIdentity {
    /// Resolve the identity of the current process.
    ///
    /// `SERVICE_NAME` / `SERVICE_VERSION` override the detected values; the
    /// fallbacks are the executable file stem and the crate version baked in
    /// at compile time.
    pub fn detect() -> Self {
        let name = env::var("SERVICE_NAME")
            .ok()
            .or_else(executable_name)
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

        let version =
            env::var("SERVICE_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        BuildIdentity { name, version }
    }
}

fn executable_name() -> Option<String> {
    let exe = env::current_exe().ok()?;
    exe.file_stem()?.to_str().map(str::to_owned)
}
