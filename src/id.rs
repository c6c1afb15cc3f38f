//! Run ID generation
//!
//! Each inbound request gets a run ID that correlates log lines, temp file
//! names, and the default storage folder for that invocation.

use chrono::Local;
use rand::Rng;

/// Generate a unique run ID for one conversion request
///
/// Format: `{YYYYmmddHHMMSS}_{random_hex}`
/// Example: `20250114093012_a1b2c3d4`
pub fn generate_run_id() -> String {
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let random: u32 = rand::rng().random();
    format!("{}_{:08x}", timestamp, random)
}
