//! ID generation utilities for aeroforge
//!
//! Provides identifiers for missions and timestamps for records.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique mission ID
///
/// Format: `{timestamp_ms}-{random_hex}`
/// Example: `1738300800123-a1b2`
pub fn generate_mission_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("{}-{:04x}", timestamp, random)
}

/// Directory name for one iteration's exported files
///
/// Example: iteration 3 -> `iteration-03`
pub fn iteration_dir_name(iteration: u32) -> String {
    format!("iteration-{:02}", iteration)
}
