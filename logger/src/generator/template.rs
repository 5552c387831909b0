//! Line layouts the ranging firmware prints over its console.

const TAG: &str = "ftm_station";

/// Unrelated console output interleaved with measurements.
pub const NOISE_LINES: &[&str] = &[
    "wifi:new:<6,0>, old:<1,0>, ap:<255,255>, sta:<6,0>, prof:1",
    "Requesting FTM session with Frame Count - 16, Burst Period - 2mSec",
    "sta disconnect, retry attempt 1...",
    "FTM procedure with Peer(24:0a:c4:00:00:01) failed! (Status - 2)",
    "FTM session timed out!",
];

/// Wraps `message` the way the device's logger does: `I (<uptime>) <tag>: ...`.
pub fn device_log(level: char, uptime_ms: u64, message: &str) -> String {
    format!("{} ({}) {}: {}", level, uptime_ms, TAG, message)
}

pub fn session_line(raw_rtt_ns: u64, est_rtt_ns: u64, distance_cm: u64) -> String {
    format!(
        "FTM Data: Raw RTT = {} nSec, Est RTT = {} nSec, Distance = {}.{:02} meters",
        raw_rtt_ns,
        est_rtt_ns,
        distance_cm / 100,
        distance_cm % 100
    )
}

pub fn summary_line(rtt_ns: u64, distance_cm: u64) -> String {
    format!(
        "FTM session complete. Estimated RTT - {} nSec, Estimated Distance - {}.{:02} meters",
        rtt_ns,
        distance_cm / 100,
        distance_cm % 100
    )
}
