//! Duration formatting helpers.

use std::time::Duration;

/// Format a duration for logs and summaries.
///
/// Sub-minute durations keep one decimal ("6.2s"); longer ones are split
/// into units ("2m 05s", "1h 03m").
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}
