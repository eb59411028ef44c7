// src/ui/utils.rs
// Common formatting helpers for the terminal display

use std::time::Duration;

const UNITS: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Helper function to format a byte count with binary units, e.g. `1.50 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Like [`format_bytes`] but shows `?` for an unknown (zero) total.
pub fn format_bytes_if_known(bytes: u64) -> String {
    if bytes == 0 {
        "?".to_string()
    } else {
        format_bytes(bytes)
    }
}

/// Elapsed time as `1h 02m 03s`, dropping leading zero units.
pub fn format_duration(d: Duration) -> String {
    let total = (d.as_millis() + 500) / 1000;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}
