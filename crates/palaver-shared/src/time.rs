//! Timestamp helpers.
//!
//! Messages carry two timestamps: a display string in the device-local
//! 12-hour format (`"10:04 AM"`) shown next to the bubble, and an epoch
//! [`DateTime<Utc>`] sort key used for ordering.  Display strings are not
//! sortable (no date, 12-hour rollover), so they are never compared.

use chrono::{DateTime, Local, Utc};

/// Format an instant in the display form shown in the message list.
pub fn display_time(instant: DateTime<Local>) -> String {
    instant.format("%I:%M %p").to_string()
}

/// Display form of the current local time.
pub fn now_display() -> String {
    display_time(Local::now())
}

/// Display form of a UTC instant, converted to local time.
pub fn display_time_utc(instant: DateTime<Utc>) -> String {
    display_time(instant.with_timezone(&Local))
}

/// Human-readable file size, matching the producer contract
/// (`"512 B"`, `"1.5 KB"`, `"2.3 MB"`).
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
