use std::time::SystemTime;
use chrono::{DateTime, Local};

pub fn format_datetime(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// `"<start> -> <end>"` in local time.
pub fn format_span(start: SystemTime, end: SystemTime) -> String {
    format!("{} -> {}", format_datetime(start), format_datetime(end))
}
