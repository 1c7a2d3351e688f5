use chrono::{DateTime, Local, TimeZone};

use crate::ports::Clock;

/// Layout of the timestamp column. Purely presentational; never parsed back.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats an instant as a record timestamp.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> String {
        format_timestamp(&Local::now())
    }
}

/// Makes arbitrary text safe to place inside a markdown table cell.
/// Pipes are escaped and line breaks become `<br>`.
pub fn escape_table_cell(text: &str) -> String {
    text.trim()
        .replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace(['\n', '\r'], "<br>")
}
