use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Modification time stored in two forms.
///
/// `unix` is authoritative for equality and ordering; `display` is a
/// locale-formatted copy kept for people reading the files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(rename = "modification_time", default)]
    pub display: String,
    #[serde(rename = "modification_time_unix", default)]
    pub unix: f64,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now())
    }

    pub fn from_unix(unix: f64) -> Self {
        let secs = unix.floor() as i64;
        let nanos = ((unix - unix.floor()) * 1e9) as u32;
        let display = DateTime::from_timestamp(secs, nanos)
            .map(|utc| format_local(&utc.with_timezone(&Local)))
            .unwrap_or_default();
        Self { display, unix }
    }

    fn from_datetime(time: DateTime<Local>) -> Self {
        Self {
            display: format_local(&time),
            unix: time.timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}

fn format_local(time: &DateTime<Local>) -> String {
    time.format("%c %z").to_string()
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.unix == other.unix
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.unix.partial_cmp(&other.unix)
    }
}

/// Name used for backup copies: `<file>_<YYYY-MM-DD_HH.MM.SS>.bak`.
pub fn backup_suffix() -> String {
    Local::now().format("%Y-%m-%d_%H.%M.%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_display_string() {
        let a = Timestamp {
            display: "yesterday".into(),
            unix: 1_500_000_000.5,
        };
        let b = Timestamp {
            display: "something else".into(),
            unix: 1_500_000_000.5,
        };
        assert_eq!(a, b);
        assert!(Timestamp::from_unix(1.0) < Timestamp::from_unix(2.0));
    }

    #[test]
    fn serializes_both_representations() {
        let json = serde_json::to_value(Timestamp::from_unix(1_600_000_000.0)).unwrap();
        assert_eq!(json["modification_time_unix"], 1_600_000_000.0);
        assert!(json["modification_time"].as_str().unwrap().len() > 0);
    }
}
