use std::collections::HashSet;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local};

/// How the retention count is interpreted.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    clap::ValueEnum,
    derive_more::Display,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RetentionMode {
    /// Keep the newest `keep` backups.
    #[default]
    #[display("count")]
    Count,
    /// Keep every backup of the newest `keep` calendar days (local time).
    #[display("days")]
    Days,
}

/// Configure retention of backup files.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Defines how many backups (or days of backups) to keep.
    ///
    /// Signed so that a negative value in the config file is reported
    /// as an invalid policy instead of a parse error.
    pub keep: i64,

    /// Defines whether `keep` counts files or days.
    pub mode: RetentionMode,

    /// Only file names matching this regular expression are backups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep: 7,
            mode: RetentionMode::Count,
            pattern: None,
        }
    }
}

/// Decides for a sequence of backups whether each one is retained.
///
/// Backups must be passed newest first.
#[derive(Clone, Debug)]
pub struct Retention {
    keep: usize,
    mode: RetentionMode,
    kept: usize,
    days: HashSet<(i32, u32)>,
}

impl Retention {
    pub fn new(keep: usize, mode: RetentionMode) -> Self {
        Self {
            keep,
            mode,
            kept: 0,
            days: HashSet::new(),
        }
    }

    /// Returns if the backup last modified at `modified` is to be retained.
    pub fn retain(&mut self, modified: SystemTime) -> bool {
        let Self {
            keep,
            mode,
            kept,
            days,
        } = self;

        let retained = match mode {
            RetentionMode::Count => *kept < *keep,
            RetentionMode::Days => {
                let date: DateTime<Local> = modified.into();
                let daily_key = (date.year(), date.ordinal());
                days.contains(&daily_key) || (days.len() < *keep && days.insert(daily_key))
            }
        };

        if retained {
            *kept += 1;
        }
        retained
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn at(day: u32, minute: u32) -> SystemTime {
        let naive = NaiveDate::from_ymd_opt(2024, 6, day)
            .and_then(|d| d.and_hms_opt(12, minute, 0))
            .unwrap();
        Local.from_local_datetime(&naive).single().unwrap().into()
    }

    #[test]
    fn count_keeps_first_n() {
        let mut retention = Retention::new(2, RetentionMode::Count);
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(100);

        assert!(retention.retain(t));
        assert!(retention.retain(t));
        assert!(!retention.retain(t));
        assert!(!retention.retain(t));
    }

    #[test]
    fn count_zero_keeps_nothing() {
        let mut retention = Retention::new(0, RetentionMode::Count);
        assert!(!retention.retain(SystemTime::UNIX_EPOCH));
    }

    #[test]
    fn days_keeps_whole_days() {
        let mut retention = Retention::new(2, RetentionMode::Days);

        assert!(retention.retain(at(20, 5)));
        assert!(retention.retain(at(20, 1)));
        assert!(retention.retain(at(18, 9)));
        assert!(retention.retain(at(18, 0)));
        assert!(!retention.retain(at(17, 3)));
        assert!(!retention.retain(at(10, 3)));
    }

    #[test]
    fn days_zero_keeps_nothing() {
        let mut retention = Retention::new(0, RetentionMode::Days);
        assert!(!retention.retain(at(20, 5)));
    }

    #[test]
    fn config_defaults_fill_missing_keys() {
        let cfg: RetentionConfig = toml::from_str("keep = 3").unwrap();
        assert_eq!(cfg.keep, 3);
        assert_eq!(cfg.mode, RetentionMode::Count);
        assert_eq!(cfg.pattern, None);

        let cfg: RetentionConfig = toml::from_str("mode = \"days\"").unwrap();
        assert_eq!(cfg.keep, 7);
        assert_eq!(cfg.mode, RetentionMode::Days);
    }
}
