// Blocked-date matching
// Single dates, inclusive ranges and recurring patterns; a date is blocked if any entry matches

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::validation::validate_month_day;

/// One entry of the `blocked_dates` setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockedDate {
    Single {
        date: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Inclusive on both ends
    Range {
        start: NaiveDate,
        end: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Matches when any of the populated fields matches
    Recurring {
        /// 0 = Sunday .. 6 = Saturday
        #[serde(default, skip_serializing_if = "Option::is_none")]
        day_of_week: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        day_of_month: Option<u32>,
        /// `MM-DD`, every year
        #[serde(default, skip_serializing_if = "Option::is_none")]
        month_day: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl BlockedDate {
    pub fn single(date: NaiveDate) -> Self {
        BlockedDate::Single { date, reason: None }
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        BlockedDate::Range {
            start,
            end,
            reason: None,
        }
    }

    pub fn weekly(day_of_week: u32) -> Self {
        BlockedDate::Recurring {
            day_of_week: Some(day_of_week),
            day_of_month: None,
            month_day: None,
            reason: None,
        }
    }

    pub fn yearly(month_day: &str, reason: &str) -> Self {
        BlockedDate::Recurring {
            day_of_week: None,
            day_of_month: None,
            month_day: Some(month_day.to_string()),
            reason: Some(reason.to_string()),
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            BlockedDate::Single { date: blocked, .. } => *blocked == date,
            BlockedDate::Range { start, end, .. } => *start <= date && date <= *end,
            BlockedDate::Recurring {
                day_of_week,
                day_of_month,
                month_day,
                ..
            } => {
                let weekday_hit = day_of_week
                    .map(|dow| dow == date.weekday().num_days_from_sunday())
                    .unwrap_or(false);
                let day_hit = day_of_month.map(|dom| dom == date.day()).unwrap_or(false);
                let month_day_hit = month_day
                    .as_deref()
                    .map(|md| md == date.format("%m-%d").to_string())
                    .unwrap_or(false);

                weekday_hit || day_hit || month_day_hit
            }
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            BlockedDate::Single { reason, .. }
            | BlockedDate::Range { reason, .. }
            | BlockedDate::Recurring { reason, .. } => reason.as_deref(),
        }
    }

    /// Checks the entry is well formed
    pub fn validate(&self) -> Result<(), String> {
        match self {
            BlockedDate::Single { .. } => Ok(()),
            BlockedDate::Range { start, end, .. } => {
                if start > end {
                    Err(format!("Blocked range starts after it ends: {} > {}", start, end))
                } else {
                    Ok(())
                }
            }
            BlockedDate::Recurring {
                day_of_week,
                day_of_month,
                month_day,
                ..
            } => {
                if day_of_week.is_none() && day_of_month.is_none() && month_day.is_none() {
                    return Err("Recurring blocked date has no pattern".to_string());
                }
                if let Some(dow) = day_of_week {
                    if *dow > 6 {
                        return Err(format!("Invalid day_of_week: {}", dow));
                    }
                }
                if let Some(dom) = day_of_month {
                    if !(1..=31).contains(dom) {
                        return Err(format!("Invalid day_of_month: {}", dom));
                    }
                }
                if let Some(md) = month_day {
                    validate_month_day(md).map_err(|_| format!("Invalid month_day: {}", md))?;
                }
                Ok(())
            }
        }
    }
}

/// Holidays applied when `blocked_dates` has never been configured
pub fn default_holidays() -> Vec<BlockedDate> {
    vec![
        BlockedDate::yearly("01-01", "New Year's Day"),
        BlockedDate::yearly("05-01", "Labour Day"),
        BlockedDate::yearly("07-21", "National Day"),
        BlockedDate::yearly("08-15", "Assumption Day"),
        BlockedDate::yearly("11-01", "All Saints' Day"),
        BlockedDate::yearly("11-11", "Armistice Day"),
        BlockedDate::yearly("12-25", "Christmas Day"),
        BlockedDate::Recurring {
            day_of_week: Some(0),
            day_of_month: None,
            month_day: None,
            reason: Some("Sunday".to_string()),
        },
    ]
}

/// Returns the first entry blocking `date`, if any
pub fn find_block(entries: &[BlockedDate], date: NaiveDate) -> Option<&BlockedDate> {
    entries.iter().find(|entry| entry.matches(date))
}

pub fn is_blocked(entries: &[BlockedDate], date: NaiveDate) -> bool {
    find_block(entries, date).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_and_range() {
        let entries = vec![
            BlockedDate::single(date(2025, 6, 10)),
            BlockedDate::range(date(2025, 8, 1), date(2025, 8, 3)),
        ];

        assert!(is_blocked(&entries, date(2025, 6, 10)));
        assert!(!is_blocked(&entries, date(2025, 6, 11)));
        assert!(is_blocked(&entries, date(2025, 8, 1)));
        assert!(is_blocked(&entries, date(2025, 8, 3)));
        assert!(!is_blocked(&entries, date(2025, 8, 4)));
    }

    #[test]
    fn test_recurring_sunday_blocks_regardless_of_other_entries() {
        // 2025-06-15 is a Sunday
        let entries = vec![
            BlockedDate::single(date(2025, 1, 2)),
            BlockedDate::range(date(2025, 3, 1), date(2025, 3, 5)),
            BlockedDate::weekly(0),
        ];

        assert!(is_blocked(&entries, date(2025, 6, 15)));
        assert!(!is_blocked(&entries, date(2025, 6, 16)));
    }

    #[test]
    fn test_recurring_fields_are_disjunctive() {
        let entry = BlockedDate::Recurring {
            day_of_week: Some(3),
            day_of_month: Some(1),
            month_day: Some("12-24".to_string()),
            reason: None,
        };

        // Wednesday
        assert!(entry.matches(date(2025, 6, 4)));
        // First of the month (a Sunday)
        assert!(entry.matches(date(2025, 6, 1)));
        // Christmas Eve (a Wednesday in 2025, a Thursday in 2026)
        assert!(entry.matches(date(2026, 12, 24)));
        // Thursday the 5th
        assert!(!entry.matches(date(2025, 6, 5)));
    }

    #[test]
    fn test_default_holidays() {
        let defaults = default_holidays();

        assert!(is_blocked(&defaults, date(2025, 12, 25)));
        assert!(is_blocked(&defaults, date(2025, 7, 21)));
        assert!(is_blocked(&defaults, date(2025, 6, 15)));
        assert!(!is_blocked(&defaults, date(2025, 6, 16)));
        assert_eq!(
            find_block(&defaults, date(2026, 1, 1)).and_then(|b| b.reason()),
            Some("New Year's Day")
        );
    }

    #[test]
    fn test_deserialize_tagged_entries() {
        let json = r#"[
            {"type": "single", "date": "2025-06-10"},
            {"type": "range", "start": "2025-08-01", "end": "2025-08-03", "reason": "Holiday"},
            {"type": "recurring", "month_day": "12-26"}
        ]"#;
        let entries: Vec<BlockedDate> = serde_json::from_str(json).unwrap();

        assert_eq!(entries.len(), 3);
        assert!(is_blocked(&entries, date(2030, 12, 26)));
        assert_eq!(entries[1].reason(), Some("Holiday"));
    }

    #[test]
    fn test_validate() {
        assert!(BlockedDate::range(date(2025, 8, 3), date(2025, 8, 1)).validate().is_err());
        assert!(BlockedDate::weekly(7).validate().is_err());
        assert!(BlockedDate::yearly("02-30x", "bad").validate().is_err());
        assert!(BlockedDate::Recurring {
            day_of_week: None,
            day_of_month: None,
            month_day: None,
            reason: None,
        }
        .validate()
        .is_err());
        assert!(BlockedDate::weekly(0).validate().is_ok());
    }
}
