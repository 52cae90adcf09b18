//! Date-window and keyword filters applied to every fetched post.

use crate::error::{CoreError, WeiboApiError};
use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone};

/// `created_at` after its leading weekday, e.g. `Wed Jun 15 10:00:00 +0800 2022`.
/// The weekday is not cross-checked against the date.
const WEIBO_TIME_FORMAT: &str = "%b %d %H:%M:%S %z %Y";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const SHANGHAI_OFFSET_SECS: i32 = 8 * 3600;

fn shanghai() -> Option<FixedOffset> {
    FixedOffset::east_opt(SHANGHAI_OFFSET_SECS)
}

pub fn parse_weibo_time(raw: &str) -> Result<DateTime<FixedOffset>, CoreError> {
    let invalid = |details: String| -> CoreError {
        WeiboApiError::invalid_response(format!("unparseable timestamp '{}': {}", raw, details))
            .into()
    };
    let (_weekday, rest) = raw
        .trim()
        .split_once(' ')
        .ok_or_else(|| invalid("missing fields".to_string()))?;
    DateTime::parse_from_str(rest.trim_start(), WEIBO_TIME_FORMAT)
        .map_err(|e| invalid(e.to_string()))
}

/// Inclusive calendar-date window in Shanghai time.
///
/// `start` begins at midnight of its day; `end` covers its whole day, so a
/// post is accepted while it is earlier than midnight of the following day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    start: Option<DateTime<FixedOffset>>,
    end_exclusive: Option<DateTime<FixedOffset>>,
}

impl TimeWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Parse optional `YYYY-MM-DD` bounds. Empty strings count as absent.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, CoreError> {
        let start = match start.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(local_midnight(parse_date("start", s)?)?),
            None => None,
        };
        let end_exclusive = match end.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => {
                let day = parse_date("end", s)?;
                let next = day
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| CoreError::InvalidInput {
                        message: format!("end date out of range: {}", s),
                    })?;
                Some(local_midnight(next)?)
            }
            None => None,
        };

        if let (Some(start), Some(end)) = (start, end_exclusive) {
            if start >= end {
                return Err(CoreError::InvalidInput {
                    message: "start date is after end date".to_string(),
                });
            }
        }

        Ok(Self {
            start,
            end_exclusive,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end_exclusive.is_none()
    }

    pub fn contains(&self, time: &DateTime<FixedOffset>) -> bool {
        if let Some(start) = self.start {
            if *time < start {
                return false;
            }
        }
        if let Some(end) = self.end_exclusive {
            if *time >= end {
                return false;
            }
        }
        true
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| CoreError::InvalidInput {
        message: format!("{} date '{}' is not in YYYY-MM-DD form", field, value),
    })
}

fn local_midnight(day: NaiveDate) -> Result<DateTime<FixedOffset>, CoreError> {
    let midnight = day.and_hms_opt(0, 0, 0).ok_or_else(|| CoreError::Internal {
        message: format!("no midnight on {}", day),
    })?;
    shanghai()
        .and_then(|tz| tz.from_local_datetime(&midnight).single())
        .ok_or_else(|| CoreError::Internal {
            message: format!("ambiguous local time for {}", day),
        })
}

/// Whether a raw platform timestamp falls inside the optional date window.
pub fn check_time(
    start: Option<&str>,
    end: Option<&str>,
    weibo_time: &str,
) -> Result<bool, CoreError> {
    let window = TimeWindow::parse(start, end)?;
    let time = parse_weibo_time(weibo_time)?;
    Ok(window.contains(&time))
}

/// True when no keywords are configured, otherwise true iff any keyword
/// occurs in `text`.
pub fn check_keyword_list<S: AsRef<str>>(keywords: &[S], text: &str) -> bool {
    keywords.is_empty() || keywords.iter().any(|k| text.contains(k.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weibo_time() {
        let time = parse_weibo_time("Tue Jun 15 10:00:00 +0800 2022").unwrap();
        assert_eq!(time.offset().local_minus_utc(), 8 * 3600);
        assert_eq!(
            time.naive_local().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2022-06-15 10:00:00"
        );

        assert!(parse_weibo_time("yesterday").is_err());
        assert!(parse_weibo_time("Wed Jun 15 10:00 2022").is_err());
    }

    #[test]
    fn test_weekday_is_not_cross_checked() {
        // Jun 15 2022 was a Wednesday
        let labelled_tue = parse_weibo_time("Tue Jun 15 10:00:00 +0800 2022").unwrap();
        let labelled_wed = parse_weibo_time("Wed Jun 15 10:00:00 +0800 2022").unwrap();
        assert_eq!(labelled_tue, labelled_wed);
    }

    #[test]
    fn test_summer_window() {
        let start = Some("2022-06-01");
        let end = Some("2022-08-31");

        assert!(check_time(start, end, "Tue Jun 15 10:00:00 +0800 2022").unwrap());
        assert!(!check_time(start, end, "Wed Sep 01 00:00:00 +0800 2022").unwrap());
    }

    #[test]
    fn test_window_bounds_are_inclusive_days() {
        let window = TimeWindow::parse(Some("2022-06-01"), Some("2022-08-31")).unwrap();

        let first = parse_weibo_time("Wed Jun 01 00:00:00 +0800 2022").unwrap();
        let last = parse_weibo_time("Wed Aug 31 23:59:59 +0800 2022").unwrap();
        let before = parse_weibo_time("Tue May 31 23:59:59 +0800 2022").unwrap();
        assert!(window.contains(&first));
        assert!(window.contains(&last));
        assert!(!window.contains(&before));
    }

    #[test]
    fn test_earlier_than_start_is_rejected() {
        // a week before start must be a plain reject
        assert!(!check_time(Some("2022-06-01"), None, "Wed May 25 12:00:00 +0800 2022").unwrap());
        assert!(!check_time(Some("2022-06-01"), None, "Sat Jan 01 12:00:00 +0800 2022").unwrap());
    }

    #[test]
    fn test_offsets_are_compared_in_absolute_time() {
        // 23:30 UTC on May 31 is 07:30 Jun 1 in Shanghai
        assert!(check_time(Some("2022-06-01"), None, "Tue May 31 23:30:00 +0000 2022").unwrap());
    }

    #[test]
    fn test_no_bounds_accepts_everything() {
        assert!(TimeWindow::parse(None, Some("")).unwrap().is_unbounded());
        assert!(check_time(None, None, "Mon Jan 01 00:00:00 +0800 2001").unwrap());
    }

    #[test]
    fn test_invalid_window() {
        assert!(matches!(
            TimeWindow::parse(Some("2022/06/01"), None),
            Err(CoreError::InvalidInput { .. })
        ));
        assert!(matches!(
            TimeWindow::parse(Some("2022-09-01"), Some("2022-08-31")),
            Err(CoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_check_keyword_list() {
        assert!(check_keyword_list(&["drought"], "severe drought warning"));
        let none: [&str; 0] = [];
        assert!(check_keyword_list(&none, "anything at all"));
        assert!(!check_keyword_list(&["rain"], "sunny day"));
        assert!(check_keyword_list(
            &["rain".to_string(), "sun".to_string()],
            "sunny day"
        ));
    }
}
