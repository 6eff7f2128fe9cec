use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::validation::{reason, FieldErrors};

/// Requirements lengths a buyer can choose when no closing date is given
pub const REQUIREMENTS_LENGTHS: &[&str] = &["1 week", "2 weeks"];

/// Latest a closing date can be after publication
pub const MAX_OPEN_DAYS: i64 = 365;

/// Closing date at or under this many days away gets one working day of questions
const SHORT_NOTICE_DAYS: i64 = 3;

/// Deadline settings for publishing opportunities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineRules {
    /// Time of day (UTC) at which closing and question deadlines fall
    pub time_of_day: NaiveTime,
    /// Used when a brief has neither `closedAt` nor `requirementsLength`
    pub default_requirements_length: String,
}

impl Default for DeadlineRules {
    fn default() -> Self {
        Self {
            time_of_day: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            default_requirements_length: "2 weeks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingDates {
    pub closed_at: DateTime<Utc>,
    pub questions_closed_at: DateTime<Utc>,
}

impl DeadlineRules {
    /// Combines a calendar day with the deadline time of day
    pub fn at_deadline(&self, day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_time(self.time_of_day))
    }

    /// Works out the closing and question deadlines for a brief published at `published_at`
    ///
    /// # Business Rules
    /// - With an explicit closing day, questions close 1 working day before it
    ///   when closing is at most 3 days away (never before the publication day),
    ///   otherwise 2 working days before
    /// - Without one, closing is the publication day plus the requirements length
    ///   and questions close 2 working days after publication for "1 week",
    ///   5 working days otherwise
    /// - Questions never close after the opportunity does, nor before it was published
    /// - Closing must be after publication and at most 365 days later
    pub fn closing_dates(
        &self,
        published_at: DateTime<Utc>,
        closed_on: Option<NaiveDate>,
        requirements_length: Option<&str>,
    ) -> DomainResult<ClosingDates> {
        let published_day = published_at.date_naive();

        let (closed_at, questions_day) = match closed_on {
            Some(day) => {
                let closed_at = self.at_deadline(day);
                let questions_day =
                    if closed_at <= published_at + Duration::days(SHORT_NOTICE_DAYS) {
                        add_workdays(day, -1).max(published_day)
                    } else {
                        add_workdays(day, -2)
                    };
                (closed_at, questions_day)
            }
            None => {
                let length =
                    requirements_length.unwrap_or(self.default_requirements_length.as_str());
                let interval = parse_interval(length).ok_or_else(|| {
                    DomainError::Validation(FieldErrors::single(
                        "requirementsLength",
                        reason::INVALID_VALUE,
                    ))
                })?;
                let closing_day = published_day.checked_add_signed(interval).ok_or_else(|| {
                    DomainError::Validation(FieldErrors::single(
                        "requirementsLength",
                        reason::INVALID_VALUE,
                    ))
                })?;
                let workdays = if length == "1 week" { 2 } else { 5 };
                (
                    self.at_deadline(closing_day),
                    add_workdays(published_day, workdays),
                )
            }
        };

        if closed_at <= published_at {
            return Err(DomainError::Validation(FieldErrors::single(
                "closedAt",
                reason::CLOSING_DATE_TOO_SOON,
            )));
        }
        if closed_at > published_at + Duration::days(MAX_OPEN_DAYS) {
            return Err(DomainError::Validation(FieldErrors::single(
                "closedAt",
                reason::CLOSING_DATE_TOO_LATE,
            )));
        }

        let questions_closed_at = self
            .at_deadline(questions_day)
            .min(closed_at)
            .max(published_at);

        Ok(ClosingDates {
            closed_at,
            questions_closed_at,
        })
    }
}

/// Parses "N day(s)" / "N week(s)"
pub fn parse_interval(value: &str) -> Option<Duration> {
    let mut parts = value.split_whitespace();
    let amount: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?;
    if parts.next().is_some() || amount <= 0 {
        return None;
    }
    match unit {
        "day" | "days" => Duration::try_days(amount),
        "week" | "weeks" => Duration::try_weeks(amount),
        _ => None,
    }
}

/// Moves `days` working days (Monday to Friday) from `from`; negative goes back
pub fn add_workdays(from: NaiveDate, days: i64) -> NaiveDate {
    let step = if days < 0 { -1 } else { 1 };
    let mut remaining = days.abs();
    let mut current = from;
    while remaining > 0 {
        current += Duration::days(step);
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn workdays_skip_weekends() {
        // 2024-03-01 is a Friday
        assert_eq!(add_workdays(day(2024, 3, 1), 1), day(2024, 3, 4));
        assert_eq!(add_workdays(day(2024, 3, 4), -1), day(2024, 3, 1));
        assert_eq!(add_workdays(day(2024, 3, 4), -2), day(2024, 2, 29));
        assert_eq!(add_workdays(day(2024, 3, 6), 0), day(2024, 3, 6));
    }

    #[test]
    fn interval_parsing() {
        assert_eq!(parse_interval("1 week"), Some(Duration::weeks(1)));
        assert_eq!(parse_interval("2 weeks"), Some(Duration::weeks(2)));
        assert_eq!(parse_interval("10 days"), Some(Duration::days(10)));
        assert_eq!(parse_interval("soon"), None);
        assert_eq!(parse_interval("0 days"), None);
        assert_eq!(parse_interval("9223372036854775807 weeks"), None);
    }

    #[test]
    fn explicit_closing_two_working_days_of_questions_buffer() {
        let rules = DeadlineRules::default();
        // Monday publish, closes the following Friday week
        let dates = rules
            .closing_dates(at(2024, 3, 4, 9), Some(day(2024, 3, 15)), None)
            .unwrap();

        assert_eq!(dates.closed_at, at(2024, 3, 15, 18));
        assert_eq!(dates.questions_closed_at, at(2024, 3, 13, 18));
    }

    #[test]
    fn short_notice_closing_gets_one_working_day() {
        let rules = DeadlineRules::default();
        // Monday publish, closing Wednesday
        let dates = rules
            .closing_dates(at(2024, 3, 4, 9), Some(day(2024, 3, 6)), None)
            .unwrap();

        assert_eq!(dates.questions_closed_at, at(2024, 3, 5, 18));
    }

    #[test]
    fn short_notice_questions_not_before_publication_day() {
        let rules = DeadlineRules::default();
        // Monday publish, closing Tuesday: one working day back is Monday itself
        let dates = rules
            .closing_dates(at(2024, 3, 4, 9), Some(day(2024, 3, 5)), None)
            .unwrap();
        assert_eq!(dates.questions_closed_at, at(2024, 3, 4, 18));

        // Saturday publish, closing Monday: one working day back would be Friday
        let dates = rules
            .closing_dates(at(2024, 3, 9, 9), Some(day(2024, 3, 11)), None)
            .unwrap();
        assert_eq!(dates.questions_closed_at, at(2024, 3, 9, 18));
    }

    #[test]
    fn questions_never_after_closing() {
        let rules = DeadlineRules::default();
        // Published Monday morning, closing same day evening
        let dates = rules
            .closing_dates(at(2024, 3, 4, 9), Some(day(2024, 3, 4)), None)
            .unwrap();

        assert!(dates.questions_closed_at <= dates.closed_at);
        assert!(dates.questions_closed_at >= at(2024, 3, 4, 9));
    }

    #[test]
    fn requirements_length_defaults() {
        let rules = DeadlineRules::default();
        let published = at(2024, 3, 4, 9);

        let one_week = rules
            .closing_dates(published, None, Some("1 week"))
            .unwrap();
        assert_eq!(one_week.closed_at, at(2024, 3, 11, 18));
        assert_eq!(one_week.questions_closed_at, at(2024, 3, 6, 18));

        let default = rules.closing_dates(published, None, None).unwrap();
        assert_eq!(default.closed_at, at(2024, 3, 18, 18));
        assert_eq!(default.questions_closed_at, at(2024, 3, 11, 18));
    }

    #[test]
    fn closing_before_publication_rejected() {
        let rules = DeadlineRules::default();
        let err = rules
            .closing_dates(at(2024, 3, 4, 9), Some(day(2024, 3, 1)), None)
            .unwrap_err();

        match err {
            DomainError::Validation(errors) => {
                assert_eq!(errors.get("closedAt"), Some(reason::CLOSING_DATE_TOO_SOON))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn closing_more_than_a_year_out_rejected() {
        let rules = DeadlineRules::default();
        let err = rules
            .closing_dates(at(2024, 3, 4, 9), Some(day(2025, 3, 10)), None)
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(e) if e.get("closedAt") == Some(reason::CLOSING_DATE_TOO_LATE)));
    }

    #[test]
    fn unknown_requirements_length_rejected() {
        let rules = DeadlineRules::default();
        let err = rules
            .closing_dates(at(2024, 3, 4, 9), None, Some("a while"))
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }
}
