use chrono::{DateTime, Duration, Months, Utc};
use std::fmt::Display;

/// Chart ranges offered by the front end, identified by their display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePeriod {
    TwelveHours,
    OneDay,
    Week,
    Month,
    Year,
}

impl Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TimePeriod::TwelveHours => "12 часов",
                TimePeriod::OneDay => "1 день",
                TimePeriod::Week => "Неделя",
                TimePeriod::Month => "Месяц",
                TimePeriod::Year => "Год",
            }
        )
    }
}

impl TimePeriod {
    /// Unknown or missing labels fall back to a year.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("12 часов") => TimePeriod::TwelveHours,
            Some("1 день") => TimePeriod::OneDay,
            Some("Неделя") => TimePeriod::Week,
            Some("Месяц") => TimePeriod::Month,
            _ => TimePeriod::Year,
        }
    }

    /// Earliest `from_date` a history row may have to fall into this period.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimePeriod::TwelveHours => now - Duration::hours(12),
            // NOTE: "1 день" reaches a month back, same as "Месяц". Pending
            // product confirmation before narrowing it to a day.
            TimePeriod::OneDay => now - Months::new(1),
            TimePeriod::Week => now - Duration::days(7),
            TimePeriod::Month => now - Months::new(1),
            TimePeriod::Year => now - Months::new(12),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_label() {
        assert_eq!(
            TimePeriod::from_label(Some("12 часов")),
            TimePeriod::TwelveHours
        );
        assert_eq!(TimePeriod::from_label(Some("1 день")), TimePeriod::OneDay);
        assert_eq!(TimePeriod::from_label(Some("Неделя")), TimePeriod::Week);
        assert_eq!(TimePeriod::from_label(Some("Месяц")), TimePeriod::Month);
        assert_eq!(TimePeriod::from_label(Some("Год")), TimePeriod::Year);
        assert_eq!(TimePeriod::from_label(Some("whenever")), TimePeriod::Year);
        assert_eq!(TimePeriod::from_label(None), TimePeriod::Year);
    }

    #[test]
    fn test_labels_round_trip() {
        for period in [
            TimePeriod::TwelveHours,
            TimePeriod::OneDay,
            TimePeriod::Week,
            TimePeriod::Month,
            TimePeriod::Year,
        ] {
            assert_eq!(
                TimePeriod::from_label(Some(&period.to_string())),
                period
            );
        }
    }

    #[test]
    fn test_cutoffs() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 18, 0, 0).unwrap();
        assert_eq!(
            TimePeriod::TwelveHours.cutoff(now),
            Utc.with_ymd_and_hms(2024, 3, 31, 6, 0, 0).unwrap()
        );
        assert_eq!(
            TimePeriod::Week.cutoff(now),
            Utc.with_ymd_and_hms(2024, 3, 24, 18, 0, 0).unwrap()
        );
        // Month arithmetic clamps to the end of a shorter month
        assert_eq!(
            TimePeriod::Month.cutoff(now),
            Utc.with_ymd_and_hms(2024, 2, 29, 18, 0, 0).unwrap()
        );
        assert_eq!(TimePeriod::OneDay.cutoff(now), TimePeriod::Month.cutoff(now));
        assert_eq!(
            TimePeriod::Year.cutoff(now),
            Utc.with_ymd_and_hms(2023, 3, 31, 18, 0, 0).unwrap()
        );
    }
}
