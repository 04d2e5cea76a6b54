use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Most recent Sunday on or before `date`. A Sunday anchors to itself.
pub fn week_start_sunday(date: NaiveDate) -> NaiveDate {
    let days_since_sunday = date.weekday().num_days_from_sunday() as i64;
    date - Duration::days(days_since_sunday)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
