use chrono::Weekday;

/// Base daily demand for the Sunday-to-Saturday weekly forecast. Midweek
/// commuting dominates; Sunday is the quietest day.
pub fn weekly_weekday_base(weekday: Weekday) -> f64 {
    match weekday {
        Weekday::Sun => 1800.0,
        Weekday::Mon => 2200.0,
        Weekday::Sat => 2000.0,
        _ => 2800.0,
    }
}

/// Base daily demand for the yearly grid.
pub fn yearly_weekday_base(weekday: Weekday) -> f64 {
    match weekday {
        Weekday::Sun => 1700.0,
        Weekday::Sat => 2000.0,
        Weekday::Mon => 2200.0,
        _ => 2600.0,
    }
}

/// Winter ridership runs higher, summer lower.
pub fn weekly_seasonal_factor(month: u32) -> f64 {
    match month {
        11 | 12 | 1 | 2 => 1.15,
        6 | 7 | 8 => 0.9,
        _ => 1.0,
    }
}

pub fn yearly_seasonal_factor(month: u32) -> f64 {
    match month {
        11 | 12 | 1 | 2 => 1.12,
        6 | 7 | 8 => 0.92,
        _ => 1.0,
    }
}

/// Demand profile per operational hour as (base, noise sigma). Two rush
/// bands (morning 6-9, evening 17-19) frame a midday lunch bump; the evening
/// rush is the busiest band of the day.
pub fn hourly_band(hour: u32) -> (f64, f64) {
    match hour {
        6..=9 => (85.0, 12.0),
        10..=11 => (65.0, 8.0),
        12..=13 => (75.0, 10.0),
        14..=16 => (60.0, 8.0),
        17..=19 => (90.0, 15.0),
        20 => (45.0, 8.0),
        _ => (25.0, 5.0),
    }
}
