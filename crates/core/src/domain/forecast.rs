use chrono::NaiveDate;
use serde::Serialize;

/// Single-point peak demand estimate.
#[derive(Debug, Clone, Serialize)]
pub struct PeakForecast {
    pub prediction: f64,
    pub confidence: f64,
    pub model_used: &'static str,
}

/// Seven daily predictions for a Sunday-to-Saturday week.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyForecast {
    pub dates: Vec<NaiveDate>,
    pub predictions: Vec<f64>,
    pub model_used: &'static str,
}

/// One prediction per operational hour, with the busiest hour tracked.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyForecast {
    pub hours: Vec<u32>,
    pub predictions: Vec<f64>,
    pub peak_hour: u32,
    pub peak_value: f64,
    pub model_used: &'static str,
}

/// Daily predictions for a full year as a fixed 12x31 grid indexed by
/// (month-1, day-1). Cells for days that do not exist in a month stay `None`.
#[derive(Debug, Clone, Serialize)]
pub struct YearlyForecast {
    pub year: i32,
    pub grid: Vec<Vec<Option<f64>>>,
    pub model_used: &'static str,
}

/// Daily predictions for the next N days starting today.
#[derive(Debug, Clone, Serialize)]
pub struct TimeseriesForecast {
    pub dates: Vec<NaiveDate>,
    pub predictions: Vec<f64>,
    pub confidence: f64,
    pub model_used: &'static str,
}
