use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use crate::domain::features::FeatureSet;
use crate::domain::forecast::{
    HourlyForecast, PeakForecast, TimeseriesForecast, WeeklyForecast, YearlyForecast,
};
use crate::error::ForecastError;
use crate::forecast::seasonal;
use crate::models::{ModelRegistry, MODEL_FALLBACK};
use crate::time::calendar;

/// Operational window for the hourly forecast, inclusive.
pub const OPERATIONAL_HOURS: std::ops::RangeInclusive<u32> = 4..=20;

/// Upper bound on the timeseries horizon; keeps a single request O(days).
pub const MAX_TIMESERIES_PERIODS: i64 = 365;

// The yearly grid draws its noise from a fixed seed: two calls for the same
// year must produce identical grids. The other paths are deliberately
// unseeded.
const YEARLY_NOISE_SEED: u64 = 42;

const PEAK_MODEL_CONFIDENCE: f64 = 0.85;
const TIMESERIES_MODEL_CONFIDENCE: f64 = 0.8;
const FALLBACK_CONFIDENCE: f64 = 0.5;

const PEAK_FLOOR: f64 = 10.0;
const WEEKLY_FLOOR: f64 = 1000.0;
const YEARLY_FLOOR: f64 = 800.0;
const TIMESERIES_MODEL_FLOOR: f64 = 15.0;
const TIMESERIES_FALLBACK_FLOOR: f64 = 20.0;

const WEEKLY_NOISE_SIGMA: f64 = 200.0;
const YEARLY_NOISE_SIGMA: f64 = 120.0;
const TIMESERIES_MODEL_SIGMA: f64 = 8.0;
const TIMESERIES_FALLBACK_SIGMA: f64 = 12.0;

/// Produces demand predictions at every supported granularity, preferring a
/// registered model and falling back to the seasonal heuristic otherwise.
///
/// The registry is injected at construction and read-only afterwards, so one
/// generator can serve concurrent requests. Operations that depend on "now"
/// take the instant as an argument.
pub struct ForecastGenerator {
    registry: ModelRegistry,
}

impl ForecastGenerator {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Single-point peak demand for a validated feature set.
    pub fn predict_peak(&self, features: &FeatureSet) -> Result<PeakForecast, ForecastError> {
        if let Some(model) = self.registry.peak() {
            let prediction = model.predict(features).map_err(ForecastError::Internal)?;
            return Ok(PeakForecast {
                prediction,
                confidence: PEAK_MODEL_CONFIDENCE,
                model_used: model.name(),
            });
        }

        // Parabola centered at noon; quiet at the edges of the day.
        let mut base = 30.0 + (features.hour as f64 - 12.0).powi(2) * 0.5;
        if features.is_weekend {
            base *= 0.7;
        }

        Ok(PeakForecast {
            prediction: base.max(PEAK_FLOOR),
            confidence: FALLBACK_CONFIDENCE,
            model_used: MODEL_FALLBACK,
        })
    }

    /// One prediction per hour across the operational window. `peak_hour` is
    /// the first hour reaching the maximum under a left-to-right scan.
    pub fn hourly_forecast(&self, now: DateTime<Utc>) -> Result<HourlyForecast, ForecastError> {
        let weekday = now.date_naive().weekday().num_days_from_monday();
        let mut rng = rand::rng();

        let span = OPERATIONAL_HOURS.count();
        let mut hours = Vec::with_capacity(span);
        let mut predictions = Vec::with_capacity(span);
        let mut peak_hour = *OPERATIONAL_HOURS.start();
        let mut peak_value = 0.0_f64;

        for hour in OPERATIONAL_HOURS {
            let features = FeatureSet {
                hour,
                weekday,
                is_holiday: false,
                daily_trend: (hour as f64 - 4.0) / 16.0,
                is_weekend: false,
            };

            let prediction = match self.registry.peak() {
                Some(model) => model.predict(&features).map_err(ForecastError::Internal)?,
                None => {
                    let (base, sigma) = seasonal::hourly_band(hour);
                    base + gaussian(&mut rng, sigma)?
                }
            };

            hours.push(hour);
            predictions.push(prediction);
            if prediction > peak_value {
                peak_value = prediction;
                peak_hour = hour;
            }
        }

        let model_used = self
            .registry
            .peak()
            .map(|m| m.name())
            .unwrap_or(MODEL_FALLBACK);

        Ok(HourlyForecast {
            hours,
            predictions,
            peak_hour,
            peak_value,
            model_used,
        })
    }

    /// Seven daily predictions for the week containing `now`, anchored on the
    /// most recent Sunday.
    pub fn weekly_forecast(&self, now: DateTime<Utc>) -> Result<WeeklyForecast, ForecastError> {
        let start = calendar::week_start_sunday(now.date_naive());
        let mut rng = rand::rng();

        let mut dates = Vec::with_capacity(7);
        let mut predictions = Vec::with_capacity(7);
        for offset in 0..7 {
            let date = start + Duration::days(offset);
            let base = seasonal::weekly_weekday_base(date.weekday());
            let factor = seasonal::weekly_seasonal_factor(date.month());
            let pred = (base * factor + gaussian(&mut rng, WEEKLY_NOISE_SIGMA)?).max(WEEKLY_FLOOR);

            dates.push(date);
            predictions.push(pred);
        }

        let model_used = self
            .registry
            .timeseries()
            .map(|m| m.name())
            .unwrap_or(MODEL_FALLBACK);

        Ok(WeeklyForecast {
            dates,
            predictions,
            model_used,
        })
    }

    /// Full-year daily grid, 12 months by 31 day slots. Cells for days that
    /// do not exist in a month stay `None`; the rest are reproducible across
    /// calls for the same year.
    pub fn yearly_daily_forecast(&self, year: i32) -> Result<YearlyForecast, ForecastError> {
        if !(1900..=2200).contains(&year) {
            return Err(ForecastError::validation(format!(
                "year must be in 1900..=2200 (got {year})"
            )));
        }

        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| ForecastError::Internal(anyhow::anyhow!("invalid year {year}")))?;

        let mut rng = StdRng::seed_from_u64(YEARLY_NOISE_SEED);
        let mut grid = vec![vec![None; 31]; 12];

        for date in start.iter_days().take_while(|d| d.year() == year) {
            let base = seasonal::yearly_weekday_base(date.weekday());
            let factor = seasonal::yearly_seasonal_factor(date.month());
            // Smooth growth across the year, ~18% by late December.
            let trend = 1.0 + 0.0005 * date.ordinal() as f64;
            let noise = gaussian(&mut rng, YEARLY_NOISE_SIGMA)?;

            let pred = (base * factor * trend + noise).max(YEARLY_FLOOR);
            grid[date.month0() as usize][date.day0() as usize] = Some(pred);
        }

        let model_used = self
            .registry
            .timeseries()
            .map(|m| m.name())
            .unwrap_or(MODEL_FALLBACK);

        Ok(YearlyForecast {
            year,
            grid,
            model_used,
        })
    }

    /// Daily predictions for the next `periods` days starting today.
    pub fn timeseries_forecast(
        &self,
        periods: u32,
        now: DateTime<Utc>,
    ) -> Result<TimeseriesForecast, ForecastError> {
        let today = now.date_naive();
        let mut rng = rand::rng();

        let model = self.registry.timeseries();
        let mut dates = Vec::with_capacity(periods as usize);
        let mut predictions = Vec::with_capacity(periods as usize);

        for offset in 0..i64::from(periods) {
            let date = today + Duration::days(offset);
            let weekend = calendar::is_weekend(date);

            // TODO: score the registered model here once a multi-step ONNX
            // export exists; until then a registered model only selects the
            // tighter profile below.
            let pred = match model {
                Some(_) => {
                    let mut demand = 45.0 + gaussian(&mut rng, TIMESERIES_MODEL_SIGMA)?;
                    if weekend {
                        demand *= 0.6;
                    }
                    demand.max(TIMESERIES_MODEL_FLOOR)
                }
                None => {
                    let base = if weekend { 40.0 } else { 55.0 };
                    (base + gaussian(&mut rng, TIMESERIES_FALLBACK_SIGMA)?)
                        .max(TIMESERIES_FALLBACK_FLOOR)
                }
            };

            dates.push(date);
            predictions.push(pred);
        }

        let (confidence, model_used) = match model {
            Some(m) => (TIMESERIES_MODEL_CONFIDENCE, m.name()),
            None => (FALLBACK_CONFIDENCE, MODEL_FALLBACK),
        };

        Ok(TimeseriesForecast {
            dates,
            predictions,
            confidence,
            model_used,
        })
    }
}

/// Horizon arrives from the wire as an optional integer; absence and
/// out-of-range values are client errors.
pub fn validate_periods(periods: Option<i64>) -> Result<u32, ForecastError> {
    let Some(periods) = periods else {
        return Err(ForecastError::validation("Periods data required"));
    };
    if !(0..=MAX_TIMESERIES_PERIODS).contains(&periods) {
        return Err(ForecastError::validation(format!(
            "periods must be in 0..={MAX_TIMESERIES_PERIODS} (got {periods})"
        )));
    }
    Ok(periods as u32)
}

fn gaussian(rng: &mut impl Rng, sigma: f64) -> Result<f64, ForecastError> {
    let dist = Normal::new(0.0, sigma).map_err(|e| {
        ForecastError::Internal(anyhow::anyhow!("invalid noise sigma {sigma}: {e}"))
    })?;
    Ok(rng.sample(dist))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DemandModel, MODEL_PROPHET_PEAK, MODEL_XGBOOST_PEAK};
    use chrono::{TimeZone, Weekday};
    use std::sync::Arc;

    struct StubModel {
        name: &'static str,
        value: f64,
    }

    impl DemandModel for StubModel {
        fn name(&self) -> &'static str {
            self.name
        }

        fn predict(&self, _features: &FeatureSet) -> anyhow::Result<f64> {
            Ok(self.value)
        }
    }

    fn fallback_generator() -> ForecastGenerator {
        ForecastGenerator::new(ModelRegistry::empty())
    }

    fn features(hour: u32, weekday: u32, is_weekend: bool) -> FeatureSet {
        FeatureSet {
            hour,
            weekday,
            is_holiday: false,
            daily_trend: 0.5,
            is_weekend,
        }
    }

    // 2026-08-05 is a Wednesday.
    fn wednesday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 5, 9, 30, 0).unwrap()
    }

    #[test]
    fn peak_fallback_is_flat_at_noon() {
        let peak = fallback_generator()
            .predict_peak(&features(12, 2, false))
            .unwrap();
        assert_eq!(peak.prediction, 30.0);
        assert_eq!(peak.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(peak.model_used, MODEL_FALLBACK);
    }

    #[test]
    fn peak_fallback_discounts_weekends() {
        let peak = fallback_generator()
            .predict_peak(&features(12, 5, true))
            .unwrap();
        assert_eq!(peak.prediction, 21.0);
    }

    #[test]
    fn peak_fallback_never_drops_below_floor() {
        let generator = fallback_generator();
        for hour in 0..24 {
            for is_weekend in [false, true] {
                let peak = generator
                    .predict_peak(&features(hour, 0, is_weekend))
                    .unwrap();
                assert!(peak.prediction >= PEAK_FLOOR);
            }
        }
    }

    #[test]
    fn peak_model_output_is_reported_verbatim() {
        let registry = ModelRegistry::empty().with_peak(Arc::new(StubModel {
            name: MODEL_XGBOOST_PEAK,
            value: 123.45,
        }));
        let peak = ForecastGenerator::new(registry)
            .predict_peak(&features(12, 2, false))
            .unwrap();
        assert_eq!(peak.prediction, 123.45);
        assert_eq!(peak.confidence, PEAK_MODEL_CONFIDENCE);
        assert_eq!(peak.model_used, MODEL_XGBOOST_PEAK);
    }

    #[test]
    fn hourly_covers_the_operational_window() {
        let hourly = fallback_generator().hourly_forecast(wednesday()).unwrap();
        assert_eq!(hourly.hours.len(), 17);
        assert_eq!(hourly.predictions.len(), 17);
        assert_eq!(hourly.hours.first(), Some(&4));
        assert_eq!(hourly.hours.last(), Some(&20));
        assert_eq!(hourly.model_used, MODEL_FALLBACK);
    }

    #[test]
    fn hourly_peak_is_first_maximal_hour() {
        let hourly = fallback_generator().hourly_forecast(wednesday()).unwrap();
        let max = hourly
            .predictions
            .iter()
            .cloned()
            .fold(f64::MIN, f64::max);
        let first_max = hourly
            .predictions
            .iter()
            .position(|&p| p == max)
            .unwrap();
        assert_eq!(hourly.peak_hour, hourly.hours[first_max]);
        assert_eq!(hourly.peak_value, max);
    }

    #[test]
    fn hourly_tie_break_picks_the_earliest_hour() {
        // A constant model makes every hour tie; the scan keeps the first.
        let registry = ModelRegistry::empty().with_peak(Arc::new(StubModel {
            name: MODEL_XGBOOST_PEAK,
            value: 50.0,
        }));
        let hourly = ForecastGenerator::new(registry)
            .hourly_forecast(wednesday())
            .unwrap();
        assert_eq!(hourly.peak_hour, 4);
        assert_eq!(hourly.peak_value, 50.0);
        assert_eq!(hourly.model_used, MODEL_XGBOOST_PEAK);
    }

    #[test]
    fn weekly_anchors_on_sunday() {
        let weekly = fallback_generator().weekly_forecast(wednesday()).unwrap();
        assert_eq!(weekly.dates.len(), 7);
        assert_eq!(weekly.predictions.len(), 7);
        assert_eq!(weekly.dates[0].weekday(), Weekday::Sun);
        assert_eq!(
            weekly.dates[0],
            NaiveDate::from_ymd_opt(2026, 8, 2).unwrap()
        );
        for pair in weekly.dates.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }

    #[test]
    fn weekly_anchors_sunday_to_itself() {
        let sunday = Utc.with_ymd_and_hms(2026, 8, 2, 12, 0, 0).unwrap();
        let weekly = fallback_generator().weekly_forecast(sunday).unwrap();
        assert_eq!(weekly.dates[0], sunday.date_naive());
    }

    #[test]
    fn weekly_respects_the_demand_floor() {
        let weekly = fallback_generator().weekly_forecast(wednesday()).unwrap();
        for pred in &weekly.predictions {
            assert!(*pred >= WEEKLY_FLOOR);
        }
    }

    #[test]
    fn yearly_grid_is_deterministic_per_year() {
        let generator = fallback_generator();
        let a = generator.yearly_daily_forecast(2026).unwrap();
        let b = generator.yearly_daily_forecast(2026).unwrap();
        assert_eq!(a.grid, b.grid);
    }

    #[test]
    fn yearly_grid_shape_and_floors() {
        let yearly = fallback_generator().yearly_daily_forecast(2026).unwrap();
        assert_eq!(yearly.grid.len(), 12);
        for row in &yearly.grid {
            assert_eq!(row.len(), 31);
        }
        for (month0, row) in yearly.grid.iter().enumerate() {
            for (day0, cell) in row.iter().enumerate() {
                let exists =
                    NaiveDate::from_ymd_opt(2026, month0 as u32 + 1, day0 as u32 + 1).is_some();
                match cell {
                    Some(pred) => {
                        assert!(exists, "month {month0} day {day0} should not exist");
                        assert!(*pred >= YEARLY_FLOOR);
                    }
                    None => assert!(!exists, "month {month0} day {day0} should have a value"),
                }
            }
        }
    }

    #[test]
    fn yearly_grid_handles_leap_years() {
        let generator = fallback_generator();
        let leap = generator.yearly_daily_forecast(2024).unwrap();
        assert!(leap.grid[1][28].is_some());
        let common = generator.yearly_daily_forecast(2026).unwrap();
        assert!(common.grid[1][28].is_none());
    }

    #[test]
    fn yearly_rejects_out_of_range_years() {
        let err = fallback_generator().yearly_daily_forecast(1500).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    #[test]
    fn timeseries_fallback_produces_consecutive_days() {
        let ts = fallback_generator()
            .timeseries_forecast(3, wednesday())
            .unwrap();
        assert_eq!(ts.predictions.len(), 3);
        assert_eq!(ts.dates.len(), 3);
        assert_eq!(ts.dates[0], wednesday().date_naive());
        for pair in ts.dates.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
        for pred in &ts.predictions {
            assert!(*pred >= TIMESERIES_FALLBACK_FLOOR);
        }
        assert_eq!(ts.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(ts.model_used, MODEL_FALLBACK);
    }

    #[test]
    fn timeseries_model_path_tightens_confidence() {
        let registry = ModelRegistry::empty().with_timeseries(Arc::new(StubModel {
            name: MODEL_PROPHET_PEAK,
            value: 0.0,
        }));
        let ts = ForecastGenerator::new(registry)
            .timeseries_forecast(14, wednesday())
            .unwrap();
        assert_eq!(ts.predictions.len(), 14);
        for pred in &ts.predictions {
            assert!(*pred >= TIMESERIES_MODEL_FLOOR);
        }
        assert_eq!(ts.confidence, TIMESERIES_MODEL_CONFIDENCE);
        assert_eq!(ts.model_used, MODEL_PROPHET_PEAK);
    }

    #[test]
    fn timeseries_zero_periods_is_empty() {
        let ts = fallback_generator()
            .timeseries_forecast(0, wednesday())
            .unwrap();
        assert!(ts.predictions.is_empty());
        assert!(ts.dates.is_empty());
    }

    #[test]
    fn periods_must_be_present_and_in_range() {
        let err = validate_periods(None).unwrap_err();
        assert_eq!(err.to_string(), "Periods data required");

        assert!(validate_periods(Some(-1)).is_err());
        assert!(validate_periods(Some(MAX_TIMESERIES_PERIODS + 1)).is_err());
        assert_eq!(validate_periods(Some(3)).unwrap(), 3);
    }

    #[test]
    fn weekly_model_flag_reflects_registry() {
        let registry = ModelRegistry::empty().with_timeseries(Arc::new(StubModel {
            name: MODEL_PROPHET_PEAK,
            value: 0.0,
        }));
        let weekly = ForecastGenerator::new(registry)
            .weekly_forecast(wednesday())
            .unwrap();
        assert_eq!(weekly.model_used, MODEL_PROPHET_PEAK);
    }
}
