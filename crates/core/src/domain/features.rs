use serde::Deserialize;

use crate::error::ForecastError;

/// Validated model input for a single-point prediction.
///
/// `weekday` follows the Monday=0..Sunday=6 convention used throughout the
/// service. `is_weekend` is an independent request flag, not derived from
/// `weekday`, and defaults to false when the client omits it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub hour: u32,
    pub weekday: u32,
    pub is_holiday: bool,
    pub daily_trend: f64,
    pub is_weekend: bool,
}

impl FeatureSet {
    /// Row layout expected by registered models: one value per column, in
    /// (hour, weekday, is_holiday, daily_trend) order.
    pub fn to_model_row(&self) -> [f32; 4] {
        [
            self.hour as f32,
            self.weekday as f32,
            if self.is_holiday { 1.0 } else { 0.0 },
            self.daily_trend as f32,
        ]
    }
}

/// Wire shape of the `features` object before validation. Every field is
/// optional so a missing key can be reported by name instead of failing
/// deserialization wholesale.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFeatures {
    pub hour: Option<i64>,
    pub weekday: Option<i64>,
    pub is_holiday: Option<Flag>,
    pub daily_trend: Option<f64>,
    pub is_weekend: Option<Flag>,
}

/// Boolean-ish inputs arrive as JSON bools or 0/1 integers.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn as_bool(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(n) => n != 0,
        }
    }
}

impl RawFeatures {
    /// Checks the four required fields in declaration order (the first missing
    /// one is the one reported), then range-checks each value.
    pub fn validate_into_features(self) -> Result<FeatureSet, ForecastError> {
        let Some(hour) = self.hour else {
            return Err(ForecastError::missing_feature("hour"));
        };
        let Some(weekday) = self.weekday else {
            return Err(ForecastError::missing_feature("weekday"));
        };
        let Some(is_holiday) = self.is_holiday else {
            return Err(ForecastError::missing_feature("is_holiday"));
        };
        let Some(daily_trend) = self.daily_trend else {
            return Err(ForecastError::missing_feature("daily_trend"));
        };

        if !(0..=23).contains(&hour) {
            return Err(ForecastError::validation(format!(
                "hour must be in 0..=23 (got {hour})"
            )));
        }
        if !(0..=6).contains(&weekday) {
            return Err(ForecastError::validation(format!(
                "weekday must be in 0..=6 (got {weekday})"
            )));
        }
        if !(0.0..=1.0).contains(&daily_trend) {
            return Err(ForecastError::validation(format!(
                "daily_trend must be in 0.0..=1.0 (got {daily_trend})"
            )));
        }

        Ok(FeatureSet {
            hour: hour as u32,
            weekday: weekday as u32,
            is_holiday: is_holiday.as_bool(),
            daily_trend,
            is_weekend: self.is_weekend.map(Flag::as_bool).unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> RawFeatures {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn accepts_numeric_flags() {
        let raw = parse(json!({
            "hour": 12,
            "weekday": 2,
            "is_holiday": 0,
            "daily_trend": 0.5,
        }));
        let features = raw.validate_into_features().unwrap();
        assert_eq!(features.hour, 12);
        assert_eq!(features.weekday, 2);
        assert!(!features.is_holiday);
        assert!(!features.is_weekend);
    }

    #[test]
    fn accepts_boolean_flags() {
        let raw = parse(json!({
            "hour": 8,
            "weekday": 5,
            "is_holiday": true,
            "daily_trend": 0.25,
            "is_weekend": true,
        }));
        let features = raw.validate_into_features().unwrap();
        assert!(features.is_holiday);
        assert!(features.is_weekend);
    }

    #[test]
    fn reports_first_missing_field() {
        let raw = parse(json!({ "daily_trend": 0.5 }));
        let err = raw.validate_into_features().unwrap_err();
        assert_eq!(err.to_string(), "Missing required feature: hour");

        let raw = parse(json!({ "hour": 12, "weekday": 2, "daily_trend": 0.5 }));
        let err = raw.validate_into_features().unwrap_err();
        assert_eq!(err.to_string(), "Missing required feature: is_holiday");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let raw = parse(json!({
            "hour": 24,
            "weekday": 2,
            "is_holiday": 0,
            "daily_trend": 0.5,
        }));
        let err = raw.validate_into_features().unwrap_err();
        assert!(err.to_string().contains("hour"));

        let raw = parse(json!({
            "hour": 12,
            "weekday": 7,
            "is_holiday": 0,
            "daily_trend": 0.5,
        }));
        let err = raw.validate_into_features().unwrap_err();
        assert!(err.to_string().contains("weekday"));

        let raw = parse(json!({
            "hour": 12,
            "weekday": 2,
            "is_holiday": 0,
            "daily_trend": 1.5,
        }));
        let err = raw.validate_into_features().unwrap_err();
        assert!(err.to_string().contains("daily_trend"));
    }

    #[test]
    fn model_row_follows_column_order() {
        let features = FeatureSet {
            hour: 7,
            weekday: 1,
            is_holiday: true,
            daily_trend: 0.1875,
            is_weekend: false,
        };
        assert_eq!(features.to_model_row(), [7.0, 1.0, 1.0, 0.1875]);
    }
}
