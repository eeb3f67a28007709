use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{PenaltySchedule, DEFAULT_TOLERANCE};
use crate::errors::{PacError, Result};

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub penalty: PenaltySchedule,
    /// absolute tolerance when comparing amount paid to amount due
    pub status_tolerance: Decimal,
    /// offset used to turn "now" into a calendar date
    pub utc_offset_hours: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            penalty: PenaltySchedule::standard(),
            status_tolerance: DEFAULT_TOLERANCE,
            // Central Africa Time, Maputo
            utc_offset_hours: 2,
        }
    }
}

impl EngineConfig {
    /// load from json, missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.penalty.validate()?;

        if self.status_tolerance < Decimal::ZERO {
            return Err(PacError::InvalidConfiguration {
                message: format!("status tolerance must not be negative, got {}", self.status_tolerance),
            });
        }

        self.offset()?;
        Ok(())
    }

    fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            PacError::InvalidConfiguration {
                message: format!("utc offset out of range: {} hours", self.utc_offset_hours),
            }
        })
    }

    /// local calendar date of an instant
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self.offset() {
            Ok(offset) => instant.with_timezone(&offset).date_naive(),
            Err(_) => instant.date_naive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_match_standard_schedule() {
        let config = EngineConfig::default();
        assert_eq!(config.penalty, PenaltySchedule::standard());
        assert_eq!(config.status_tolerance, dec!(0.001));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "utc_offset_hours": 0 }"#).unwrap();
        assert_eq!(config.utc_offset_hours, 0);
        assert_eq!(config.penalty.due_day, 5);
    }

    #[test]
    fn test_json_round_trip_of_schedule() {
        let json = EngineConfig::default().to_json_string().unwrap();
        let parsed = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }

    #[test]
    fn test_invalid_json_is_configuration_error() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Configuration);

        let err = EngineConfig::from_json_str(r#"{ "status_tolerance": "-1" }"#).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Configuration);
    }

    #[test]
    fn test_local_date_uses_offset() {
        let config = EngineConfig::default();
        // 23:30 UTC is already the next day in Maputo
        let instant = Utc.with_ymd_and_hms(2024, 12, 5, 23, 30, 0).unwrap();
        assert_eq!(config.local_date(instant), NaiveDate::from_ymd_opt(2024, 12, 6).unwrap());
    }
}
