//! Booking configuration: defaults, JSON file, environment overrides.

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::messages::Locale;
use crate::negotiator::NegotiatorSettings;
use crate::slots::{SchedulePolicy, MAX_HORIZON_DAYS};

/// Raw, serializable configuration. Call [`BookingConfig::schedule`] to get
/// validated, typed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Identifier of the shared calendar resource.
    pub calendar_id: String,
    /// IANA timezone every timestamp is normalized to.
    pub timezone: String,
    /// Days ahead (counted from tomorrow) that slots are offered for.
    pub horizon_days: u32,
    /// Opening time, `HH:MM`.
    pub work_start: String,
    /// Closing time, `HH:MM`.
    pub work_end: String,
    /// Weekday names, e.g. `["Mon", "Tue"]`.
    pub working_days: Vec<String>,
    pub slot_minutes: u32,
    pub max_offered_slots: usize,
    pub upstream_timeout_secs: u64,
    /// Chat that receives a note for every new booking.
    pub operator_channel: Option<String>,
    /// Status written to new ledger rows.
    pub status_label: String,
    pub default_locale: Locale,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            timezone: "Europe/Warsaw".to_string(),
            horizon_days: 14,
            work_start: "08:00".to_string(),
            work_end: "18:00".to_string(),
            working_days: ["Mon", "Tue", "Wed", "Thu", "Fri"]
                .into_iter()
                .map(String::from)
                .collect(),
            slot_minutes: 30,
            max_offered_slots: 10,
            upstream_timeout_secs: 10,
            operator_channel: None,
            status_label: "Nowe".to_string(),
            default_locale: Locale::Ru,
        }
    }
}

impl BookingConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; `apply_env` uses the process
    /// environment.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CALENDAR_ID") {
            self.calendar_id = v;
        }
        if let Some(v) = lookup("BOOKING_TIMEZONE") {
            self.timezone = v;
        }
        if let Some(v) = lookup("ADMIN_CHAT_ID") {
            self.operator_channel = (!v.trim().is_empty()).then_some(v);
        }
        if let Some(v) = lookup("BOOKING_HORIZON_DAYS") {
            self.horizon_days = parse_number("BOOKING_HORIZON_DAYS", &v)?;
        }
        if let Some(v) = lookup("BOOKING_SLOT_MINUTES") {
            self.slot_minutes = parse_number("BOOKING_SLOT_MINUTES", &v)?;
        }
        Ok(())
    }

    /// Validate and convert the scheduling part.
    pub fn schedule(&self) -> Result<SchedulePolicy, ConfigError> {
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))?;
        let work_start = parse_time("work_start", &self.work_start)?;
        let work_end = parse_time("work_end", &self.work_end)?;
        if work_start >= work_end {
            return Err(ConfigError::InvalidValue {
                key: "work_end",
                message: format!("{} is not after {}", self.work_end, self.work_start),
            });
        }
        if self.slot_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "slot_minutes",
                message: "must be positive".to_string(),
            });
        }
        if self.horizon_days > MAX_HORIZON_DAYS {
            return Err(ConfigError::InvalidValue {
                key: "horizon_days",
                message: format!("{} exceeds {} days", self.horizon_days, MAX_HORIZON_DAYS),
            });
        }
        let working_days = self
            .working_days
            .iter()
            .map(|d| {
                d.parse::<Weekday>()
                    .map_err(|_| ConfigError::InvalidWeekday(d.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SchedulePolicy {
            timezone,
            working_days,
            work_start,
            work_end,
            slot_minutes: self.slot_minutes,
            max_slots: self.max_offered_slots,
            horizon_days: self.horizon_days,
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn negotiator_settings(&self) -> NegotiatorSettings {
        NegotiatorSettings {
            operator_channel: self.operator_channel.clone(),
            status_label: self.status_label.clone(),
            timeout: self.upstream_timeout(),
        }
    }
}

fn parse_time(key: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime {
        key,
        value: value.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        message: format!("not a number: {value}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_workshop_calendar() {
        let policy = BookingConfig::default().schedule().unwrap();
        assert_eq!(policy, SchedulePolicy::default());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            BookingConfig::from_json_str(r#"{"slot_minutes": 45, "default_locale": "en"}"#).unwrap();
        assert_eq!(config.slot_minutes, 45);
        assert_eq!(config.default_locale, Locale::En);
        assert_eq!(config.horizon_days, 14);
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CALENDAR_ID", "garage@example.com"),
            ("ADMIN_CHAT_ID", "12345"),
            ("BOOKING_SLOT_MINUTES", "60"),
        ]
        .into_iter()
        .collect();
        let mut config = BookingConfig::default();
        config
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.calendar_id, "garage@example.com");
        assert_eq!(config.operator_channel.as_deref(), Some("12345"));
        assert_eq!(config.slot_minutes, 60);
    }

    #[test]
    fn bad_env_number_is_rejected() {
        let mut config = BookingConfig::default();
        let err = config
            .apply_vars(|k| (k == "BOOKING_HORIZON_DAYS").then(|| "two weeks".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "BOOKING_HORIZON_DAYS", .. }));
    }

    #[test]
    fn oversized_horizon_is_rejected() {
        let mut config = BookingConfig::default();
        config
            .apply_vars(|k| (k == "BOOKING_HORIZON_DAYS").then(|| "4294967295".to_string()))
            .unwrap();
        assert!(matches!(
            config.schedule(),
            Err(ConfigError::InvalidValue { key: "horizon_days", .. })
        ));

        config.horizon_days = MAX_HORIZON_DAYS;
        assert_eq!(config.schedule().unwrap().horizon_days, MAX_HORIZON_DAYS);
    }

    #[test]
    fn invalid_values_are_reported() {
        let config = BookingConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        assert!(matches!(config.schedule(), Err(ConfigError::InvalidTimezone(_))));

        let config = BookingConfig {
            work_start: "18:00".into(),
            work_end: "08:00".into(),
            ..Default::default()
        };
        assert!(matches!(config.schedule(), Err(ConfigError::InvalidValue { .. })));

        let config = BookingConfig {
            working_days: vec!["Funday".into()],
            ..Default::default()
        };
        assert!(matches!(config.schedule(), Err(ConfigError::InvalidWeekday(_))));

        let config = BookingConfig {
            work_start: "8am".into(),
            ..Default::default()
        };
        assert!(matches!(config.schedule(), Err(ConfigError::InvalidTime { .. })));
    }
}
