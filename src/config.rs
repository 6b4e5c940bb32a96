// Application settings
// Every section has defaults; a JSON file only needs the fields it overrides.

use crate::api::ClientConfig;
use crate::hours::HourSlot;
use crate::models::TableId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

// Upper bound for booking.max_days_in_future
pub const MAX_DAYS_IN_FUTURE: u32 = 366;

// Bounds of a quantity input (people, hours, product amount)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountLimits {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl Default for AmountLimits {
    fn default() -> Self {
        Self {
            min: 1,
            max: 9,
            default: 1,
        }
    }
}

impl AmountLimits {
    pub fn contains(&self, value: u32) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    // How far ahead the date picker reaches (inclusive window of max_days_in_future + 1 days)
    pub max_days_in_future: u32,
    pub opening_hour: HourSlot,
    pub closing_hour: HourSlot,
    pub tables: Vec<TableId>,
    pub starters: Vec<String>,
    pub people: AmountLimits,
    pub hours: AmountLimits,
    pub phone_digits: usize,
    pub min_address_length: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_days_in_future: 14,
            opening_hour: HourSlot::at(12),
            closing_hour: HourSlot::at(24),
            tables: vec![TableId::Number(1), TableId::Number(2), TableId::Number(3)],
            starters: vec!["water".to_string(), "bread".to_string()],
            people: AmountLimits::default(),
            hours: AmountLimits::default(),
            phone_digits: 9,
            min_address_length: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    pub default_delivery_fee: f64,
    pub amount: AmountLimits,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            default_delivery_fee: 20.0,
            amount: AmountLimits::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ClientConfig,
    pub booking: BookingConfig,
    pub cart: CartConfig,
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::InvalidSetting("api.base_url is empty".to_string()));
        }
        if self.booking.max_days_in_future > MAX_DAYS_IN_FUTURE {
            return Err(ConfigError::InvalidSetting(format!(
                "booking.max_days_in_future {} exceeds {}",
                self.booking.max_days_in_future, MAX_DAYS_IN_FUTURE
            )));
        }
        if self.booking.opening_hour >= self.booking.closing_hour {
            return Err(ConfigError::InvalidSetting(format!(
                "booking opens at {} but closes at {}",
                self.booking.opening_hour, self.booking.closing_hour
            )));
        }
        if self.booking.tables.is_empty() {
            return Err(ConfigError::InvalidSetting(
                "booking.tables is empty".to_string(),
            ));
        }
        if self.cart.default_delivery_fee < 0.0 {
            return Err(ConfigError::InvalidSetting(
                "cart.default_delivery_fee is negative".to_string(),
            ));
        }

        let limits = [
            ("booking.people", &self.booking.people),
            ("booking.hours", &self.booking.hours),
            ("cart.amount", &self.cart.amount),
        ];
        for (name, limit) in limits {
            if limit.min == 0 || !limit.contains(limit.default) {
                return Err(ConfigError::InvalidSetting(format!(
                    "{} limits {:?} are inconsistent",
                    name, limit
                )));
            }
        }

        Ok(())
    }
}
