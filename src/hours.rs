// Half-hour time slots used by the booking calendar
// The backend speaks "HH:MM" strings, the calendar works on numeric hours (13.5 == 13:30)

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HourError {
    #[error("Invalid hour format: {0}")]
    InvalidFormat(String),

    #[error("Hour is not on a half-hour boundary: {0}")]
    NotHalfHour(String),

    #[error("Hour out of range: {0}")]
    OutOfRange(String),
}

// A point in the day at half-hour resolution, stored as half-hours since midnight.
// Slots past 24:00 are legal: a booking that starts at 23:30 and lasts two
// hours keeps its tail on the same calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HourSlot(u16);

impl HourSlot {
    pub const fn from_half_hours(half_hours: u16) -> Self {
        Self(half_hours)
    }

    // Whole hour, e.g. HourSlot::at(12) == 12:00
    pub const fn at(hour: u16) -> Self {
        Self(hour * 2)
    }

    pub fn half_hours(self) -> u16 {
        self.0
    }

    pub fn from_hours(hours: f64) -> Result<Self, HourError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(HourError::OutOfRange(hours.to_string()));
        }

        let doubled = hours * 2.0;
        if doubled.fract() != 0.0 {
            return Err(HourError::NotHalfHour(hours.to_string()));
        }
        if doubled > u16::MAX as f64 {
            return Err(HourError::OutOfRange(hours.to_string()));
        }

        Ok(Self(doubled as u16))
    }

    pub fn as_hours(self) -> f64 {
        self.0 as f64 / 2.0
    }

    // The slot `steps` half-hours later
    pub fn offset(self, steps: u16) -> Self {
        Self(self.0.saturating_add(steps))
    }

    pub fn parse(value: &str) -> Result<Self, HourError> {
        let (hours, minutes) = value
            .trim()
            .split_once(':')
            .ok_or_else(|| HourError::InvalidFormat(value.to_string()))?;

        let hours: u16 = hours
            .parse()
            .map_err(|_| HourError::InvalidFormat(value.to_string()))?;
        let minutes: u16 = minutes
            .parse()
            .map_err(|_| HourError::InvalidFormat(value.to_string()))?;

        if minutes >= 60 {
            return Err(HourError::InvalidFormat(value.to_string()));
        }
        if minutes % 30 != 0 {
            return Err(HourError::NotHalfHour(value.to_string()));
        }

        hours
            .checked_mul(2)
            .and_then(|h| h.checked_add(minutes / 30))
            .map(Self)
            .ok_or_else(|| HourError::OutOfRange(value.to_string()))
    }
}

// Number of half-hour slots a duration covers.
// Walks 0.5 steps while the offset is still below `duration`, so 1.2 hours
// touches three slots. Non-positive or non-finite durations cover nothing.
pub fn slots_in_duration(duration: f64) -> u16 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0;
    }
    (duration * 2.0).ceil().min(u16::MAX as f64) as u16
}

impl fmt::Display for HourSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 2, (self.0 % 2) * 30)
    }
}

impl FromStr for HourSlot {
    type Err = HourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for HourSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct HourSlotVisitor;

impl<'de> Visitor<'de> for HourSlotVisitor {
    type Value = HourSlot;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an \"HH:MM\" string or a numeric hour")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<HourSlot, E> {
        HourSlot::parse(v).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<HourSlot, E> {
        HourSlot::from_hours(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<HourSlot, E> {
        self.visit_f64(v as f64)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<HourSlot, E> {
        self.visit_f64(v as f64)
    }
}

impl<'de> Deserialize<'de> for HourSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(HourSlotVisitor)
    }
}
