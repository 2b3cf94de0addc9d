// libs/appointment-cell/src/services/slots.rs
use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Bookable consultation start times for a clinic day, 30 minutes apart.
pub const SLOT_CATALOG: [&str; 16] = [
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "12:00", "12:30",
    "13:00", "13:30", "14:00", "14:30", "15:00", "15:30", "16:00", "16:30",
];

/// A time-of-day that is guaranteed to be in the slot catalog.
///
/// Serialized as `HH:mm`. Ordering follows the catalog, which is also
/// chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotTime(u8);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotTimeError {
    #[error("Invalid time '{0}', expected HH:mm")]
    Malformed(String),

    #[error("Time '{0}' is not an available appointment slot")]
    NotOffered(String),
}

impl SlotTime {
    pub fn parse(raw: &str) -> Result<Self, SlotTimeError> {
        let parsed = NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|_| SlotTimeError::Malformed(raw.to_string()))?;
        let normalized = parsed.format("%H:%M").to_string();

        SLOT_CATALOG
            .iter()
            .position(|slot| *slot == normalized)
            .map(|index| SlotTime(index as u8))
            .ok_or_else(|| SlotTimeError::NotOffered(raw.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        SLOT_CATALOG[self.0 as usize]
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Every slot of the day in catalog order.
    pub fn all() -> impl Iterator<Item = SlotTime> {
        (0..SLOT_CATALOG.len()).map(|index| SlotTime(index as u8))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotTime {
    type Err = SlotTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotTime::parse(s)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SlotTime::parse(&raw).map_err(de::Error::custom)
    }
}
