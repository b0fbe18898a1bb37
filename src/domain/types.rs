use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed reference zone for storage. All timestamps in the store and in
/// merged records are naive wall-clock times in this zone; fetched points are
/// normalized to it before persisting.
pub const REFERENCE_ZONE: Tz = chrono_tz::Europe::Stockholm;

/// Convert a timezone-aware instant to the naive storage convention.
pub fn to_reference_naive<T: TimeZone>(instant: DateTime<T>) -> NaiveDateTime {
    instant.with_timezone(&REFERENCE_ZONE).naive_local()
}

// ============================================================================
// Market Types
// ============================================================================

/// Identifier for a price bidding zone, e.g. `SE_4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AreaCode(String);

impl AreaCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AreaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AreaCode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("area code must not be empty");
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err("area code may only contain letters, digits, '_' and '-'");
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for AreaCode {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AreaCode> for String {
    fn from(area: AreaCode) -> Self {
        area.0
    }
}

/// One hourly day-ahead price observation. The area it belongs to is carried
/// separately by the store key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    /// Source-currency price; may be negative during oversupply.
    pub price_eur_per_mwh: f64,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, price_eur_per_mwh: f64) -> Self {
        Self {
            timestamp,
            price_eur_per_mwh,
        }
    }

    /// A point with a non-finite price cannot be persisted.
    pub fn is_valid(&self) -> bool {
        self.price_eur_per_mwh.is_finite()
    }
}

/// Extent of stored data for one area, computed on demand. Does NOT imply
/// contiguity: the store may contain holes inside `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub min: NaiveDateTime,
    pub max: NaiveDateTime,
    pub count: i64,
}

/// One hourly production observation, supplied by an external loader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionPoint {
    pub timestamp: NaiveDateTime,
    pub energy_kwh: f64,
}

impl ProductionPoint {
    pub fn new(timestamp: NaiveDateTime, energy_kwh: f64) -> Self {
        Self {
            timestamp,
            energy_kwh,
        }
    }
}

// ============================================================================
// Derived (transient) records
// ============================================================================

/// One hour present in both the price and the production series, with the
/// derived economics and the daily rollups broadcast onto it. Created fresh
/// on every merge; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub timestamp: NaiveDateTime,
    pub price_eur_per_mwh: f64,
    pub price_sek_per_kwh: f64,
    pub production_kwh: f64,
    /// Signed: negative when the price is negative (an economic cost).
    pub export_value_sek: f64,
    pub daily_production_kwh: f64,
    pub daily_price_eur_mean: f64,
    pub daily_export_value_sek: f64,
}

/// A single (timestamp, local price) sample inside a negative run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyPrice {
    pub timestamp: NaiveDateTime,
    pub price_sek_per_kwh: f64,
}

/// A maximal run of consecutive hours with negative price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegativePeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Count of hours in the run, not wall-clock span; the merged sequence
    /// may contain gaps between adjacent records.
    pub duration_hours: usize,
    pub min_price_sek_per_kwh: f64,
    pub avg_price_sek_per_kwh: f64,
    pub hourly_prices: Vec<HourlyPrice>,
}
