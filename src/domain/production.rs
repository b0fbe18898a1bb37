//! Normalization contract for externally loaded production series.
//!
//! File parsing and format detection happen outside this crate; the merge
//! step only requires the series to be sorted and deduplicated by timestamp
//! with non-finite or negative readings dropped. This helper enforces that.

use std::collections::BTreeMap;

use tracing::debug;

use super::types::ProductionPoint;

/// Sort by timestamp, deduplicate (last observation wins) and drop readings
/// that are NaN, infinite or negative.
pub fn normalize_production(points: Vec<ProductionPoint>) -> Vec<ProductionPoint> {
    let raw_len = points.len();
    let by_timestamp: BTreeMap<_, _> = points
        .into_iter()
        .filter(|p| p.energy_kwh.is_finite() && p.energy_kwh >= 0.0)
        .map(|p| (p.timestamp, p.energy_kwh))
        .collect();

    let normalized: Vec<ProductionPoint> = by_timestamp
        .into_iter()
        .map(|(timestamp, energy_kwh)| ProductionPoint {
            timestamp,
            energy_kwh,
        })
        .collect();

    if normalized.len() != raw_len {
        debug!(
            raw = raw_len,
            kept = normalized.len(),
            "dropped invalid or duplicate production readings"
        );
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn hour(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    #[test]
    fn drops_nan_and_negative_readings() {
        let points = vec![
            ProductionPoint::new(hour(0), 1.0),
            ProductionPoint::new(hour(1), f64::NAN),
            ProductionPoint::new(hour(2), -0.5),
            ProductionPoint::new(hour(3), 0.0),
        ];
        let normalized = normalize_production(points);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].timestamp, hour(0));
        assert_eq!(normalized[1].timestamp, hour(3));
    }

    #[test]
    fn sorts_and_keeps_last_duplicate() {
        let points = vec![
            ProductionPoint::new(hour(2), 3.0),
            ProductionPoint::new(hour(0), 1.0),
            ProductionPoint::new(hour(2), 4.5),
        ];
        let normalized = normalize_production(points);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].timestamp, hour(0));
        assert_eq!(normalized[1].timestamp, hour(2));
        assert_eq!(normalized[1].energy_kwh, 4.5);
    }
}
