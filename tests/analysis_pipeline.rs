//! End-to-end pipeline: cache fill, production normalization, merge,
//! analysis and negative-run detection working together.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use elwatt::domain::normalize_production;
use elwatt::{
    analyze, detect_negative_periods, merge, AreaCode, PriceCache, PricePoint, PriceSource,
    PriceStore, ProductionPoint,
};

fn hour(h: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::hours(h)
}

/// Two days of prices: mostly positive, with a negative stretch around
/// midday of the first day (hours 11..=13) and a lone dip at hour 30.
struct SolsticeSource;

#[async_trait]
impl PriceSource for SolsticeSource {
    async fn fetch_day_ahead(
        &self,
        _area: &AreaCode,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> anyhow::Result<Vec<PricePoint>> {
        let base = hour(0);
        let mut points = Vec::new();
        let mut t = start;
        while t <= end {
            let h = (t - base).num_hours();
            let price = match h {
                11..=13 => -25.0,
                30 => -60.0,
                _ => 80.0,
            };
            points.push(PricePoint::new(t, price));
            t += Duration::hours(1);
        }
        Ok(points)
    }
}

#[tokio::test]
async fn cache_to_summary_pipeline() {
    let store = PriceStore::open_in_memory().await.unwrap();
    let cache = PriceCache::new(store, Some(Arc::new(SolsticeSource)));
    let area: AreaCode = "SE_4".parse().unwrap();

    let prices = cache.get(&area, hour(0), hour(47)).await.unwrap();
    assert_eq!(prices.len(), 48);

    // Production for both days, daylight hours only, with a few bad rows the
    // loader contract drops.
    let mut raw: Vec<ProductionPoint> = (0..48)
        .filter(|h| (6..=18).contains(&(h % 24)))
        .map(|h| ProductionPoint::new(hour(h), 3.0))
        .collect();
    raw.push(ProductionPoint::new(hour(12), f64::NAN));
    raw.push(ProductionPoint::new(hour(12), 3.0)); // duplicate, last wins
    let production = normalize_production(raw);

    let merged = merge(&prices, &production, 11.5);
    // 13 daylight hours per day, both series cover both days.
    assert_eq!(merged.len(), 26);

    let summary = analyze(&merged).unwrap();
    assert_eq!(summary.total_hours, 26);
    assert_eq!(summary.period_days, 1);
    // Negative hours inside the join: 11, 12, 13 on day one; hour 30 (06:00
    // on day two) is daylight too.
    assert_eq!(summary.negative_price_hours, 4);
    assert_eq!(summary.production_during_negative_prices_kwh, 12.0);
    assert!(summary.negative_export_cost_abs_sek > 0.0);
    assert_eq!(summary.hours_with_production, 26);

    let runs = detect_negative_periods(&merged);
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].start, hour(11));
    assert_eq!(runs[0].end, hour(13));
    assert_eq!(runs[0].duration_hours, 3);
    assert_eq!(runs[1].start, hour(30));
    assert_eq!(runs[1].duration_hours, 1);

    // Detector and summary agree on exposure.
    let run_hours: usize = runs.iter().map(|r| r.duration_hours).sum();
    assert_eq!(run_hours, summary.negative_price_hours);
}
