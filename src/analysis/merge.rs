//! Inner join of a price series and a production series.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::domain::{MergedRecord, PricePoint, ProductionPoint};

/// Fixed unit scale between the source's per-MWh prices and local per-kWh
/// prices. A unit fact, not a configuration knob.
const KWH_PER_MWH: f64 = 1000.0;

/// Merge prices and production on timestamp.
///
/// Inner-join semantics: hours present in only one series are dropped, not
/// null-filled. `eur_sek_rate` is the amount of SEK per EUR. Daily rollups
/// are grouped on the calendar date in the storage reference zone and
/// broadcast back onto every hourly record of that day. An empty join yields
/// an empty vector; [`crate::analysis::analyze`] rejects that downstream.
pub fn merge(
    prices: &[PricePoint],
    production: &[ProductionPoint],
    eur_sek_rate: f64,
) -> Vec<MergedRecord> {
    let production_by_hour: BTreeMap<NaiveDateTime, f64> = production
        .iter()
        .map(|p| (p.timestamp, p.energy_kwh))
        .collect();

    let mut records: Vec<MergedRecord> = prices
        .iter()
        .filter_map(|price| {
            production_by_hour.get(&price.timestamp).map(|&production_kwh| {
                let price_sek_per_kwh =
                    price.price_eur_per_mwh * eur_sek_rate / KWH_PER_MWH;
                MergedRecord {
                    timestamp: price.timestamp,
                    price_eur_per_mwh: price.price_eur_per_mwh,
                    price_sek_per_kwh,
                    production_kwh,
                    // Signed: a negative price makes the hour a cost.
                    export_value_sek: production_kwh * price_sek_per_kwh,
                    daily_production_kwh: 0.0,
                    daily_price_eur_mean: 0.0,
                    daily_export_value_sek: 0.0,
                }
            })
        })
        .collect();
    records.sort_by_key(|r| r.timestamp);

    broadcast_daily_rollups(&mut records);

    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        info!(
            rows = records.len(),
            from = %first.timestamp,
            to = %last.timestamp,
            "merged price and production series"
        );
    }

    records
}

#[derive(Default)]
struct DayTotals {
    production_kwh: f64,
    price_eur_sum: f64,
    hours: usize,
    export_value_sek: f64,
}

fn broadcast_daily_rollups(records: &mut [MergedRecord]) {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    for record in records.iter() {
        let day = days.entry(record.timestamp.date()).or_default();
        day.production_kwh += record.production_kwh;
        day.price_eur_sum += record.price_eur_per_mwh;
        day.hours += 1;
        day.export_value_sek += record.export_value_sek;
    }
    for record in records.iter_mut() {
        let day = &days[&record.timestamp.date()];
        record.daily_production_kwh = day.production_kwh;
        record.daily_price_eur_mean = day.price_eur_sum / day.hours as f64;
        record.daily_export_value_sek = day.export_value_sek;
    }
}
