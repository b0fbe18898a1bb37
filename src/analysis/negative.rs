//! Negative-price run detection and financial impact breakdown.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{HourlyPrice, MergedRecord, NegativePeriod};
use crate::error::PriceDataError;

/// Group consecutive negative-price hours into runs, ordered by start time.
///
/// The input is assumed sorted by timestamp and may contain arbitrary gaps
/// between adjacent records; a gap does not close a run, only an explicit
/// non-negative price does. A series that starts or ends negative uses the
/// first/last record's timestamp as the run boundary. Runs with zero
/// production are still emitted; callers wanting only runs with financial
/// impact filter by production themselves.
pub fn detect_negative_periods(merged: &[MergedRecord]) -> Vec<NegativePeriod> {
    let mut periods = Vec::new();
    let mut run: Vec<HourlyPrice> = Vec::new();

    for record in merged {
        if record.price_sek_per_kwh < 0.0 {
            run.push(HourlyPrice {
                timestamp: record.timestamp,
                price_sek_per_kwh: record.price_sek_per_kwh,
            });
        } else if !run.is_empty() {
            periods.push(close_run(std::mem::take(&mut run)));
        }
    }
    if !run.is_empty() {
        periods.push(close_run(run));
    }

    periods
}

fn close_run(hourly_prices: Vec<HourlyPrice>) -> NegativePeriod {
    let prices: Vec<f64> = hourly_prices.iter().map(|h| h.price_sek_per_kwh).collect();
    NegativePeriod {
        start: hourly_prices[0].timestamp,
        end: hourly_prices[hourly_prices.len() - 1].timestamp,
        duration_hours: hourly_prices.len(),
        min_price_sek_per_kwh: prices.iter().copied().fold(f64::INFINITY, f64::min),
        avg_price_sek_per_kwh: prices.iter().sum::<f64>() / prices.len() as f64,
        hourly_prices,
    }
}

/// Aggregated cost of exporting during negative prices for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyNegativeCost {
    pub year: i32,
    pub month: u32,
    pub production_kwh: f64,
    pub cost_sek: f64,
}

/// Aggregated cost of exporting during negative prices for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyNegativeCost {
    pub date: NaiveDate,
    pub production_kwh: f64,
    pub cost_sek: f64,
}

/// One of the costliest negative-price hours with production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpensiveHour {
    pub timestamp: NaiveDateTime,
    pub production_kwh: f64,
    pub price_sek_per_kwh: f64,
    pub cost_sek: f64,
}

/// Detailed breakdown of what negative prices cost over the series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegativeImpactReport {
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub total_hours: usize,
    pub negative_price_hours: usize,
    pub negative_hours_with_production: usize,

    /// Production exported during negative-price hours.
    pub total_production_kwh: f64,
    /// Mean over negative hours that actually had production.
    pub avg_hourly_production_kwh: f64,
    pub max_hourly_production_kwh: f64,
    pub lowest_price_sek_per_kwh: f64,
    pub avg_negative_price_sek_per_kwh: f64,

    /// Absolute cost of exporting during negative prices.
    pub total_cost_sek: f64,
    pub total_export_value_sek: f64,
    pub positive_export_value_sek: f64,
    /// Cost as a percentage of positive-price export income.
    pub income_reduction_percent: f64,

    /// Months and days restricted to production > 0; months where the panels
    /// were idle during the negative hours carry no cost worth showing.
    pub monthly_breakdown: Vec<MonthlyNegativeCost>,
    pub daily_breakdown: Vec<DailyNegativeCost>,
    pub top_expensive_hours: Vec<ExpensiveHour>,
}

const TOP_EXPENSIVE_HOURS: usize = 10;

/// Build the negative-price impact report for a merged series.
///
/// Returns `Ok(None)` when there was no production during any negative-price
/// hour (nothing exported, nothing lost). Fails with `InsufficientData` on
/// an empty series.
pub fn negative_price_impact(
    merged: &[MergedRecord],
) -> Result<Option<NegativeImpactReport>, PriceDataError> {
    let (Some(first), Some(last)) = (merged.first(), merged.last()) else {
        return Err(PriceDataError::InsufficientData);
    };

    let negative: Vec<&MergedRecord> = merged
        .iter()
        .filter(|r| r.price_eur_per_mwh < 0.0)
        .collect();
    let with_production: Vec<&MergedRecord> = negative
        .iter()
        .copied()
        .filter(|r| r.production_kwh > 0.0)
        .collect();

    if with_production.is_empty() {
        return Ok(None);
    }

    let mut monthly: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();
    let mut daily: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for record in &negative {
        let date = record.timestamp.date();
        let m = monthly.entry((date.year(), date.month())).or_default();
        m.0 += record.production_kwh;
        m.1 += record.export_value_sek;
        let d = daily.entry(date).or_default();
        d.0 += record.production_kwh;
        d.1 += record.export_value_sek;
    }

    let monthly_breakdown: Vec<MonthlyNegativeCost> = monthly
        .into_iter()
        .filter(|(_, (production, _))| *production > 0.0)
        .map(|((year, month), (production_kwh, export))| MonthlyNegativeCost {
            year,
            month,
            production_kwh,
            cost_sek: export.abs(),
        })
        .collect();
    let daily_breakdown: Vec<DailyNegativeCost> = daily
        .into_iter()
        .filter(|(_, (production, _))| *production > 0.0)
        .map(|(date, (production_kwh, export))| DailyNegativeCost {
            date,
            production_kwh,
            cost_sek: export.abs(),
        })
        .collect();

    let mut costliest: Vec<&MergedRecord> = with_production.clone();
    costliest.sort_by(|a, b| a.export_value_sek.total_cmp(&b.export_value_sek));
    let top_expensive_hours: Vec<ExpensiveHour> = costliest
        .into_iter()
        .take(TOP_EXPENSIVE_HOURS)
        .map(|r| ExpensiveHour {
            timestamp: r.timestamp,
            production_kwh: r.production_kwh,
            price_sek_per_kwh: r.price_sek_per_kwh,
            cost_sek: r.export_value_sek.abs(),
        })
        .collect();

    let total_cost_sek: f64 = negative
        .iter()
        .map(|r| r.export_value_sek)
        .sum::<f64>()
        .abs();
    let total_export_value_sek: f64 = merged.iter().map(|r| r.export_value_sek).sum();
    let positive_export_value_sek: f64 = merged
        .iter()
        .filter(|r| r.price_eur_per_mwh > 0.0)
        .map(|r| r.export_value_sek)
        .sum();

    Ok(Some(NegativeImpactReport {
        period_start: first.timestamp,
        period_end: last.timestamp,
        total_hours: merged.len(),
        negative_price_hours: negative.len(),
        negative_hours_with_production: with_production.len(),

        total_production_kwh: negative.iter().map(|r| r.production_kwh).sum(),
        avg_hourly_production_kwh: with_production
            .iter()
            .map(|r| r.production_kwh)
            .sum::<f64>()
            / with_production.len() as f64,
        max_hourly_production_kwh: with_production
            .iter()
            .map(|r| r.production_kwh)
            .fold(f64::NEG_INFINITY, f64::max),
        lowest_price_sek_per_kwh: negative
            .iter()
            .map(|r| r.price_sek_per_kwh)
            .fold(f64::INFINITY, f64::min),
        avg_negative_price_sek_per_kwh: negative
            .iter()
            .map(|r| r.price_sek_per_kwh)
            .sum::<f64>()
            / negative.len() as f64,

        total_cost_sek,
        total_export_value_sek,
        positive_export_value_sek,
        income_reduction_percent: if positive_export_value_sek > 0.0 {
            total_cost_sek / positive_export_value_sek * 100.0
        } else {
            0.0
        },

        monthly_breakdown,
        daily_breakdown,
        top_expensive_hours,
    }))
}
