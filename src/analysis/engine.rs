//! Summary statistics over a merged price/production series.

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::domain::MergedRecord;
use crate::error::PriceDataError;

/// Full summary of one merged series. Prices are reported both in the source
/// unit (EUR/MWh) and the local per-kWh unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub period_days: i64,
    pub total_hours: usize,

    pub price_min_sek_per_kwh: f64,
    pub price_max_sek_per_kwh: f64,
    pub price_mean_sek_per_kwh: f64,
    pub price_median_sek_per_kwh: f64,
    pub price_min_eur_per_mwh: f64,
    pub price_max_eur_per_mwh: f64,
    pub price_mean_eur_per_mwh: f64,
    pub price_median_eur_per_mwh: f64,

    pub production_total_kwh: f64,
    pub production_mean_kwh: f64,
    pub production_max_kwh: f64,
    pub hours_with_production: usize,

    pub negative_price_hours: usize,
    pub production_during_negative_prices_kwh: f64,
    pub avg_production_during_negative_prices_kwh: f64,
    pub avg_negative_price_sek_per_kwh: f64,
    pub min_negative_price_sek_per_kwh: f64,
    /// Signed sum of export value over negative-price hours (non-positive).
    pub negative_export_cost_sek: f64,
    /// The same cost as a non-negative magnitude, for presentation.
    pub negative_export_cost_abs_sek: f64,

    pub total_export_value_sek: f64,
    pub positive_export_value_sek: f64,

    /// Pearson correlation between hourly production and the local price.
    /// Defined as 0 when either series has zero variance.
    pub price_production_correlation: f64,
    pub price_volatility_std_sek_per_kwh: f64,
    /// Coefficient of variation (std/mean), 0 when the mean price is 0.
    pub price_volatility_cv: f64,
}

/// Analyze a merged series.
///
/// Fails with [`PriceDataError::InsufficientData`] on an empty series rather
/// than returning zero-filled statistics.
pub fn analyze(merged: &[MergedRecord]) -> Result<AnalysisSummary, PriceDataError> {
    let (Some(first), Some(last)) = (merged.first(), merged.last()) else {
        return Err(PriceDataError::InsufficientData);
    };

    let sek_prices: Vec<f64> = merged.iter().map(|r| r.price_sek_per_kwh).collect();
    let eur_prices: Vec<f64> = merged.iter().map(|r| r.price_eur_per_mwh).collect();
    let production: Vec<f64> = merged.iter().map(|r| r.production_kwh).collect();

    let price_mean_sek_per_kwh = mean(&sek_prices);
    let price_volatility_std_sek_per_kwh = sample_std(&sek_prices);

    let negative: Vec<&MergedRecord> = merged
        .iter()
        .filter(|r| r.price_eur_per_mwh < 0.0)
        .collect();
    let negative_export_cost_sek: f64 = negative.iter().map(|r| r.export_value_sek).sum();
    let negative_sek_prices: Vec<f64> =
        negative.iter().map(|r| r.price_sek_per_kwh).collect();
    let negative_production: Vec<f64> =
        negative.iter().map(|r| r.production_kwh).collect();

    Ok(AnalysisSummary {
        period_days: (last.timestamp - first.timestamp).num_days(),
        total_hours: merged.len(),

        price_min_sek_per_kwh: fold_min(&sek_prices),
        price_max_sek_per_kwh: fold_max(&sek_prices),
        price_mean_sek_per_kwh,
        price_median_sek_per_kwh: median(&sek_prices),
        price_min_eur_per_mwh: fold_min(&eur_prices),
        price_max_eur_per_mwh: fold_max(&eur_prices),
        price_mean_eur_per_mwh: mean(&eur_prices),
        price_median_eur_per_mwh: median(&eur_prices),

        production_total_kwh: production.iter().sum(),
        production_mean_kwh: mean(&production),
        production_max_kwh: fold_max(&production),
        hours_with_production: production.iter().filter(|&&kwh| kwh > 0.0).count(),

        negative_price_hours: negative.len(),
        production_during_negative_prices_kwh: negative_production.iter().sum(),
        avg_production_during_negative_prices_kwh: if negative.is_empty() {
            0.0
        } else {
            mean(&negative_production)
        },
        avg_negative_price_sek_per_kwh: if negative.is_empty() {
            0.0
        } else {
            mean(&negative_sek_prices)
        },
        min_negative_price_sek_per_kwh: if negative.is_empty() {
            0.0
        } else {
            fold_min(&negative_sek_prices)
        },
        negative_export_cost_sek,
        negative_export_cost_abs_sek: negative_export_cost_sek.abs(),

        total_export_value_sek: merged.iter().map(|r| r.export_value_sek).sum(),
        positive_export_value_sek: merged
            .iter()
            .filter(|r| r.price_eur_per_mwh > 0.0)
            .map(|r| r.export_value_sek)
            .sum(),

        price_production_correlation: pearson(&production, &sek_prices),
        price_volatility_std_sek_per_kwh,
        price_volatility_cv: if price_mean_sek_per_kwh != 0.0 {
            price_volatility_std_sek_per_kwh / price_mean_sek_per_kwh
        } else {
            0.0
        },
    })
}

/// Per-day aggregation rows for tabular presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub production_kwh_sum: f64,
    pub production_kwh_mean: f64,
    pub production_kwh_max: f64,
    pub price_eur_per_mwh_mean: f64,
    pub price_eur_per_mwh_min: f64,
    pub price_eur_per_mwh_max: f64,
    pub price_sek_per_kwh_mean: f64,
    pub price_sek_per_kwh_min: f64,
    pub price_sek_per_kwh_max: f64,
    pub export_value_sek_sum: f64,
}

/// Group a merged series (already sorted by timestamp) into daily rows.
pub fn daily_summary(merged: &[MergedRecord]) -> Vec<DailySummary> {
    let grouped = merged.iter().chunk_by(|r| r.timestamp.date());
    let mut days = Vec::new();
    for (date, rows) in &grouped {
        let rows: Vec<&MergedRecord> = rows.collect();
        let production: Vec<f64> = rows.iter().map(|r| r.production_kwh).collect();
        let eur: Vec<f64> = rows.iter().map(|r| r.price_eur_per_mwh).collect();
        let sek: Vec<f64> = rows.iter().map(|r| r.price_sek_per_kwh).collect();
        days.push(DailySummary {
            date,
            production_kwh_sum: production.iter().sum(),
            production_kwh_mean: mean(&production),
            production_kwh_max: fold_max(&production),
            price_eur_per_mwh_mean: mean(&eur),
            price_eur_per_mwh_min: fold_min(&eur),
            price_eur_per_mwh_max: fold_max(&eur),
            price_sek_per_kwh_mean: mean(&sek),
            price_sek_per_kwh_min: fold_min(&sek),
            price_sek_per_kwh_max: fold_max(&sek),
            export_value_sek_sum: rows.iter().map(|r| r.export_value_sek).sum(),
        });
    }
    days
}

// Statistics helpers. Inputs are finite by construction: the store rejects
// non-finite prices and the production contract drops non-finite readings.

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn fold_min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn fold_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Sample standard deviation; 0 for fewer than two samples.
fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
}

/// Pearson correlation; 0 when either series has zero variance, so a flat
/// series never produces NaN.
fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return 0.0;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        var_x += (x - mx).powi(2);
        var_y += (y - my).powi(2);
    }
    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}
