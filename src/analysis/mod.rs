//! Pure analysis pipeline over price and production series.
//!
//! [`merge`] inner-joins the two series and derives the economics,
//! [`engine`] computes summary statistics and daily rollups, and
//! [`negative`] groups and prices contiguous negative-price runs.

pub mod engine;
pub mod merge;
pub mod negative;

pub use engine::{analyze, daily_summary, AnalysisSummary, DailySummary};
pub use merge::merge;
pub use negative::{
    detect_negative_periods, negative_price_impact, DailyNegativeCost, ExpensiveHour,
    MonthlyNegativeCost, NegativeImpactReport,
};
