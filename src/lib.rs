//! elwatt - day-ahead electricity price cache and solar production analysis.
//!
//! The crate has two halves:
//!
//! * a gap-filling price cache ([`cache::PriceCache`]) that keeps hourly
//!   day-ahead prices per bidding area in a local SQLite store and only asks
//!   the rate-limited external source for sub-ranges it does not already have,
//! * a pure analysis pipeline ([`analysis`]) that inner-joins a price series
//!   with a production series, derives local-currency export values and daily
//!   rollups, and computes summary statistics including negative-price runs.
//!
//! The web layer, file upload handling and CSV format detection live outside
//! this crate; it only consumes a sorted, deduplicated production series and
//! a single EUR→SEK exchange rate.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod repo;
pub mod source;
pub mod telemetry;

pub use analysis::{analyze, detect_negative_periods, merge};
pub use cache::{FetchContext, PriceCache};
pub use domain::{AreaCode, Coverage, MergedRecord, NegativePeriod, PricePoint, ProductionPoint};
pub use error::{NoDataReason, PriceDataError};
pub use repo::PriceStore;
pub use source::{DayAheadApiClient, PriceSource};
