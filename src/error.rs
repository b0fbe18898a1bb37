use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

/// Why a cache request came back with zero rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDataReason {
    /// No external source is configured (cache-only mode).
    NoSourceConfigured,
    /// A source is configured but fetching yielded nothing for the window.
    SourceReturnedNothing,
}

impl fmt::Display for NoDataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSourceConfigured => {
                write!(f, "no price source configured, serving cached data only")
            }
            Self::SourceReturnedNothing => write!(f, "price source returned nothing"),
        }
    }
}

/// Error taxonomy for the price cache and analysis pipeline.
///
/// Storage failures are fatal and bubble immediately; source failures are
/// recovered inside [`crate::cache::PriceCache::get`] and never reach the
/// caller; analysis failures are terminal because there is no meaningful
/// degraded output.
#[derive(Debug, Error)]
pub enum PriceDataError {
    #[error("price store unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("invalid price point for {area} at {timestamp:?}: {reason}")]
    InvalidPoint {
        area: String,
        timestamp: Option<NaiveDateTime>,
        reason: &'static str,
    },

    #[error("price fetch failed for {area} from {start} to {end}: {message}")]
    ExternalFetchFailed {
        area: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
        message: String,
    },

    #[error("no price data available for {area} from {start} to {end} ({reason})")]
    NoDataAvailable {
        area: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
        reason: NoDataReason,
    },

    #[error("insufficient data: merged price/production series is empty")]
    InsufficientData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_message_names_area_window_and_reason() {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let err = PriceDataError::NoDataAvailable {
            area: "SE_4".into(),
            start,
            end: start + chrono::Duration::hours(23),
            reason: NoDataReason::NoSourceConfigured,
        };
        let msg = err.to_string();
        assert!(msg.contains("SE_4"));
        assert!(msg.contains("2024-06-01"));
        assert!(msg.contains("no price source configured"));
    }
}
