//! Missing-interval computation for a requested price window.

use chrono::{Duration, NaiveDateTime};

use crate::domain::Coverage;

/// Compute the sub-intervals of `[start, end]` not covered by the store.
///
/// Interval-endpoint algorithm: the known coverage is treated as the single
/// span `[coverage.min, coverage.max]`, so at most a leading and a trailing
/// gap are produced. Interior holes are deliberately not detected; this is
/// sound only because every successful fetch-and-store covers a contiguous
/// hourly sub-interval (see [`crate::cache::PriceCache`]), which keeps the
/// stored range hole-free. Intervals that collapse to `start > end` are
/// discarded, not fetched.
pub fn missing_periods(
    coverage: Option<&Coverage>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let Some(cov) = coverage else {
        return vec![(start, end)];
    };

    let mut gaps = Vec::new();

    if start < cov.min {
        let lead_end = (cov.min - Duration::hours(1)).min(end);
        if start <= lead_end {
            gaps.push((start, lead_end));
        }
    }

    if end > cov.max {
        let trail_start = (cov.max + Duration::hours(1)).max(start);
        if trail_start <= end {
            gaps.push((trail_start, end));
        }
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn hour(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    fn coverage(min: i64, max: i64) -> Coverage {
        Coverage {
            min: hour(min),
            max: hour(max),
            count: max - min + 1,
        }
    }

    #[test]
    fn no_coverage_yields_whole_window() {
        let gaps = missing_periods(None, hour(0), hour(23));
        assert_eq!(gaps, vec![(hour(0), hour(23))]);
    }

    #[test]
    fn request_inside_coverage_yields_nothing() {
        let cov = coverage(0, 48);
        assert!(missing_periods(Some(&cov), hour(10), hour(20)).is_empty());
        // Boundary-exact subset counts as covered too.
        assert!(missing_periods(Some(&cov), hour(0), hour(48)).is_empty());
    }

    #[test]
    fn request_straddling_coverage_yields_leading_and_trailing_gaps() {
        let cov = coverage(10, 20);
        let gaps = missing_periods(Some(&cov), hour(0), hour(30));
        assert_eq!(gaps, vec![(hour(0), hour(9)), (hour(21), hour(30))]);
    }

    #[rstest]
    #[case::leading_only(0, 5, vec![(0, 9)])]
    #[case::leading_clipped_to_request_end(0, 9, vec![(0, 9)])]
    #[case::trailing_only(15, 30, vec![(21, 30)])]
    #[case::trailing_clipped_to_request_start(21, 30, vec![(21, 30)])]
    fn one_sided_gaps(
        #[case] start: i64,
        #[case] end: i64,
        #[case] expected: Vec<(i64, i64)>,
    ) {
        let cov = coverage(10, 20);
        let gaps = missing_periods(Some(&cov), hour(start), hour(end));
        let expected: Vec<_> = expected
            .into_iter()
            .map(|(a, b)| (hour(a), hour(b)))
            .collect();
        assert_eq!(gaps, expected);
    }

    #[test]
    fn collapsed_interval_is_discarded_not_fetched() {
        // Request starts 30 minutes before coverage: the leading gap would be
        // [start, coverage.min - 1h], which ends before it starts.
        let cov = Coverage {
            min: hour(10),
            max: hour(20),
            count: 11,
        };
        let start = hour(10) - Duration::minutes(30);
        let gaps = missing_periods(Some(&cov), start, hour(15));
        assert!(gaps.is_empty());
    }

    #[test]
    fn interior_holes_are_not_detected() {
        // Coverage spans [0, 48] even if hours 10..20 were never stored; the
        // calculator trusts the extremes. Closed design tradeoff.
        let cov = Coverage {
            min: hour(0),
            max: hour(48),
            count: 38,
        };
        assert!(missing_periods(Some(&cov), hour(5), hour(25)).is_empty());
    }
}
