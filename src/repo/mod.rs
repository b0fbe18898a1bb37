//! Persistent price store backed by SQLite.
//!
//! One logical table keyed by `(area_code, datetime)` holds every known
//! hourly day-ahead price. The store has no business logic; gap detection and
//! fetching live in [`crate::cache`].

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

use crate::domain::{AreaCode, Coverage, PricePoint};
use crate::error::PriceDataError;

/// Durable key-value store of `(area, timestamp) -> price` with range and
/// coverage queries.
#[derive(Clone)]
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PriceDataError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store, used by tests. A single connection so every query
    /// sees the same database.
    pub async fn open_in_memory() -> Result<Self, PriceDataError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PriceDataError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_data (
                area_code TEXT NOT NULL,
                datetime TEXT NOT NULL,
                price_eur_per_mwh REAL NOT NULL,
                PRIMARY KEY (area_code, datetime)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_area_datetime ON price_data (area_code, datetime)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a batch of points for an area, replacing any existing price at
    /// the same `(area, timestamp)` key (last write wins).
    ///
    /// The whole batch commits in one transaction, so a reader never observes
    /// a half-written fetch result. Points with a non-finite price are
    /// rejected individually; a batch with zero valid points is a no-op.
    /// Returns the number of points written.
    pub async fn upsert(
        &self,
        area: &AreaCode,
        points: &[PricePoint],
    ) -> Result<usize, PriceDataError> {
        let (valid, invalid): (Vec<&PricePoint>, Vec<&PricePoint>) =
            points.iter().partition(|p| p.is_valid());

        for point in &invalid {
            let err = PriceDataError::InvalidPoint {
                area: area.to_string(),
                timestamp: Some(point.timestamp),
                reason: "price is not a finite number",
            };
            warn!(%err, "dropping point from batch");
        }

        if valid.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for point in &valid {
            sqlx::query(
                r#"
                INSERT INTO price_data (area_code, datetime, price_eur_per_mwh)
                VALUES (?1, ?2, ?3)
                ON CONFLICT (area_code, datetime) DO UPDATE
                SET price_eur_per_mwh = excluded.price_eur_per_mwh
                "#,
            )
            .bind(area.as_str())
            .bind(point.timestamp)
            .bind(point.price_eur_per_mwh)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(%area, count = valid.len(), "stored price records");
        Ok(valid.len())
    }

    /// Prices for an area with `start <= timestamp <= end`, ascending.
    pub async fn range(
        &self,
        area: &AreaCode,
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    ) -> Result<Vec<PricePoint>, PriceDataError> {
        let rows: Vec<(chrono::NaiveDateTime, f64)> = sqlx::query_as(
            r#"
            SELECT datetime, price_eur_per_mwh
            FROM price_data
            WHERE area_code = ?1 AND datetime >= ?2 AND datetime <= ?3
            ORDER BY datetime ASC
            "#,
        )
        .bind(area.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(%area, %start, %end, count = rows.len(), "range query");

        Ok(rows
            .into_iter()
            .map(|(timestamp, price_eur_per_mwh)| PricePoint {
                timestamp,
                price_eur_per_mwh,
            })
            .collect())
    }

    /// Min/max timestamp and row count for an area, or `None` when the area
    /// has no data. The extent does not imply contiguity.
    pub async fn coverage(&self, area: &AreaCode) -> Result<Option<Coverage>, PriceDataError> {
        let row: (
            Option<chrono::NaiveDateTime>,
            Option<chrono::NaiveDateTime>,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT MIN(datetime), MAX(datetime), COUNT(*)
            FROM price_data
            WHERE area_code = ?1
            "#,
        )
        .bind(area.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(match row {
            (Some(min), Some(max), count) => Some(Coverage { min, max, count }),
            _ => None,
        })
    }
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

    fn area() -> AreaCode {
        "SE_4".parse().unwrap()
    }

    #[tokio::test]
    async fn coverage_is_none_for_unknown_area() {
        let store = PriceStore::open_in_memory().await.unwrap();
        assert!(store.coverage(&area()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_last_write_wins() {
        let store = PriceStore::open_in_memory().await.unwrap();
        let point = PricePoint::new(hour(0), 42.0);

        store.upsert(&area(), &[point]).await.unwrap();
        store.upsert(&area(), &[point]).await.unwrap();

        let coverage = store.coverage(&area()).await.unwrap().unwrap();
        assert_eq!(coverage.count, 1);

        // Refetch for the same hour replaces, never appends.
        store
            .upsert(&area(), &[PricePoint::new(hour(0), -5.0)])
            .await
            .unwrap();
        let rows = store.range(&area(), hour(0), hour(0)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price_eur_per_mwh, -5.0);
    }

    #[tokio::test]
    async fn range_is_inclusive_and_ascending() {
        let store = PriceStore::open_in_memory().await.unwrap();
        let points: Vec<PricePoint> = (0..5)
            .map(|h| PricePoint::new(hour(h), h as f64))
            .collect();
        // Insert out of order; the query must sort.
        store
            .upsert(&area(), &[points[3], points[0], points[4], points[1], points[2]])
            .await
            .unwrap();

        let rows = store.range(&area(), hour(1), hour(3)).await.unwrap();
        let hours: Vec<_> = rows.iter().map(|p| p.timestamp).collect();
        assert_eq!(hours, vec![hour(1), hour(2), hour(3)]);
    }

    #[tokio::test]
    async fn invalid_points_are_dropped_per_point() {
        let store = PriceStore::open_in_memory().await.unwrap();
        let written = store
            .upsert(
                &area(),
                &[
                    PricePoint::new(hour(0), f64::NAN),
                    PricePoint::new(hour(1), 10.0),
                ],
            )
            .await
            .unwrap();
        assert_eq!(written, 1);
        let coverage = store.coverage(&area()).await.unwrap().unwrap();
        assert_eq!(coverage.count, 1);
        assert_eq!(coverage.min, hour(1));
    }

    #[tokio::test]
    async fn all_invalid_batch_is_a_no_op() {
        let store = PriceStore::open_in_memory().await.unwrap();
        let written = store
            .upsert(&area(), &[PricePoint::new(hour(0), f64::NAN)])
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(store.coverage(&area()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn areas_are_isolated() {
        let store = PriceStore::open_in_memory().await.unwrap();
        let other: AreaCode = "SE_3".parse().unwrap();
        store
            .upsert(&area(), &[PricePoint::new(hour(0), 1.0)])
            .await
            .unwrap();

        assert!(store.coverage(&other).await.unwrap().is_none());
        assert!(store.range(&other, hour(0), hour(23)).await.unwrap().is_empty());
    }
}
