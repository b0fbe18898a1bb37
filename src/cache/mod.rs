//! Gap-filling price cache.
//!
//! Resolves a requested `(area, start, end)` window to a complete ascending
//! price series: read coverage, compute the missing sub-intervals, fetch and
//! persist only those, then serve the window from the store. Source failures
//! degrade to whatever is cached; store failures are fatal.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{AreaCode, PricePoint};
use crate::error::{NoDataReason, PriceDataError};
use crate::repo::PriceStore;
use crate::source::PriceSource;

pub mod gap;

/// Per-request bookkeeping passed into [`PriceCache::get_with_context`].
/// Callers that care about rate-limit spend or completeness inspect it after
/// the call; there is no process-wide counter behind it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchContext {
    /// Missing intervals successfully fetched from the external source.
    pub intervals_fetched: usize,
    /// Missing intervals skipped because the fetch failed or timed out.
    pub intervals_failed: usize,
    /// Points written to the store by this request.
    pub points_stored: usize,
}

/// Composes the persistent store, the gap calculator and an optional external
/// source into a best-effort fetcher.
pub struct PriceCache {
    store: PriceStore,
    source: Option<Arc<dyn PriceSource>>,
    // Advisory per-area locks serializing the fetch-and-store step, so
    // concurrent requests for the same area do not spend rate-limit budget on
    // the same gap. Upsert is idempotent either way; this only avoids waste.
    area_locks: Mutex<HashMap<AreaCode, Arc<Mutex<()>>>>,
}

impl PriceCache {
    /// Create a cache. With `source = None` the cache runs in cache-only
    /// mode, serving previously stored data and reporting `NoDataAvailable`
    /// for genuinely missing windows.
    pub fn new(store: PriceStore, source: Option<Arc<dyn PriceSource>>) -> Self {
        Self {
            store,
            source,
            area_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Complete ascending price series covering `[start, end]`.
    pub async fn get(
        &self,
        area: &AreaCode,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricePoint>, PriceDataError> {
        let mut ctx = FetchContext::default();
        self.get_with_context(&mut ctx, area, start, end).await
    }

    /// Like [`Self::get`], recording fetch activity into `ctx`.
    ///
    /// Completeness is not signalled beyond the final emptiness check:
    /// callers that need "how complete is this" compare the returned row
    /// count against the expected hour count themselves.
    pub async fn get_with_context(
        &self,
        ctx: &mut FetchContext,
        area: &AreaCode,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricePoint>, PriceDataError> {
        info!(%area, %start, %end, "resolving price window");

        let coverage = self.store.coverage(area).await?;
        match &coverage {
            Some(cov) => debug!(
                %area,
                min = %cov.min,
                max = %cov.max,
                count = cov.count,
                "existing coverage"
            ),
            None => debug!(%area, "no existing data for area"),
        }

        let gaps = gap::missing_periods(coverage.as_ref(), start, end);
        if !gaps.is_empty() {
            match &self.source {
                Some(source) => {
                    self.fill_gaps(ctx, area, start, end, source.as_ref())
                        .await?;
                }
                None => {
                    // Best effort: serve whatever is cached.
                    warn!(
                        %area,
                        gaps = gaps.len(),
                        "missing price data but no source configured"
                    );
                }
            }
        }

        let points = self.store.range(area, start, end).await?;
        if points.is_empty() {
            let reason = if self.source.is_some() {
                NoDataReason::SourceReturnedNothing
            } else {
                NoDataReason::NoSourceConfigured
            };
            return Err(PriceDataError::NoDataAvailable {
                area: area.to_string(),
                start,
                end,
                reason,
            });
        }

        info!(%area, count = points.len(), "serving price window");
        Ok(points)
    }

    /// Fetch and persist every missing interval for the window, serialized
    /// per area. Gaps are recomputed under the lock because a concurrent
    /// request may have filled some of them while we waited.
    ///
    /// Invariant the gap calculator depends on: each successful fetch covers
    /// the whole contiguous interval it was asked for, so the stored range
    /// never acquires interior holes.
    async fn fill_gaps(
        &self,
        ctx: &mut FetchContext,
        area: &AreaCode,
        start: NaiveDateTime,
        end: NaiveDateTime,
        source: &dyn PriceSource,
    ) -> Result<(), PriceDataError> {
        let area_lock = self.area_lock(area).await;
        let _guard = area_lock.lock().await;

        let coverage = self.store.coverage(area).await?;
        let gaps = gap::missing_periods(coverage.as_ref(), start, end);

        for (gap_start, gap_end) in gaps {
            info!(%area, %gap_start, %gap_end, "fetching missing price interval");
            match source.fetch_day_ahead(area, gap_start, gap_end).await {
                Ok(points) => {
                    ctx.intervals_fetched += 1;
                    // A write failure must surface: silently dropping the
                    // batch would re-fetch the same gap on every call.
                    ctx.points_stored += self.store.upsert(area, &points).await?;
                }
                Err(err) => {
                    ctx.intervals_failed += 1;
                    let fetch_err = PriceDataError::ExternalFetchFailed {
                        area: area.to_string(),
                        start: gap_start,
                        end: gap_end,
                        message: format!("{err:#}"),
                    };
                    // Never fatal: continue with the remaining intervals and
                    // whatever data is already cached.
                    warn!(%fetch_err, "skipping interval");
                }
            }
        }

        Ok(())
    }

    async fn area_lock(&self, area: &AreaCode) -> Arc<Mutex<()>> {
        let mut locks = self.area_locks.lock().await;
        locks.entry(area.clone()).or_default().clone()
    }
}
