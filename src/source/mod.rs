//! External day-ahead price source.
//!
//! The provider is rate-limited and possibly absent (no credentials); the
//! cache treats every fetch as best-effort. Retry/backoff, if ever wanted,
//! belongs in an adapter here, not in the cache.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::SourceConfig;
use crate::domain::{to_reference_naive, AreaCode, PricePoint, REFERENCE_ZONE};

/// Day-ahead market price provider.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Hourly prices for `[start, end]` (naive reference-zone bounds,
    /// inclusive), ascending. Implementations must return the whole
    /// contiguous interval or an error; a partial answer would leave an
    /// undetectable hole in the cache.
    async fn fetch_day_ahead(
        &self,
        area: &AreaCode,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricePoint>>;
}

/// HTTP client for the day-ahead price API.
#[derive(Clone)]
pub struct DayAheadApiClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl DayAheadApiClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("elwatt/0.2"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            token: token.into(),
            client,
        })
    }

    /// Build a client from config, or `None` when no credentials are set
    /// (cache-only mode).
    pub fn from_config(cfg: &SourceConfig) -> Result<Option<Self>> {
        if !cfg.has_credentials() {
            return Ok(None);
        }
        Ok(Some(Self::new(
            cfg.base_url.clone(),
            cfg.token.trim().to_string(),
            cfg.http_timeout(),
        )?))
    }

    fn url_for_area(&self, area: &AreaCode) -> String {
        format!(
            "{}/api/v1/prices/{}",
            self.base_url.trim_end_matches('/'),
            area
        )
    }

    /// Interpret a naive reference-zone bound as a timezone-aware instant
    /// for the API call.
    fn as_api_instant(bound: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
        REFERENCE_ZONE
            .from_local_datetime(&bound)
            .earliest()
            .map(|dt| dt.fixed_offset())
            .with_context(|| format!("{bound} does not exist in {REFERENCE_ZONE}"))
    }
}

#[async_trait]
impl PriceSource for DayAheadApiClient {
    async fn fetch_day_ahead(
        &self,
        area: &AreaCode,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PricePoint>> {
        let url = self.url_for_area(area);
        let api_start = Self::as_api_instant(start)?.to_rfc3339();
        let api_end = Self::as_api_instant(end)?.to_rfc3339();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("securityToken", self.token.as_str()),
                ("start", api_start.as_str()),
                ("end", api_end.as_str()),
            ])
            .send()
            .await
            .context("price GET failed")?;

        let status = resp.status();
        let body = resp.text().await.context("price read failed")?;
        if !status.is_success() {
            anyhow::bail!("price API error: HTTP {status}: {body}");
        }

        let raw: Vec<RawPrice> =
            serde_json::from_str(&body).context("price JSON parse failed")?;

        let mut points: Vec<PricePoint> = raw
            .into_iter()
            .map(|r| PricePoint {
                timestamp: to_reference_naive(r.time_start),
                price_eur_per_mwh: r.price_eur_per_mwh,
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);

        debug!(%area, count = points.len(), "fetched day-ahead prices");
        Ok(points)
    }
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    time_start: DateTime<FixedOffset>,
    price_eur_per_mwh: f64,
}
