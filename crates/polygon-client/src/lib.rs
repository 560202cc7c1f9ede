use analysis_core::{AnalysisError, HistorySource, Period, PricePoint, PriceSeries};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Free tier allowance; paid plans should raise POLYGON_RATE_LIMIT.
const DEFAULT_RATE_LIMIT: usize = 5;

const MAX_ATTEMPTS: u32 = 3;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let wait_until = ts.front().map(|&oldest| oldest + self.window).unwrap_or(now);
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Daily-bar client for the Polygon.io aggregates API.
#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolygonClient {
    /// Client limited to `POLYGON_RATE_LIMIT` requests per minute (default 5).
    pub fn new(api_key: String) -> Self {
        let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT);

        Self::with_rate_limit(api_key, rate_limit)
    }

    pub fn with_rate_limit(api_key: String, requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(requests_per_minute, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            let req_clone = request.try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self.client.execute(req_clone).await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "Polygon 429 rate limited, waiting {}s before retry {}/{}",
                wait_secs,
                attempt + 1,
                MAX_ATTEMPTS
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AnalysisError::ApiError(format!(
            "Rate limited by Polygon after {MAX_ATTEMPTS} retries"
        )))
    }

    /// Adjusted daily bars for `symbol` covering the trailing `period` up to today.
    pub async fn get_history(&self, symbol: &str, period: Period) -> Result<PriceSeries, AnalysisError> {
        let to = Utc::now().date_naive();
        let from = to - ChronoDuration::days(period.calendar_days());
        self.get_daily_range(symbol, from, to).await
    }

    /// Adjusted daily bars for `symbol` between `from` and `to` inclusive.
    pub async fn get_daily_range(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PriceSeries, AnalysisError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            BASE_URL,
            symbol,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ])
        ).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AnalysisError::NotFound(format!("{symbol}: unknown ticker")));
        }
        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let series = aggregates_to_series(symbol, agg_response.results)?;
        tracing::debug!(symbol, bars = series.len(), %from, %to, "fetched daily history");
        Ok(series)
    }
}

#[async_trait]
impl HistorySource for PolygonClient {
    async fn fetch_history(&self, symbol: &str, period: Period) -> Result<PriceSeries, AnalysisError> {
        self.get_history(symbol, period).await
    }

    fn source_name(&self) -> &'static str {
        "polygon"
    }
}

/// Turn raw aggregate bars into a validated series keyed by the bar's UTC date.
///
/// Bars are sorted by timestamp and a later bar replaces an earlier one on the same date.
fn aggregates_to_series(symbol: &str, mut results: Vec<AggregateResult>) -> Result<PriceSeries, AnalysisError> {
    if results.is_empty() {
        return Err(AnalysisError::NotFound(format!("{symbol}: no bars in requested range")));
    }
    results.sort_by_key(|r| r.t);

    let mut points: Vec<PricePoint> = Vec::with_capacity(results.len());
    for r in results {
        let date = DateTime::from_timestamp_millis(r.t)
            .ok_or_else(|| AnalysisError::ApiError(format!("{symbol}: invalid bar timestamp {}", r.t)))?
            .date_naive();
        let point = PricePoint {
            date,
            open: r.o,
            high: r.h,
            low: r.l,
            close: r.c,
            volume: r.v,
        };

        match points.last_mut() {
            Some(last) if last.date == date => *last = point,
            _ => points.push(point),
        }
    }

    PriceSeries::new(symbol, points)
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp (ms)
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    #[serde(default)]
    v: f64, // volume
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "ticker": "AAPL",
        "queryCount": 3,
        "resultsCount": 3,
        "adjusted": true,
        "results": [
            {"v": 7.0e7, "vw": 187.1, "o": 187.15, "c": 185.64, "h": 188.44, "l": 183.89, "t": 1704171600000, "n": 1008871},
            {"v": 6.2e7, "vw": 184.3, "o": 184.22, "c": 184.25, "h": 185.88, "l": 183.43, "t": 1704258000000, "n": 656853},
            {"v": 5.8e7, "vw": 182.0, "o": 182.15, "c": 181.91, "h": 183.09, "l": 180.88, "t": 1704344400000, "n": 712423}
        ],
        "status": "OK",
        "request_id": "abc",
        "count": 3
    }"#;

    #[test]
    fn test_parse_aggregates_into_series() {
        let response: AggregateResponse = serde_json::from_str(SAMPLE).unwrap();
        let series = aggregates_to_series("AAPL", response.results).unwrap();

        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.len(), 3);
        assert_eq!(series.first().date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.last().close, 181.91);
        assert_eq!(series.last().volume, 5.8e7);
    }

    #[test]
    fn test_unsorted_bars_are_ordered() {
        let response: AggregateResponse = serde_json::from_str(SAMPLE).unwrap();
        let mut results = response.results;
        results.reverse();
        let series = aggregates_to_series("AAPL", results).unwrap();

        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_results_is_not_found() {
        let response: AggregateResponse = serde_json::from_str(r#"{"status":"OK","resultsCount":0}"#).unwrap();
        let err = aggregates_to_series("ZZZZ", response.results).unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound(_)));
    }

    #[test]
    fn test_same_day_bars_collapse() {
        let json = r#"{"results": [
            {"o": 1.0, "c": 1.0, "h": 1.0, "l": 1.0, "v": 10, "t": 1704171600000},
            {"o": 2.0, "c": 2.0, "h": 2.0, "l": 2.0, "v": 20, "t": 1704175200000}
        ]}"#;
        let response: AggregateResponse = serde_json::from_str(json).unwrap();
        let series = aggregates_to_series("X", response.results).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.last().close, 2.0);
    }

    #[test]
    fn test_non_positive_close_is_rejected() {
        let json = r#"{"results": [{"o": 1.0, "c": 0.0, "h": 1.0, "l": 0.0, "v": 1, "t": 1704171600000}]}"#;
        let response: AggregateResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            aggregates_to_series("X", response.results),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_burst_within_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_client_is_a_history_source() {
        let client = PolygonClient::with_rate_limit("test-key".to_string(), 5);
        let source: &dyn HistorySource = &client;
        assert_eq!(source.source_name(), "polygon");
    }
}
