// Backend API client
// Talks to the restaurant REST backend: availability reads, booking and order submission

use crate::models::{BookingPayload, BookingRecord, EventRecord, OrderPayload, ProductRecord};
use crate::window::DateWindow;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Client error: {0}")]
    ClientError(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NetworkError(_) | ApiError::Timeout(_) => true,
            ApiError::ApiResponseError { is_retryable, .. } => *is_retryable,
            ApiError::DecodeError(_) | ApiError::ClientError(_) => false,
        }
    }
}

// Path segments and query keys of the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub booking: String,
    pub events: String,
    pub orders: String,
    pub products: String,
    pub date_start_param: String,
    pub date_end_param: String,
    pub repeat_param: String,
    pub not_repeat_param: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            booking: "booking".to_string(),
            events: "events".to_string(),
            orders: "orders".to_string(),
            products: "products".to_string(),
            date_start_param: "dateStart".to_string(),
            date_end_param: "dateEnd".to_string(),
            repeat_param: "repeat=true".to_string(),
            not_repeat_param: "repeat=false".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub endpoints: Endpoints,
    pub retry_config: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3131".to_string(),
            timeout_ms: 5000,
            endpoints: Endpoints::default(),
            retry_config: RetryConfig::default(),
        }
    }
}

// Retry policy for idempotent reads; writes are never retried
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_retried: usize,
    pub average_response_time_ms: f64,
    pub max_response_time_ms: f64,
}

impl ClientStats {
    fn record(&mut self, elapsed: Duration, success: bool) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.requests_sent += 1;
        if success {
            self.requests_succeeded += 1;
        } else {
            self.requests_failed += 1;
        }
        self.average_response_time_ms +=
            (elapsed_ms - self.average_response_time_ms) / self.requests_sent as f64;
        self.max_response_time_ms = self.max_response_time_ms.max(elapsed_ms);
    }
}

// Operations the views need from the backend
#[async_trait]
pub trait BackendApi: Send + Sync + 'static {
    // Bookings with a date inside the window
    async fn fetch_bookings(&self, window: &DateWindow) -> Result<Vec<BookingRecord>, ApiError>;

    // One-off events with a date inside the window
    async fn fetch_events_current(
        &self,
        window: &DateWindow,
    ) -> Result<Vec<EventRecord>, ApiError>;

    // Repeating events that started on or before the window end
    async fn fetch_events_repeat(
        &self,
        window: &DateWindow,
    ) -> Result<Vec<EventRecord>, ApiError>;

    async fn create_booking(&self, payload: &BookingPayload) -> Result<BookingRecord, ApiError>;

    async fn submit_order(&self, payload: &OrderPayload) -> Result<(), ApiError>;

    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, ApiError>;
}

// reqwest-backed implementation of BackendApi
pub struct HttpBackend {
    config: ClientConfig,
    http: reqwest::Client,
    stats: Arc<Mutex<ClientStats>>,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ApiError::ClientError(e.to_string()))?;

        info!("Backend client ready for {}", config.base_url);

        Ok(Self {
            config,
            http,
            stats: Arc::new(Mutex::new(ClientStats::default())),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub fn bookings_url(&self, window: &DateWindow) -> String {
        let ep = &self.config.endpoints;
        format!(
            "{}?{}={}&{}={}",
            self.url(&ep.booking),
            ep.date_start_param,
            window.start_param(),
            ep.date_end_param,
            window.end_param()
        )
    }

    pub fn events_current_url(&self, window: &DateWindow) -> String {
        let ep = &self.config.endpoints;
        format!(
            "{}?{}&{}={}&{}={}",
            self.url(&ep.events),
            ep.not_repeat_param,
            ep.date_start_param,
            window.start_param(),
            ep.date_end_param,
            window.end_param()
        )
    }

    pub fn events_repeat_url(&self, window: &DateWindow) -> String {
        let ep = &self.config.endpoints;
        format!(
            "{}?{}&{}={}",
            self.url(&ep.events),
            ep.repeat_param,
            ep.date_end_param,
            window.end_param()
        )
    }

    // Helper to calculate exponential backoff with jitter
    pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
        let base_backoff_ms = (config.initial_backoff_ms as f64
            * config.backoff_multiplier.powf(retry_attempt as f64))
        .min(config.max_backoff_ms as f64);

        let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
        let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }

    fn map_transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.config.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Bytes, ApiError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            return Err(ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
                is_retryable: status.is_server_error(),
            });
        }
        Ok(body)
    }

    async fn get_once(&self, url: &str) -> Result<Bytes, ApiError> {
        let started = Instant::now();
        let result = match self.http.get(url).send().await {
            Ok(response) => self.read_body(response).await,
            Err(e) => Err(self.map_transport_error(e)),
        };
        self.stats.lock().record(started.elapsed(), result.is_ok());
        result
    }

    async fn get_with_retry(&self, url: &str) -> Result<Bytes, ApiError> {
        let retry = &self.config.retry_config;
        let mut attempt = 0;

        loop {
            debug!("GET {} (attempt {})", url, attempt + 1);
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                    let backoff = Self::calculate_backoff(attempt, retry);
                    warn!("GET {} failed: {}; retrying in {:?}", url, e, backoff);
                    self.stats.lock().requests_retried += 1;
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("GET {} failed: {}", url, e);
                    return Err(e);
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let body = self.get_with_retry(url).await?;
        decode(&body)
    }

    async fn get_records<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, ApiError> {
        let body = self.get_with_retry(url).await?;
        decode_records(&body)
    }

    async fn post_json<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<Bytes, ApiError> {
        debug!("POST {}", url);
        let started = Instant::now();
        let result = match self.http.post(url).json(body).send().await {
            Ok(response) => self.read_body(response).await,
            Err(e) => Err(self.map_transport_error(e)),
        };
        self.stats.lock().record(started.elapsed(), result.is_ok());

        if let Err(e) = &result {
            warn!("POST {} failed: {}", url, e);
        }
        result
    }
}

pub fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::DecodeError(e.to_string()))
}

// Decode a JSON array record by record. Malformed records are logged and
// skipped so one bad entry does not hide the rest of the list.
pub fn decode_records<T: DeserializeOwned>(body: &Bytes) -> Result<Vec<T>, ApiError> {
    let values: Vec<serde_json::Value> = decode(body)?;
    let total = values.len();

    let records: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed record #{}: {}", position, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!("Decoded {} of {} records", records.len(), total);
    }
    Ok(records)
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn fetch_bookings(&self, window: &DateWindow) -> Result<Vec<BookingRecord>, ApiError> {
        self.get_records(&self.bookings_url(window)).await
    }

    async fn fetch_events_current(
        &self,
        window: &DateWindow,
    ) -> Result<Vec<EventRecord>, ApiError> {
        self.get_records(&self.events_current_url(window)).await
    }

    async fn fetch_events_repeat(
        &self,
        window: &DateWindow,
    ) -> Result<Vec<EventRecord>, ApiError> {
        self.get_records(&self.events_repeat_url(window)).await
    }

    async fn create_booking(&self, payload: &BookingPayload) -> Result<BookingRecord, ApiError> {
        let url = self.url(&self.config.endpoints.booking);
        let body = self.post_json(&url, payload).await?;
        let record: BookingRecord = decode(&body)?;
        info!(
            "Booked table {} on {} at {}",
            record.table, record.date, record.hour
        );
        Ok(record)
    }

    async fn submit_order(&self, payload: &OrderPayload) -> Result<(), ApiError> {
        let url = self.url(&self.config.endpoints.orders);
        self.post_json(&url, payload).await?;
        info!(
            "Order sent: {} items, total {}",
            payload.total_number, payload.total_price
        );
        Ok(())
    }

    async fn fetch_products(&self) -> Result<Vec<ProductRecord>, ApiError> {
        let url = self.url(&self.config.endpoints.products);
        self.get_json(&url).await
    }
}
