use std::net::IpAddr;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::ResolvedConfig;
use crate::domain::DatasetKind;
use crate::error::CovidError;
use crate::table::RawTable;

/// A downloaded upstream table and the instant the download started.
#[derive(Debug, Clone)]
pub struct RawFetch {
    pub table: RawTable,
    pub captured_at: DateTime<Utc>,
}

pub trait SeriesClient {
    fn fetch_raw(&self, kind: DatasetKind) -> Result<RawFetch, CovidError>;
}

#[derive(Clone)]
pub struct SeriesHttpClient {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl SeriesHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, CovidError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("covid-series/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CovidError::Network(err.to_string()))?,
        );
        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout);
        if is_loopback(&config.base_url) {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|err| CovidError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, CovidError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "time series request failed".to_string());
        Err(CovidError::NetworkStatus { status, message })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, CovidError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, attempt, delay, "retrying time series request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, attempt, delay, "retrying time series request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(CovidError::Network(err.to_string()));
                }
            }
        }
    }
}

impl SeriesClient for SeriesHttpClient {
    fn fetch_raw(&self, kind: DatasetKind) -> Result<RawFetch, CovidError> {
        let url = kind.url(&self.base_url);
        let captured_at = Utc::now();
        tracing::info!(%url, "downloading time series");
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| CovidError::Network(err.to_string()))?;
        let table = RawTable::from_csv_str(&body)?;
        tracing::info!(rows = table.rows.len(), columns = table.headers.len(), "downloaded time series");
        Ok(RawFetch { table, captured_at })
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Local mirrors are reached directly, even when a proxy is configured.
fn is_loopback(base_url: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(base_url) else {
        return false;
    };
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_hosts() {
        assert!(is_loopback("http://127.0.0.1:8080/series"));
        assert!(is_loopback("http://localhost/series"));
        assert!(is_loopback("http://[::1]:9000"));
        assert!(!is_loopback("https://raw.githubusercontent.com/x"));
        assert!(!is_loopback("not a url"));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }
}
