//! Outbound HTTP clients for the circulation backend and the search index.
//!
//! Clients are built once at startup with fixed timeouts; every call returns
//! either the response body or an [`UpstreamError`] whose status is surfaced
//! to the caller unchanged.

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::config::ServiceConfig;

/// A failed upstream request: the HTTP status to report and a message.
/// Transport failures are folded into statuses the same way a client error
/// would be: timeouts become 408, refused connections become 503.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub status: u16,
    pub message: String,
}

impl UpstreamError {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

pub struct Clients {
    standard: Client,
    fast: Client,
    ils_api: String,
    solr_url: String,
}

impl Clients {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let standard = Client::builder().timeout(Duration::from_secs(10)).build()?;
        let fast = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(Self {
            standard,
            fast,
            ils_api: config.ils_api.trim_end_matches('/').to_string(),
            solr_url: format!(
                "{}/{}",
                config.solr_url.trim_end_matches('/'),
                config.solr_core
            ),
        })
    }

    /// GET from the ILS connector, forwarding the caller's bearer token.
    pub async fn ils_get(&self, path: &str, jwt: &str) -> Result<Vec<u8>, UpstreamError> {
        let url = format!("{}/{}", self.ils_api, path);
        let started = Instant::now();
        let result = self.standard.get(&url).bearer_auth(jwt).send().await;
        handle_response("ILS GET", &url, result, started).await
    }

    /// POST JSON to the ILS connector.
    pub async fn ils_post<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        jwt: &str,
    ) -> Result<Vec<u8>, UpstreamError> {
        let url = format!("{}/{}", self.ils_api, path);
        let started = Instant::now();
        let result = self.standard.post(&url).bearer_auth(jwt).json(body).send().await;
        handle_response("ILS POST", &url, result, started).await
    }

    /// GET a select query from the search index with the fast client.
    pub async fn solr_select(&self, params: &[(&str, &str)]) -> Result<Vec<u8>, UpstreamError> {
        let url = format!("{}/select", self.solr_url);
        let started = Instant::now();
        let result = self.fast.get(&url).query(params).send().await;
        handle_response("Solr GET", &url, result, started).await
    }

    /// Pings the ILS connector version endpoint.
    pub async fn ils_health(&self) -> Result<(), String> {
        let url = format!("{}/version", self.ils_api);
        match self.fast.get(&url).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::error!(%url, %err, "failed response from ILS connector ping");
                Err(err.to_string())
            }
        }
    }
}

async fn handle_response(
    kind: &str,
    url: &str,
    result: reqwest::Result<reqwest::Response>,
    started: Instant,
) -> Result<Vec<u8>, UpstreamError> {
    let log_url = sanitize_url(url);
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            let (status, message) = if err.is_timeout() {
                (408, format!("{log_url} timed out"))
            } else if err.is_connect() {
                (503, format!("{log_url} refused connection"))
            } else {
                (400, err.to_string())
            };
            tracing::error!(kind, url = %log_url, status, %message, "upstream request failed");
            return Err(UpstreamError { status, message });
        }
    };

    let status = response.status();
    let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_success() {
        tracing::info!(kind, url = %log_url, elapsed_ms, "successful upstream response");
        return Ok(body);
    }

    let message = String::from_utf8_lossy(&body).to_string();
    // 404s are expected for titles without inventory; log them quietly.
    if status.as_u16() == 404 {
        tracing::info!(kind, url = %log_url, elapsed_ms, "upstream returned not found");
    } else {
        tracing::error!(kind, url = %log_url, status = status.as_u16(), %message, elapsed_ms, "upstream returned an error");
    }
    Err(UpstreamError { status: status.as_u16(), message })
}

/// Strips patron PINs from a URL before it is logged.
pub fn sanitize_url(url: &str) -> String {
    match url.find("pin=") {
        Some(idx) => format!("{}pin=SECRET", &url[..idx]),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_pin() {
        assert_eq!(
            sanitize_url("https://ils.example.edu/patron?id=x&pin=1234"),
            "https://ils.example.edu/patron?id=x&pin=SECRET"
        );
        assert_eq!(sanitize_url("https://ils.example.edu/version"), "https://ils.example.edu/version");
    }
}
