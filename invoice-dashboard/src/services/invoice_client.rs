//! Invoice API client.
//!
//! One GET to the configured endpoint, then a strict check of the response
//! envelope `{ "status": "success", "merged_data": [ {...}, ... ] }`.
//! Anything short of that is a [`FetchError`]; no partial list is returned.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use service_core::observability::TracedClientExt;
use thiserror::Error;

use crate::config::InvoiceApiSettings;
use crate::models::Invoice;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invoice API request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("invoice API returned HTTP {0}")]
    HttpStatus(StatusCode),

    #[error("invoice API returned malformed JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("invoice API reported status {0:?} instead of \"success\"")]
    UnsuccessfulStatus(String),

    #[error("invoice API field `merged_data` is not an array")]
    PayloadNotArray,

    #[error("invoice record {index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

impl FetchError {
    /// Message shown on the dashboard in place of the table.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Network(_) | FetchError::HttpStatus(_) | FetchError::MalformedJson(_) => {
                "Failed to fetch invoice data"
            }
            FetchError::UnsuccessfulStatus(_)
            | FetchError::PayloadNotArray
            | FetchError::MalformedRecord { .. } => "Invalid API response format",
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network_error",
            FetchError::HttpStatus(_) => "http_error",
            FetchError::MalformedJson(_) => "malformed_json",
            FetchError::UnsuccessfulStatus(_)
            | FetchError::PayloadNotArray
            | FetchError::MalformedRecord { .. } => "invalid_format",
        }
    }
}

/// Source of the raw invoice collection for one dashboard mount.
#[async_trait]
pub trait InvoiceSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Invoice>, FetchError>;
}

/// Validate an invoice API response body.
pub fn parse_invoice_payload(body: &[u8]) -> Result<Vec<Invoice>, FetchError> {
    let envelope: Value = serde_json::from_slice(body).map_err(FetchError::MalformedJson)?;

    match envelope.get("status") {
        Some(Value::String(status)) if status == "success" => {}
        Some(Value::String(status)) => return Err(FetchError::UnsuccessfulStatus(status.clone())),
        Some(other) => return Err(FetchError::UnsuccessfulStatus(other.to_string())),
        None => return Err(FetchError::UnsuccessfulStatus("<missing>".to_string())),
    }

    let records = envelope
        .get("merged_data")
        .and_then(Value::as_array)
        .ok_or(FetchError::PayloadNotArray)?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            if !record.is_object() {
                return Err(FetchError::MalformedRecord {
                    index,
                    reason: "not a JSON object".to_string(),
                });
            }
            Invoice::deserialize(record).map_err(|e| FetchError::MalformedRecord {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

pub struct InvoiceApiClient {
    client: Client,
    settings: InvoiceApiSettings,
}

impl InvoiceApiClient {
    pub fn new(settings: InvoiceApiSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self { client, settings })
    }

    pub fn url(&self) -> &str {
        &self.settings.url
    }
}

#[async_trait]
impl InvoiceSource for InvoiceApiClient {
    async fn load(&self) -> Result<Vec<Invoice>, FetchError> {
        let response = self
            .client
            .traced_get(&self.settings.url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send GET request to {}: {}", self.settings.url, e);
                FetchError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status));
        }

        let body = response.bytes().await.map_err(FetchError::Network)?;
        parse_invoice_payload(&body)
    }
}
