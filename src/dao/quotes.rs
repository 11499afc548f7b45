//! Client for ZenQuotes-compatible quote endpoints.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Quote as published by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuoteEntity {
    /// Quote text.
    #[serde(rename = "q")]
    pub quote: String,
    /// Credited author.
    #[serde(rename = "a")]
    pub author: String,
}

/// Failures raised while pulling quotes.
#[derive(Debug, Error)]
pub enum QuotesError {
    /// Building the HTTP client failed.
    #[error("failed to build quotes client")]
    ClientBuilder {
        /// Underlying builder error.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or its body read.
    #[error("failed to fetch quotes from `{url}`")]
    Request {
        /// Endpoint that was queried.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// Provider answered with a non-success status.
    #[error("quotes endpoint `{url}` responded with status {status}")]
    Status {
        /// Endpoint that was queried.
        url: String,
        /// Status the provider answered with.
        status: StatusCode,
    },
    /// Body is not a list of `{q, a}` objects.
    #[error("failed to decode quotes from `{url}`")]
    Decode {
        /// Endpoint that was queried.
        url: String,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
}

/// Thin HTTP client over a quotes endpoint returning `[{"q": .., "a": ..}]`.
#[derive(Clone)]
pub struct QuotesClient {
    client: Client,
    url: String,
}

impl QuotesClient {
    /// Client for the endpoint at `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, QuotesError> {
        let client = Client::builder()
            .build()
            .map_err(|source| QuotesError::ClientBuilder { source })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Fetch the provider's current list of quotes.
    pub async fn fetch(&self) -> Result<Vec<QuoteEntity>, QuotesError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| QuotesError::Request {
                url: self.url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(QuotesError::Status {
                url: self.url.clone(),
                status: response.status(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| QuotesError::Request {
                url: self.url.clone(),
                source,
            })?;
        decode_quotes(&body).map_err(|source| QuotesError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

fn decode_quotes(body: &[u8]) -> Result<Vec<QuoteEntity>, serde_json::Error> {
    serde_json::from_slice(body)
}
