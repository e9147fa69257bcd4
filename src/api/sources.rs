// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::SourceError;
use crate::models::{RateTable, RatesResponse, RawCountry};

pub const COUNTRIES_SOURCE: &str = "restcountries";
pub const RATES_SOURCE: &str = "exchange rates";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CountrySource: Send + Sync {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, SourceError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<RateTable, SourceError>;
}

/// Shared HTTP client for both sources, bounded by the fetch timeout.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// GET `url` once and return the body. Transport errors, timeouts and
/// non-2xx responses all count as the source being unavailable.
async fn get_text(client: &Client, url: &str, source_name: &'static str) -> Result<String, SourceError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::unavailable(source_name, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::unavailable(
            source_name,
            format!("API request failed with status: {}", status),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| SourceError::unavailable(source_name, e))
}

pub fn parse_countries(text: &str) -> Result<Vec<RawCountry>, SourceError> {
    serde_json::from_str(text).map_err(|e| {
        SourceError::unavailable(COUNTRIES_SOURCE, format!("Failed to parse countries response: {}", e))
    })
}

/// Extract the `rates` object. Entries that are not positive finite numbers
/// are dropped.
pub fn parse_rates(text: &str) -> Result<RateTable, SourceError> {
    let response: RatesResponse = serde_json::from_str(text).map_err(|e| {
        SourceError::unavailable(RATES_SOURCE, format!("Failed to parse rates response: {}", e))
    })?;

    let rates = response
        .rates
        .into_iter()
        .filter(|(code, rate)| {
            let usable = rate.is_finite() && *rate > 0.0;
            if !usable {
                tracing::warn!("Ignoring unusable exchange rate {} for {}", rate, code);
            }
            usable
        })
        .collect();
    Ok(rates)
}

pub struct RestCountriesClient {
    client: Client,
    url: String,
}

impl RestCountriesClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CountrySource for RestCountriesClient {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, SourceError> {
        tracing::debug!("Fetching countries from {}", self.url);
        let text = get_text(&self.client, &self.url, COUNTRIES_SOURCE).await?;
        let countries = parse_countries(&text)?;
        tracing::info!("✅ Fetched {} countries", countries.len());
        Ok(countries)
    }
}

pub struct ExchangeRateClient {
    client: Client,
    url: String,
}

impl ExchangeRateClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RateSource for ExchangeRateClient {
    async fn fetch_rates(&self) -> Result<RateTable, SourceError> {
        tracing::debug!("Fetching exchange rates from {}", self.url);
        let text = get_text(&self.client, &self.url, RATES_SOURCE).await?;
        let rates = parse_rates(&text)?;
        tracing::info!("✅ Fetched {} exchange rates", rates.len());
        Ok(rates)
    }
}
