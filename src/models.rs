// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::QueryError;

/// Currency code -> units per base currency (USD).
pub type RateTable = HashMap<String, f64>;

/// A country as returned by the countries catalog. Only `name` is required;
/// the descriptive fields may be missing or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCountry {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub capital: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub population: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flag: String,
    #[serde(default)]
    pub currencies: Option<Vec<RawCurrency>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(dead_code)]
pub struct RawCurrency {
    pub code: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

impl RawCurrency {
    /// The currency code, treating an empty string as missing.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().filter(|code| !code.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct RatesResponse {
    pub rates: HashMap<String, f64>,
}

/// A country after reconciliation, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedCountry {
    pub name: String,
    pub capital: String,
    pub region: String,
    pub population: u64,
    pub flag_url: String,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
}

/// A stored country row.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: String,
    pub region: String,
    pub population: i64,
    pub flag_url: String,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub last_refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub total_countries: i64,
    pub last_refreshed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdpSort {
    Asc,
    Desc,
}

impl GdpSort {
    pub fn as_sql(self) -> &'static str {
        match self {
            GdpSort::Asc => "ASC",
            GdpSort::Desc => "DESC",
        }
    }
}

impl FromStr for GdpSort {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gdp_asc" => Ok(GdpSort::Asc),
            "gdp_desc" => Ok(GdpSort::Desc),
            other => Err(QueryError::UnknownSort(other.to_string())),
        }
    }
}

/// Validated filters for listing stored countries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<GdpSort>,
}

impl CountryQuery {
    /// Build a query from loosely typed parameters. Empty strings count as
    /// "not given"; an unknown sort is rejected.
    pub fn parse(
        region: Option<String>,
        currency: Option<String>,
        sort: Option<String>,
    ) -> Result<Self, QueryError> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let sort = match non_empty(sort) {
            Some(sort) => Some(sort.parse::<GdpSort>()?),
            None => None,
        };
        Ok(Self {
            region: non_empty(region),
            currency: non_empty(currency),
            sort,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_country_tolerates_missing_fields() -> serde_json::Result<()> {
        let country: RawCountry = serde_json::from_str(r#"{"name":"Antarctica","region":"Polar"}"#)?;
        assert_eq!(country.name, "Antarctica");
        assert_eq!(country.capital, "");
        assert_eq!(country.population, 0);
        assert!(country.currencies.is_none());

        let country: RawCountry = serde_json::from_str(
            r#"{"name":"Nigeria","capital":"Abuja","region":"Africa","population":206139587,
                "flag":"https://flagcdn.com/ng.svg",
                "currencies":[{"code":"NGN","name":"Nigerian naira","symbol":"₦"}],
                "independent":true}"#,
        )?;
        let currencies = country.currencies.unwrap_or_default();
        assert_eq!(currencies.len(), 1);
        assert_eq!(currencies[0].code(), Some("NGN"));
        Ok(())
    }

    #[test]
    fn test_raw_country_tolerates_null_fields() -> serde_json::Result<()> {
        let country: RawCountry = serde_json::from_str(
            r#"{"name":"Antarctica","capital":null,"region":null,"population":null,
                "flag":null,"currencies":null}"#,
        )?;
        assert_eq!(country.name, "Antarctica");
        assert_eq!(country.capital, "");
        assert_eq!(country.region, "");
        assert_eq!(country.population, 0);
        assert_eq!(country.flag, "");
        assert!(country.currencies.is_none());
        Ok(())
    }

    #[test]
    fn test_empty_currency_code_counts_as_missing() {
        let currency = RawCurrency {
            code: Some(String::new()),
            name: Some("Unknown".to_string()),
            symbol: None,
        };
        assert_eq!(currency.code(), None);
    }

    #[test]
    fn test_country_query_parse() {
        let query = CountryQuery::parse(
            Some("Africa".to_string()),
            Some(String::new()),
            Some("gdp_desc".to_string()),
        )
        .unwrap();
        assert_eq!(query.region.as_deref(), Some("Africa"));
        assert_eq!(query.currency, None);
        assert_eq!(query.sort, Some(GdpSort::Desc));

        let query = CountryQuery::parse(None, None, Some("gdp_asc".to_string())).unwrap();
        assert_eq!(query.sort, Some(GdpSort::Asc));

        assert_eq!(
            CountryQuery::parse(None, None, Some("population".to_string())),
            Err(QueryError::UnknownSort("population".to_string()))
        );
        assert_eq!(CountryQuery::parse(None, None, None).unwrap(), CountryQuery::default());
    }
}
