// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::models::{EnrichedCountry, RateTable, RawCountry};

/// Currency fields derived for one country.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
}

/// Estimated GDP for a population at the given exchange rate. Full
/// precision, no rounding.
pub fn estimate_gdp(population: u64, rate: f64) -> f64 {
    population as f64 * rate
}

/// Match a country's first-listed currency against the rate table.
///
/// - no currencies at all: no code, no rate, GDP exactly `0`
/// - code found in the table: code, rate and `population * rate`
/// - code missing from the table: the code is kept, rate and GDP are unknown
pub fn reconcile(country: &RawCountry, rates: &RateTable) -> Reconciliation {
    let first = match country.currencies.as_deref() {
        Some([first, ..]) => first,
        _ => {
            return Reconciliation {
                currency_code: None,
                exchange_rate: None,
                estimated_gdp: Some(0.0),
            }
        }
    };

    match first.code() {
        Some(code) => match rates.get(code) {
            Some(&rate) => Reconciliation {
                currency_code: Some(code.to_string()),
                exchange_rate: Some(rate),
                estimated_gdp: Some(estimate_gdp(country.population, rate)),
            },
            None => Reconciliation {
                currency_code: Some(code.to_string()),
                exchange_rate: None,
                estimated_gdp: None,
            },
        },
        None => Reconciliation {
            currency_code: None,
            exchange_rate: None,
            estimated_gdp: None,
        },
    }
}

pub fn enrich(country: &RawCountry, rates: &RateTable) -> EnrichedCountry {
    let Reconciliation {
        currency_code,
        exchange_rate,
        estimated_gdp,
    } = reconcile(country, rates);

    EnrichedCountry {
        name: country.name.clone(),
        capital: country.capital.clone(),
        region: country.region.clone(),
        population: country.population,
        flag_url: country.flag.clone(),
        currency_code,
        exchange_rate,
        estimated_gdp,
    }
}

/// Enrich a whole batch, keeping the source order.
pub fn enrich_all(countries: &[RawCountry], rates: &RateTable) -> Vec<EnrichedCountry> {
    countries.iter().map(|country| enrich(country, rates)).collect()
}
