// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use sqlx::sqlite::SqlitePool;
use std::path::{Path, PathBuf};

use crate::countries::find_many;
use crate::models::{Country, CountryQuery};

const HEADERS: [&str; 10] = [
    "Name",
    "Capital",
    "Region",
    "Population",
    "Flag URL",
    "Currency Code",
    "Exchange Rate",
    "Estimated GDP",
    "Last Refreshed",
    "ID",
];

fn to_record(country: &Country) -> Vec<String> {
    let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    vec![
        country.name.clone(),
        country.capital.clone(),
        country.region.clone(),
        country.population.to_string(),
        country.flag_url.clone(),
        country.currency_code.clone().unwrap_or_default(),
        optional(country.exchange_rate),
        optional(country.estimated_gdp),
        country.last_refreshed_at.to_rfc3339(),
        country.id.to_string(),
    ]
}

/// Export the stored countries matching `query` to a timestamped CSV file in
/// `output_dir`. Unknown values are written as empty cells.
pub async fn export_countries_csv(
    pool: &SqlitePool,
    query: &CountryQuery,
    output_dir: &Path,
) -> Result<PathBuf> {
    let countries = find_many(pool, query).await?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filename = output_dir.join(format!("countries_{}.csv", timestamp));

    let mut writer = Writer::from_path(&filename)?;
    writer.write_record(HEADERS)?;
    for country in &countries {
        writer.write_record(to_record(country))?;
    }
    writer.flush()?;

    tracing::info!("✅ {} countries exported to {}", countries.len(), filename.display());
    Ok(filename)
}
