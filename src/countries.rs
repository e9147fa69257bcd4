// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{QueryBuilder, Sqlite};

use crate::models::{Country, CountryQuery, EnrichedCountry, Status};

/// Insert-or-replace of one enriched country, keyed by name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CountrySink: Send + Sync {
    async fn upsert(&self, country: &EnrichedCountry) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteCountryStore {
    pool: SqlitePool,
}

impl SqliteCountryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CountrySink for SqliteCountryStore {
    async fn upsert(&self, country: &EnrichedCountry) -> Result<()> {
        upsert_country(&self.pool, country, Utc::now()).await
    }
}

/// Insert a country or replace every field of the existing row with the
/// same name, stamping `last_refreshed_at`.
pub async fn upsert_country(
    pool: &SqlitePool,
    country: &EnrichedCountry,
    refreshed_at: DateTime<Utc>,
) -> Result<()> {
    let population = i64::try_from(country.population)?;

    sqlx::query(
        r#"
        INSERT INTO countries (
            name, capital, region, population, flag_url,
            currency_code, exchange_rate, estimated_gdp, last_refreshed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            capital = excluded.capital,
            region = excluded.region,
            population = excluded.population,
            flag_url = excluded.flag_url,
            currency_code = excluded.currency_code,
            exchange_rate = excluded.exchange_rate,
            estimated_gdp = excluded.estimated_gdp,
            last_refreshed_at = excluded.last_refreshed_at
        "#,
    )
    .bind(&country.name)
    .bind(&country.capital)
    .bind(&country.region)
    .bind(population)
    .bind(&country.flag_url)
    .bind(&country.currency_code)
    .bind(country.exchange_rate)
    .bind(country.estimated_gdp)
    .bind(refreshed_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn count_countries(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM countries")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Most recent `last_refreshed_at` across all rows, if any row exists.
pub async fn latest_refresh(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>> {
    let latest = sqlx::query_scalar::<_, DateTime<Utc>>(
        r#"
        SELECT last_refreshed_at
        FROM countries
        ORDER BY last_refreshed_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;
    Ok(latest)
}

pub async fn get_status(pool: &SqlitePool) -> Result<Status> {
    Ok(Status {
        total_countries: count_countries(pool).await?,
        last_refreshed: latest_refresh(pool).await?,
    })
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Country>> {
    let country = sqlx::query_as::<_, Country>("SELECT * FROM countries WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(country)
}

/// List countries matching the query. Without a sort, rows come back in
/// insertion order. SQLite puts unknown GDPs first when ascending and last
/// when descending.
pub async fn find_many(pool: &SqlitePool, query: &CountryQuery) -> Result<Vec<Country>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM countries");

    let mut separator = " WHERE ";
    if let Some(region) = &query.region {
        builder.push(separator).push("region = ").push_bind(region);
        separator = " AND ";
    }
    if let Some(currency) = &query.currency {
        builder.push(separator).push("currency_code = ").push_bind(currency);
    }

    match query.sort {
        Some(sort) => builder.push(format!(" ORDER BY estimated_gdp {}, id", sort.as_sql())),
        None => builder.push(" ORDER BY id"),
    };

    let countries = builder
        .build_query_as::<Country>()
        .fetch_all(pool)
        .await?;
    Ok(countries)
}

/// Delete a country by name. Returns `false` when there was nothing to delete.
pub async fn delete_by_name(pool: &SqlitePool, name: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM countries WHERE name = ?")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
