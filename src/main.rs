// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

mod api;
mod config;
mod countries;
mod db;
mod enrichment;
mod error;
mod export;
mod models;
mod refresh;
mod summary;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::sources::{build_http_client, ExchangeRateClient, RestCountriesClient};
use crate::config::Config;
use crate::countries::SqliteCountryStore;
use crate::models::CountryQuery;
use crate::refresh::Refresher;
use crate::summary::PngSummary;

#[derive(Parser)]
#[command(author, version, about = "Country GDP estimates from live exchange rates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve,
    /// Fetch countries and exchange rates once and store the result
    Refresh,
    /// Show how many countries are stored and when they were last refreshed
    Status,
    /// Export stored countries to CSV
    Export {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        /// gdp_asc or gdp_desc
        #[arg(long)]
        sort: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "country_gdp=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_refresher(config: &Config, store: SqliteCountryStore) -> Result<Refresher> {
    let client = build_http_client(config.fetch_timeout()).context("Failed to build HTTP client")?;
    Ok(Refresher::new(
        Arc::new(RestCountriesClient::new(client.clone(), &config.countries_url)),
        Arc::new(ExchangeRateClient::new(client, &config.rates_url)),
        Arc::new(store),
        Arc::new(PngSummary::new(config.summary_path())),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = config::load_config()?;
    let pool = db::create_db_pool(&config.database_url).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let refresher = build_refresher(&config, SqliteCountryStore::new(pool.clone()))?;
            let app = api::router(api::AppState {
                pool,
                refresher: Arc::new(refresher),
                summary_path: config.summary_path(),
            });

            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::info!("Listening on {}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Refresh => {
            let refresher =
                build_refresher(&config, SqliteCountryStore::new(pool.clone()))?.with_progress(true);
            let report = refresher.run().await?;
            println!(
                "✅ Refreshed {} countries ({} stored, {} failed)",
                report.fetched,
                report.persisted,
                report.failed.len()
            );
            for failure in &report.failed {
                println!("  {}", failure);
            }
            println!("🖼️  Summary image: {}", report.artifact.display());
        }
        Commands::Status => {
            let status = countries::get_status(&pool).await?;
            println!("Total countries: {}", status.total_countries);
            match status.last_refreshed {
                Some(at) => println!("Last refreshed: {}", at.to_rfc3339()),
                None => println!("Last refreshed: never"),
            }
        }
        Commands::Export {
            region,
            currency,
            sort,
        } => {
            let query = CountryQuery::parse(region, currency, sort)?;
            let path = export::export_countries_csv(&pool, &query, &config.output_dir).await?;
            println!("📁 CSV file created: {}", path.display());
        }
    }

    Ok(())
}
