// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;
use crate::countries;
use crate::error::AppError;
use crate::models::{Country, CountryQuery, Status};
use crate::summary::load_summary;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/countries/refresh", post(refresh_countries))
        .route("/status", get(get_status))
        .route("/countries", get(list_countries))
        .route("/countries/image", get(get_summary_image))
        .route("/countries/:name", get(get_country).delete(delete_country))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

#[derive(Serialize)]
struct RefreshResponse {
    message: &'static str,
    fetched: usize,
    persisted: usize,
    failed: Vec<String>,
}

async fn refresh_countries(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let report = state.refresher.run().await?;

    let message = if report.is_complete() {
        "Countries refreshed successfully"
    } else {
        "Countries refreshed with some records not stored"
    };

    Ok(Json(RefreshResponse {
        message,
        fetched: report.fetched,
        persisted: report.persisted,
        failed: report.failed.into_iter().map(|f| f.name).collect(),
    }))
}

async fn get_status(State(state): State<AppState>) -> Result<Json<Status>, AppError> {
    Ok(Json(countries::get_status(&state.pool).await?))
}

async fn list_countries(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Country>>, AppError> {
    let query = CountryQuery::parse(params.region, params.currency, params.sort)?;
    Ok(Json(countries::find_many(&state.pool, &query).await?))
}

async fn get_summary_image(State(state): State<AppState>) -> Result<Response, AppError> {
    let bytes = load_summary(&state.summary_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read summary image: {}", e))?
        .ok_or_else(|| AppError::NotFound("Summary image not found".into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        bytes,
    )
        .into_response())
}

async fn get_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Country>, AppError> {
    let country = countries::find_by_name(&state.pool, &name)
        .await?
        .ok_or(AppError::NotFound("Country not found".into()))?;
    Ok(Json(country))
}

async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    if countries::delete_by_name(&state.pool, &name).await? {
        tracing::info!("Deleted country {}", name);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Country not found".into()))
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World!" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::sources::{MockCountrySource, MockRateSource, RATES_SOURCE};
    use crate::countries::SqliteCountryStore;
    use crate::db;
    use crate::error::SourceError;
    use crate::models::{RateTable, RawCountry, RawCurrency};
    use crate::refresh::Refresher;
    use crate::summary::MockSummaryRenderer;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use sqlx::SqlitePool;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn raw(name: &str, region: &str, population: u64, code: Option<&str>) -> RawCountry {
        RawCountry {
            name: name.to_string(),
            capital: String::new(),
            region: region.to_string(),
            population,
            flag: String::new(),
            currencies: Some(
                code.into_iter()
                    .map(|code| RawCurrency {
                        code: Some(code.to_string()),
                        name: None,
                        symbol: None,
                    })
                    .collect(),
            ),
        }
    }

    fn working_sources() -> (MockCountrySource, MockRateSource) {
        let mut countries = MockCountrySource::new();
        countries.expect_fetch_countries().returning(|| {
            Ok(vec![
                raw("Arcadia", "Europe", 1000, Some("ARC")),
                raw("Noland", "Africa", 500, None),
                raw("Ghostia", "Europe", 10, Some("GHO")),
            ])
        });
        let mut rates = MockRateSource::new();
        rates
            .expect_fetch_rates()
            .returning(|| Ok(RateTable::from([("ARC".to_string(), 2.5)])));
        (countries, rates)
    }

    /// Renderer stand-in that writes a fake image where the server reads it.
    fn file_renderer(path: PathBuf) -> MockSummaryRenderer {
        let mut renderer = MockSummaryRenderer::new();
        renderer.expect_render().returning(move |_| {
            std::fs::write(&path, b"\x89PNG summary")?;
            Ok(path.clone())
        });
        renderer
    }

    fn app(
        pool: SqlitePool,
        countries: MockCountrySource,
        rates: MockRateSource,
        renderer: MockSummaryRenderer,
        summary_path: PathBuf,
    ) -> Router {
        let refresher = Refresher::new(
            Arc::new(countries),
            Arc::new(rates),
            Arc::new(SqliteCountryStore::new(pool.clone())),
            Arc::new(renderer),
        );
        router(AppState {
            pool,
            refresher: Arc::new(refresher),
            summary_path,
        })
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let (status, body) = send(app, method, uri).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_refresh_then_read() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let summary_path = dir.path().join("summary.png");
        let (countries, rates) = working_sources();
        let app = app(
            db::create_test_pool().await?,
            countries,
            rates,
            file_renderer(summary_path.clone()),
            summary_path,
        );

        let (status, body) = send_json(&app, "GET", "/countries/image").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Summary image not found");

        let (status, body) = send_json(&app, "POST", "/countries/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Countries refreshed successfully");
        assert_eq!(body["persisted"], 3);

        let (status, body) = send_json(&app, "GET", "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_countries"], 3);
        assert!(body["last_refreshed"].is_string());

        let (status, body) = send_json(&app, "GET", "/countries/Arcadia").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currency_code"], "ARC");
        assert_eq!(body["exchange_rate"], 2.5);
        assert_eq!(body["estimated_gdp"], 2500.0);

        let (_, body) = send_json(&app, "GET", "/countries/Ghostia").await;
        assert!(body["exchange_rate"].is_null());
        assert!(body["estimated_gdp"].is_null());

        let (status, body) = send_json(&app, "GET", "/countries?region=Europe&sort=gdp_desc").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Arcadia", "Ghostia"]);

        let (status, image) = send(&app, "GET", "/countries/image").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(image, b"\x89PNG summary".to_vec());

        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_with_rates_down_is_503() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (countries, _) = working_sources();
        let mut rates = MockRateSource::new();
        rates
            .expect_fetch_rates()
            .returning(|| Err(SourceError::unavailable(RATES_SOURCE, "API request failed with status: 500")));
        let mut renderer = MockSummaryRenderer::new();
        renderer.expect_render().never();

        let app = app(
            db::create_test_pool().await?,
            countries,
            rates,
            renderer,
            dir.path().join("summary.png"),
        );

        let (status, body) = send_json(&app, "POST", "/countries/refresh").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "External data source unavailable");
        assert_eq!(body["details"], "Could not fetch data from exchange rates");

        let (_, body) = send_json(&app, "GET", "/status").await;
        assert_eq!(body["total_countries"], 0);
        assert!(body["last_refreshed"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_country_and_bad_sort() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (countries, rates) = working_sources();
        let summary_path = dir.path().join("summary.png");
        let app = app(
            db::create_test_pool().await?,
            countries,
            rates,
            MockSummaryRenderer::new(),
            summary_path,
        );

        let (status, body) = send_json(&app, "GET", "/countries/Atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Country not found");

        let (status, _) = send_json(&app, "DELETE", "/countries/Atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send_json(&app, "GET", "/countries?sort=population").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "unknown sort 'population', expected gdp_asc or gdp_desc");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_country() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let summary_path = dir.path().join("summary.png");
        let (countries, rates) = working_sources();
        let app = app(
            db::create_test_pool().await?,
            countries,
            rates,
            file_renderer(summary_path.clone()),
            summary_path,
        );
        send_json(&app, "POST", "/countries/refresh").await;

        let (status, _) = send_json(&app, "DELETE", "/countries/Noland").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send_json(&app, "GET", "/countries/Noland").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send_json(&app, "GET", "/status").await;
        assert_eq!(body["total_countries"], 2);
        Ok(())
    }
}
