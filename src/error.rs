// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// A fetch from one of the external data sources failed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },
}

impl SourceError {
    pub fn unavailable(source_name: &'static str, reason: impl ToString) -> Self {
        SourceError::Unavailable {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub fn source_name(&self) -> &'static str {
        match self {
            SourceError::Unavailable { source_name, .. } => source_name,
        }
    }
}

/// A list filter could not be understood.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("unknown sort '{0}', expected gdp_asc or gdp_desc")]
    UnknownSort(String),
}

/// Rendering or writing the summary chart failed.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to render summary image: {0}")]
    Render(String),

    #[error("Failed to write summary image: {0}")]
    Io(#[from] std::io::Error),
}

/// One country could not be upserted. Collected, never fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to store {name}: {reason}")]
pub struct RecordPersistError {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    SourceUnavailable(#[from] SourceError),

    #[error(transparent)]
    ArtifactRender(#[from] ArtifactError),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] QueryError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "details": e.to_string() }),
            ),
            AppError::Refresh(RefreshError::SourceUnavailable(e)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "External data source unavailable",
                    "details": format!("Could not fetch data from {}", e.source_name()),
                }),
            ),
            AppError::Refresh(RefreshError::ArtifactRender(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Summary image generation failed", "details": e.to_string() }),
            ),
            AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error" }))
            }
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        (status, Json(body)).into_response()
    }
}
