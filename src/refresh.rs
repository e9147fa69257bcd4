// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::sources::{CountrySource, RateSource};
use crate::countries::CountrySink;
use crate::enrichment::enrich_all;
use crate::error::{ArtifactError, RecordPersistError, RefreshError, SourceError};
use crate::models::EnrichedCountry;
use crate::summary::SummaryRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStage {
    Idle,
    /// Countries and rates are fetched concurrently.
    Fetching,
    Reconciling,
    Persisting,
    RenderingArtifact,
    Done,
}

impl fmt::Display for RefreshStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshStage::Idle => "idle",
            RefreshStage::Fetching => "fetching countries and rates",
            RefreshStage::Reconciling => "reconciling",
            RefreshStage::Persisting => "persisting",
            RefreshStage::RenderingArtifact => "rendering artifact",
            RefreshStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a refresh that got past both fetches and rendered the summary.
#[derive(Debug)]
pub struct RefreshReport {
    pub fetched: usize,
    pub persisted: usize,
    pub failed: Vec<RecordPersistError>,
    pub artifact: PathBuf,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch, reconcile, upsert and re-render, as one unit of work.
///
/// Either fetch failing aborts before anything is written. Once persisting
/// starts, each record is upserted on its own: a failed upsert is logged and
/// reported but the remaining records are still written and the summary is
/// still rendered from the full in-memory batch. A render failure does not
/// undo the upserts.
pub struct Refresher {
    countries: Arc<dyn CountrySource>,
    rates: Arc<dyn RateSource>,
    sink: Arc<dyn CountrySink>,
    renderer: Arc<dyn SummaryRenderer>,
    show_progress: bool,
    in_flight: Mutex<()>,
}

impl Refresher {
    pub fn new(
        countries: Arc<dyn CountrySource>,
        rates: Arc<dyn RateSource>,
        sink: Arc<dyn CountrySink>,
        renderer: Arc<dyn SummaryRenderer>,
    ) -> Self {
        Self {
            countries,
            rates,
            sink,
            renderer,
            show_progress: false,
            in_flight: Mutex::new(()),
        }
    }

    /// Draw a progress bar while persisting. Meant for the CLI.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[tracing::instrument(name = "refresh", skip(self))]
    pub async fn run(&self) -> Result<RefreshReport, RefreshError> {
        // One refresh at a time within this process
        let _guard = self.in_flight.lock().await;
        let mut stage = RefreshStage::Idle;
        advance(&mut stage, RefreshStage::Fetching);

        // Both sources are independent; neither result is used until both succeed
        let (raw_countries, rates) = tokio::try_join!(
            async {
                let countries = self.countries.fetch_countries().await?;
                tracing::debug!("{} countries received", countries.len());
                Ok::<_, SourceError>(countries)
            },
            async {
                let rates = self.rates.fetch_rates().await?;
                tracing::debug!("{} rates received", rates.len());
                Ok::<_, SourceError>(rates)
            },
        )
        .map_err(|e| {
            tracing::error!("Refresh aborted before writing anything: {}", e);
            RefreshError::SourceUnavailable(e)
        })?;

        advance(&mut stage, RefreshStage::Reconciling);
        let enriched = enrich_all(&raw_countries, &rates);

        advance(&mut stage, RefreshStage::Persisting);
        let fetched = enriched.len();
        let failed = self.persist_all(&enriched).await;
        let persisted = fetched - failed.len();
        if failed.is_empty() {
            tracing::info!("✅ {} countries stored", persisted);
        } else {
            tracing::warn!(
                "Stored {} countries, {} failed: {}",
                persisted,
                failed.len(),
                failed
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        advance(&mut stage, RefreshStage::RenderingArtifact);
        let artifact = self.render(enriched).await.map_err(|e| {
            tracing::error!("Refresh failed while {}: {}", stage, e);
            RefreshError::ArtifactRender(e)
        })?;

        advance(&mut stage, RefreshStage::Done);
        Ok(RefreshReport {
            fetched,
            persisted,
            failed,
            artifact,
        })
    }

    /// Upsert every record in order, collecting failures instead of stopping.
    async fn persist_all(&self, enriched: &[EnrichedCountry]) -> Vec<RecordPersistError> {
        let progress = if self.show_progress {
            let bar = ProgressBar::new(enriched.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            {
                bar.set_style(style.progress_chars("=>-"));
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut failed = Vec::new();
        for country in enriched {
            if let Err(e) = self.sink.upsert(country).await {
                tracing::warn!("Failed to store {}: {:#}", country.name, e);
                failed.push(RecordPersistError {
                    name: country.name.clone(),
                    reason: format!("{:#}", e),
                });
            }
            progress.inc(1);
        }
        progress.finish_and_clear();
        failed
    }

    async fn render(&self, enriched: Vec<EnrichedCountry>) -> Result<PathBuf, ArtifactError> {
        let renderer = Arc::clone(&self.renderer);
        tokio::task::spawn_blocking(move || renderer.render(&enriched))
            .await
            .map_err(|e| ArtifactError::Render(format!("render task failed: {}", e)))?
    }
}

fn advance(stage: &mut RefreshStage, next: RefreshStage) {
    tracing::debug!("refresh: {} -> {}", stage, next);
    *stage = next;
}
