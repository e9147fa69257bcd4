// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::Utc;
use plotters::prelude::*;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ArtifactError;
use crate::models::EnrichedCountry;

const TOP_N: usize = 10;

/// Renders the summary artifact for a freshly enriched batch.
#[cfg_attr(test, mockall::automock)]
pub trait SummaryRenderer: Send + Sync {
    fn render(&self, countries: &[EnrichedCountry]) -> Result<PathBuf, ArtifactError>;
}

/// PNG bar chart of the countries with the largest estimated GDP.
pub struct PngSummary {
    path: PathBuf,
}

impl PngSummary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        // Keep the .png extension, the bitmap backend picks the format from it
        self.path.with_extension("tmp.png")
    }
}

impl SummaryRenderer for PngSummary {
    fn render(&self, countries: &[EnrichedCountry]) -> Result<PathBuf, ArtifactError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let temp_path = self.temp_path();
        if let Err(e) = draw_summary(countries, &temp_path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
        std::fs::rename(&temp_path, &self.path)?;

        tracing::info!("✅ Summary image written to {}", self.path.display());
        Ok(self.path.clone())
    }
}

fn render_error(e: impl std::fmt::Display) -> ArtifactError {
    ArtifactError::Render(e.to_string())
}

/// Countries with a positive estimated GDP, largest first.
pub fn top_by_gdp(countries: &[EnrichedCountry], limit: usize) -> Vec<(&str, f64)> {
    let mut ranked: Vec<(&str, f64)> = countries
        .iter()
        .filter_map(|c| match c.estimated_gdp {
            Some(gdp) if gdp > 0.0 => Some((c.name.as_str(), gdp)),
            _ => None,
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

fn draw_summary(countries: &[EnrichedCountry], output_path: &Path) -> Result<(), ArtifactError> {
    let top = top_by_gdp(countries, TOP_N);

    let root_area = BitMapBackend::new(output_path, (1200, 800)).into_drawing_area();
    root_area.fill(&WHITE).map_err(render_error)?;
    let (chart_area, footer_area) = root_area.split_vertically(720);

    // Billions, with a floor so an empty batch still gets a valid axis
    let max_gdp = top.first().map(|(_, gdp)| *gdp).unwrap_or(0.0) / 1_000_000_000.0;
    let y_range = 0.0..(max_gdp * 1.1).max(1.0);

    let mut chart = ChartBuilder::on(&chart_area)
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .caption(
            format!("Top {} Countries by Estimated GDP", TOP_N),
            ("sans-serif", 30),
        )
        .build_cartesian_2d(0i32..TOP_N as i32, y_range)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        // Bars carry their own name labels
        .x_label_formatter(&|_: &i32| String::new())
        .y_desc("Estimated GDP (Billions)")
        .draw()
        .map_err(render_error)?;

    for (i, (name, gdp)) in top.iter().enumerate() {
        let gdp_billions = gdp / 1_000_000_000.0;
        let i = i as i32;

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(i, 0.0), (i + 1, gdp_billions)],
                BLUE.mix(0.4).filled(),
            )))
            .map_err(render_error)?;

        chart
            .draw_series(std::iter::once(Text::new(
                name.to_string(),
                (i, gdp_billions + (max_gdp * 0.02)),
                ("sans-serif", 15).into_font(),
            )))
            .map_err(render_error)?;
    }

    let footer_style = ("sans-serif", 20).into_font().color(&BLACK);
    footer_area
        .draw_text(
            &format!("Total countries: {}", countries.len()),
            &footer_style,
            (20, 10),
        )
        .map_err(render_error)?;
    footer_area
        .draw_text(
            &format!("Last refreshed: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")),
            &footer_style,
            (20, 40),
        )
        .map_err(render_error)?;

    root_area.present().map_err(render_error)?;
    Ok(())
}

/// Read the cached summary image. `None` means no refresh has produced one yet.
pub async fn load_summary(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
