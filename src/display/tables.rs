//! Table formatting utilities for structured output.

use comfy_table::{Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::search::DebateResult;
use crate::store::{DebateDetail, DebateSummary, ImageHit, StoreStats};

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        Self { table }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    /// Add a row to the table.
    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Add a row of prepared cells.
    pub fn add_cells(mut self, row: Vec<Cell>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Build and return the formatted table.
    pub fn build(self) -> String {
        self.table.to_string()
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

/// Debate listing with the latest image of each debate.
pub fn create_debates_table(debates: &[DebateSummary]) -> String {
    debates
        .iter()
        .fold(
            TableBuilder::new().set_headers(vec!["ID", "TLDR", "Latest image", "Updated"]),
            |table, summary| {
                table.add_row(vec![
                    summary.debate.id.to_string(),
                    summary.debate.tldr.clone(),
                    or_dash(summary.image_path.as_deref()),
                    summary.debate.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                ])
            },
        )
        .build()
}

/// One debate with its images.
pub fn create_debate_detail_table(detail: &DebateDetail) -> String {
    let debate = &detail.debate;
    let mut table = TableBuilder::new()
        .set_headers(vec!["Field", "Value"])
        .add_row(vec!["ID".into(), debate.id.to_string()])
        .add_row(vec!["TLDR".into(), debate.tldr.clone()])
        .add_row(vec!["Summary".into(), or_dash(Some(&debate.summary))])
        .add_row(vec!["Created".into(), debate.created_at.to_rfc3339()])
        .add_row(vec!["Updated".into(), debate.updated_at.to_rfc3339()]);

    for image in &detail.images {
        let marker = if image.has_vector { "" } else { " (no vector)" };
        table = table.add_row(vec![
            format!("Image {}", image.id),
            format!("{}{marker}", image.image_path),
        ]);
    }

    if let Some(latest) = &detail.latest_image {
        table = table.add_row(vec!["Latest OCR".into(), or_dash(Some(&latest.ocr))]);
    }

    table.build()
}

/// Image-level search hits.
pub fn create_image_hits_table(hits: &[ImageHit]) -> String {
    hits.iter()
        .fold(
            TableBuilder::new().set_headers(vec!["Image", "Path", "Debate", "Score", "OCR"]),
            |table, hit| {
                table.add_row(vec![
                    hit.image_id.to_string(),
                    hit.image_path.clone(),
                    or_dash(hit.tldr.as_deref()),
                    format!("{:.3}", hit.score),
                    or_dash(Some(&hit.ocr)),
                ])
            },
        )
        .build()
}

/// Ranked debates with their fused scores.
pub fn create_debate_results_table(results: &[DebateResult]) -> String {
    results
        .iter()
        .fold(
            TableBuilder::new().set_headers(vec!["ID", "TLDR", "Score", "Latest image"]),
            |table, result| {
                let color = if result.score >= 0.9 {
                    Color::Green
                } else if result.score > 0.0 {
                    Color::Yellow
                } else {
                    Color::DarkGrey
                };
                table.add_cells(vec![
                    Cell::new(result.id),
                    Cell::new(&result.tldr),
                    Cell::new(format!("{:.3}", result.score)).fg(color),
                    Cell::new(or_dash(result.image_path.as_deref())),
                ])
            },
        )
        .build()
}

/// Store sizes.
pub fn create_stats_table(stats: &StoreStats) -> String {
    TableBuilder::new()
        .set_headers(vec!["Metric", "Value"])
        .add_row(vec!["Debates".into(), stats.debates.to_string()])
        .add_row(vec!["Images".into(), stats.images.to_string()])
        .add_row(vec!["Vectors".into(), stats.vectors.to_string()])
        .add_row(vec!["Tombstones".into(), stats.tombstones.to_string()])
        .build()
}
