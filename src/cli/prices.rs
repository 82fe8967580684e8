use super::ui;
use crate::core::catalog::{Category, InstrumentSpec};
use crate::core::pipeline::{Outcome, PriceReport, fetch_all};
use crate::core::price::MarketDataProvider;
use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;
use serde::Serialize;
use std::io::Write;

pub const SOURCE: &str = "Yahoo Finance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    generated: String,
    source: &'static str,
    instruments: &'a PriceReport,
}

pub async fn run(
    catalog: &[InstrumentSpec],
    provider: &(dyn MarketDataProvider + Send + Sync),
    format: OutputFormat,
) -> Result<()> {
    let spinner = ui::new_spinner("Fetching market data...");
    let report = fetch_all(catalog, provider).await;
    spinner.finish_and_clear();
    let report = report?;

    let rendered = match format {
        OutputFormat::Table => render_table(&report, catalog),
        OutputFormat::Json => render_json(&report)?,
        OutputFormat::Csv => render_csv(&report)?,
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

pub fn render_json(report: &PriceReport) -> Result<String> {
    let output = JsonOutput {
        generated: Local::now().to_rfc3339(),
        source: SOURCE,
        instruments: report,
    };
    let mut json = serde_json::to_string_pretty(&output)?;
    json.push('\n');
    Ok(json)
}

pub fn render_csv(report: &PriceReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "price",
        "prev_close",
        "change_pct",
        "direction",
        "category",
        "date",
    ])?;

    for (name, outcome) in report.entries() {
        match outcome {
            Outcome::Observed(o) => {
                let decimals = o.decimals as usize;
                wtr.write_record([
                    name.clone(),
                    format!("{:.*}", decimals, o.price),
                    format!("{:.*}", decimals, o.prev_close),
                    format!("{:.2}", o.change_pct),
                    o.direction.to_string(),
                    o.category.to_string(),
                    o.as_of_date.to_string(),
                ])?;
            }
            Outcome::Failed(_) => {
                wtr.write_record([name.as_str(), "ERROR", "", "", "", "", ""])?;
            }
        }
    }

    let bytes = wtr.into_inner().map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(String::from_utf8(bytes)?)
}

/// Renders one table per category that has entries. Catalog notes for the
/// listed instruments are printed under their table.
pub fn render_table(report: &PriceReport, catalog: &[InstrumentSpec]) -> String {
    let mut out = String::new();
    let rule = "═".repeat(72);
    out.push_str(&format!("\n{rule}\n"));
    out.push_str(&format!(
        "  {}\n",
        ui::style_text("muFX SIGNAL CHECK — PRICE DATA", ui::StyleType::Title)
    ));
    out.push_str(&format!(
        "  Generated: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("{rule}\n\n"));

    for category in Category::ALL {
        if !report
            .entries()
            .iter()
            .any(|(_, outcome)| outcome.category() == category)
        {
            continue;
        }
        out.push_str(&format!(
            "  {}\n",
            ui::style_text(&format!("▌ {}", category.label()), ui::StyleType::Heading)
        ));
        out.push_str(&category_table(report, category));
        out.push('\n');
        for (name, note) in category_notes(report, catalog, category) {
            out.push_str(&format!(
                "  {}\n",
                ui::style_text(&format!("* {name}: {note}"), ui::StyleType::Subtle)
            ));
        }
        out.push('\n');
    }

    let data_date = report
        .data_date()
        .map_or_else(|| "N/A".to_string(), |d| d.to_string());
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("  Data date: {data_date}\n"));
    out.push_str(&format!(
        "  {}\n",
        ui::style_text(&format!("Source: {SOURCE}"), ui::StyleType::Subtle)
    ));
    out.push_str(&format!("{rule}\n"));
    out
}

fn category_notes<'a>(
    report: &'a PriceReport,
    catalog: &[InstrumentSpec],
    category: Category,
) -> Vec<(&'a str, &'static str)> {
    report
        .entries()
        .iter()
        .filter(|(_, outcome)| outcome.category() == category)
        .filter_map(|(name, _)| {
            catalog
                .iter()
                .find(|spec| spec.name == name.as_str())
                .and_then(|spec| spec.note)
                .map(|note| (name.as_str(), note))
        })
        .collect()
}

fn category_table(report: &PriceReport, category: Category) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Instrument"),
        ui::header_cell("Price"),
        ui::header_cell("Change"),
        ui::header_cell("Prev Close"),
    ]);

    for (name, outcome) in report.entries() {
        if outcome.category() != category {
            continue;
        }
        match outcome {
            Outcome::Observed(o) => {
                let decimals = o.decimals as usize;
                table.add_row(vec![
                    Cell::new(name),
                    ui::number_cell(format!("{:.*}", decimals, o.price)),
                    ui::change_cell(o.direction, o.arrow, &o.change_str),
                    ui::number_cell(format!("{:.*}", decimals, o.prev_close)),
                ]);
            }
            Outcome::Failed(f) => {
                table.add_row(vec![
                    Cell::new(name),
                    ui::error_cell(&f.message),
                    Cell::new(""),
                    Cell::new(""),
                ]);
            }
        }
    }

    table.to_string()
}
