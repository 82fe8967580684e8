use super::ui;
use crate::core::integrity::{ArticleVerifier, VerifyReport, VerifyStatus, discover_articles};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Which articles to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyTarget {
    File(PathBuf),
    All { dir: PathBuf },
}

pub fn run(target: &VerifyTarget) -> Result<()> {
    let files = match target {
        VerifyTarget::File(path) => vec![path.clone()],
        VerifyTarget::All { dir } => discover_articles(dir)?,
    };
    let verifier = ArticleVerifier::new()?;

    for file in &files {
        print!("{}", verify_one(&verifier, file));
    }
    Ok(())
}

/// Report lines for one article. A file that cannot be read is reported and
/// does not stop the remaining checks.
pub fn verify_one(verifier: &ArticleVerifier, file: &Path) -> String {
    if !file.exists() {
        return format!("  File not found: {}\n", file.display());
    }
    match verifier.verify_file(file) {
        Ok(report) => format_report(file, &report),
        Err(e) => {
            warn!(path = %file.display(), "Article could not be verified: {e:#}");
            format!(
                "  ❌ {}: {}\n",
                display_name(file),
                ui::style_text(&format!("{e:#}"), ui::StyleType::Error)
            )
        }
    }
}

fn display_name(file: &Path) -> String {
    file.file_name().map_or_else(
        || file.display().to_string(),
        |n| n.to_string_lossy().into_owned(),
    )
}

pub fn format_report(file: &Path, report: &VerifyReport) -> String {
    let name = display_name(file);
    let (icon, style_type) = match report.status {
        VerifyStatus::Verified => ("✅", ui::StyleType::Success),
        _ => ("❌", ui::StyleType::Error),
    };
    let mut out = format!(
        "  {icon} {name}: {}\n",
        ui::style_text(&report.status.to_string(), style_type)
    );

    if let (VerifyStatus::Mismatch, Some(published), Some(computed)) =
        (report.status, &report.published, &report.computed)
    {
        out.push_str(&format!("     Published: {published}\n"));
        out.push_str(&format!("     Computed:  {computed}\n"));
    }
    out
}
