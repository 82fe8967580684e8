//! Publication integrity checks for signal articles
//!
//! An article embeds the SHA-256 of its visible text in a `data-hash`
//! attribute. The visible text is the content of the first `<article>`
//! element with tags removed and whitespace collapsed.

use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name prefixes picked up by `discover_articles`.
const ARTICLE_PREFIXES: [&str; 3] = ["signal-", "weekly-", "q2-"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    Verified,
    Mismatch,
    NoArticle,
    NoPublishedHash,
}

impl Display for VerifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                VerifyStatus::Verified => "VERIFIED",
                VerifyStatus::Mismatch => "MISMATCH",
                VerifyStatus::NoArticle => "No <article> tag found",
                VerifyStatus::NoPublishedHash => "No published hash found",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub published: Option<String>,
    pub computed: Option<String>,
    pub status: VerifyStatus,
}

pub struct ArticleVerifier {
    article: Regex,
    tag: Regex,
    whitespace: Regex,
    published_hash: Regex,
}

impl ArticleVerifier {
    pub fn new() -> Result<Self> {
        Ok(ArticleVerifier {
            article: Regex::new(r"(?s)<article[^>]*>(.*?)</article>")?,
            tag: Regex::new(r"<[^>]+>")?,
            whitespace: Regex::new(r"\s+")?,
            published_hash: Regex::new(r#"data-hash="([a-f0-9]{64})""#)?,
        })
    }

    /// Visible article text, or `None` when the document has no `<article>`.
    pub fn visible_text(&self, html: &str) -> Option<String> {
        let inner = self.article.captures(html)?.get(1)?.as_str();
        let stripped = self.tag.replace_all(inner, "");
        Some(self.whitespace.replace_all(&stripped, " ").trim().to_string())
    }

    pub fn verify_content(&self, html: &str) -> VerifyReport {
        let Some(text) = self.visible_text(html) else {
            return VerifyReport {
                published: None,
                computed: None,
                status: VerifyStatus::NoArticle,
            };
        };
        let computed = sha256_hex(&text);

        let Some(published) = self
            .published_hash
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
        else {
            return VerifyReport {
                published: None,
                computed: Some(computed),
                status: VerifyStatus::NoPublishedHash,
            };
        };

        let status = if computed == published {
            VerifyStatus::Verified
        } else {
            VerifyStatus::Mismatch
        };
        VerifyReport {
            published: Some(published),
            computed: Some(computed),
            status,
        }
    }

    pub fn verify_file<P: AsRef<Path>>(&self, path: P) -> Result<VerifyReport> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read article: {}", path.display()))?;
        debug!(path = %path.display(), "Verifying article");
        Ok(self.verify_content(&content))
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Published article files in `dir`, sorted by file name.
pub fn discover_articles<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        let is_article = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| {
                name.ends_with(".html") && ARTICLE_PREFIXES.iter().any(|p| name.starts_with(p))
            });
        if is_article && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
