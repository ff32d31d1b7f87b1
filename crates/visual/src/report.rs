//! Report sink: screenshot cache and run report files

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::VisualResult;
use crate::runner::{PageResult, SuiteResult};

/// Base64 PNG screenshots of one page comparison
///
/// Supplied empty by the caller and filled in by the comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotsCache {
    pub production: Option<String>,
    pub staging: Option<String>,
    pub diff: Option<String>,
}

impl ScreenshotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether all three images have been stored
    pub fn is_complete(&self) -> bool {
        self.production.is_some() && self.staging.is_some() && self.diff.is_some()
    }

    /// Images in report order with their captions
    pub fn attachments(&self) -> Vec<(&'static str, &str)> {
        [
            ("Screenshot of production", &self.production),
            ("Screenshot of staging", &self.staging),
            ("Difference", &self.diff),
        ]
        .into_iter()
        .filter_map(|(title, image)| image.as_deref().map(|image| (title, image)))
        .collect()
    }
}

/// Writes suite results to the output directory
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            output_dir: config.output_dir,
        }
    }

    /// Write test results to JSON file
    pub fn write_json(&self, results: &SuiteResult) -> VisualResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("layout-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }

    /// Write an HTML page with screenshots attached to every failed page
    pub fn write_html(&self, results: &SuiteResult) -> VisualResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("layout-report.html");
        std::fs::write(&path, render_html(results))?;

        info!("Report written to: {}", path.display());
        Ok(path)
    }

    /// Write both report files
    pub fn write(&self, results: &SuiteResult) -> VisualResult<(PathBuf, PathBuf)> {
        Ok((self.write_json(results)?, self.write_html(results)?))
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-results"),
        }
    }
}

fn render_html(results: &SuiteResult) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Layout report</title>\n</head>\n<body>\n");
    let _ = writeln!(
        html,
        "<h1>Layout report</h1>\n<p>{} passed, {} failed ({} ms), generated {}</p>",
        results.passed, results.failed, results.duration_ms, escape(&results.generated_at)
    );

    for page in &results.results {
        render_page(&mut html, page);
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_page(html: &mut String, page: &PageResult) {
    let status = if page.success { "passed" } else { "failed" };
    let _ = writeln!(
        html,
        "<section class=\"{status}\">\n<h2>{} ({status})</h2>\n<p>{} vs {}</p>",
        escape(&page.path),
        escape(&page.production_url),
        escape(&page.staging_url),
    );

    if let Some(error) = &page.error {
        let _ = writeln!(html, "<pre>{}</pre>", escape(error));
    }

    if !page.success {
        for (title, image) in page.screenshots.attachments() {
            let _ = writeln!(
                html,
                "<figure><img src=\"data:image/png;base64,{image}\" alt=\"{title}\"><figcaption>{title}</figcaption></figure>"
            );
        }
    }

    html.push_str("</section>\n");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
