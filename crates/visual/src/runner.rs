//! Layout runner: captures production and staging pages and compares them

use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::EnvironmentConfig;
use crate::encode::{image_to_b64, png_to_b64};
use crate::error::{VisualError, VisualResult};
use crate::playwright::{PlaywrightHandle, ScreenshotSource};
use crate::report::ScreenshotsCache;
use crate::visual::{CompareConfig, Comparison, ImageComparer, Screenshot};

/// Result of executing one step of a page comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of comparing one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub path: String,
    pub production_url: String,
    pub staging_url: String,
    pub success: bool,
    pub mistakes: usize,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub production_sha256: Option<String>,
    pub staging_sha256: Option<String>,

    /// Attached only when the page failed
    #[serde(default)]
    pub screenshots: ScreenshotsCache,
}

/// Result of running all pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub generated_at: String,
    pub results: Vec<PageResult>,
}

impl SuiteResult {
    pub fn from_pages(results: Vec<PageResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            generated_at: Utc::now().to_rfc3339(),
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Both captures of a page and their comparison
pub struct PageComparison {
    pub production_png: Vec<u8>,
    pub staging_png: Vec<u8>,
    pub production: Screenshot,
    pub staging: Screenshot,
    pub comparison: Comparison,
}

impl PageComparison {
    pub fn mistake_count(&self) -> usize {
        self.comparison.mistake_count()
    }

    /// Store the diff, production and staging images as base64 PNGs
    pub fn save_images_for_report(&self, cache: &mut ScreenshotsCache) -> VisualResult<()> {
        cache.diff = Some(image_to_b64(&self.comparison.result_image)?);
        cache.production = Some(png_to_b64(&self.production_png));
        cache.staging = Some(png_to_b64(&self.staging_png));
        Ok(())
    }
}

/// Compares production and staging variants of the configured pages
pub struct LayoutRunner<S = PlaywrightHandle> {
    source: S,
    comparer: ImageComparer,
    production_url: String,
    staging_url: String,
    paths: Vec<String>,
}

impl<S: ScreenshotSource> LayoutRunner<S> {
    pub fn new(source: S, config: RunnerConfig) -> Self {
        Self {
            source,
            comparer: ImageComparer::new(config.compare),
            production_url: config.production_url,
            staging_url: config.staging_url,
            paths: config.paths,
        }
    }

    /// Capture both pages, compare them and fill `cache` with the images
    ///
    /// Fails with [`VisualError::VisualMistakes`] when any cell differs.
    /// The cache is populated before that check, so the images are
    /// available for the report either way.
    pub async fn compare_pages(
        &self,
        cache: &mut ScreenshotsCache,
        production_url: &str,
        staging_url: &str,
    ) -> VisualResult<()> {
        let mut steps = Vec::new();
        let page = self
            .capture_and_compare(production_url, staging_url, &mut steps)
            .await?;
        page.save_images_for_report(cache)?;

        match page.mistake_count() {
            0 => Ok(()),
            found => Err(VisualError::VisualMistakes { found }),
        }
    }

    /// Capture staging first, then production, and compare them
    pub async fn capture_and_compare(
        &self,
        production_url: &str,
        staging_url: &str,
        steps: &mut Vec<StepResult>,
    ) -> VisualResult<PageComparison> {
        let staging_png = record(
            steps,
            format!("capture:{}", staging_url),
            self.source.capture(staging_url),
        )
        .await?;
        let production_png = record(
            steps,
            format!("capture:{}", production_url),
            self.source.capture(production_url),
        )
        .await?;

        let (staging, production, comparison) = record(steps, "compare".to_string(), async {
            let staging = Screenshot::from_png(&staging_png)?;
            let production = Screenshot::from_png(&production_png)?;
            let comparison = self.comparer.compare_pictures(&staging, &production);
            Ok((staging, production, comparison))
        })
        .await?;

        Ok(PageComparison {
            production_png,
            staging_png,
            production,
            staging,
            comparison,
        })
    }

    /// Compare a single configured path
    pub async fn run_page(&self, path: &str) -> PageResult {
        let start = Instant::now();
        let production_url = join_url(&self.production_url, path);
        let staging_url = join_url(&self.staging_url, path);
        debug!("Comparing {} against {}", staging_url, production_url);

        let mut steps = Vec::new();
        let mut cache = ScreenshotsCache::new();
        let outcome = async {
            let page = self
                .capture_and_compare(&production_url, &staging_url, &mut steps)
                .await?;
            page.save_images_for_report(&mut cache)?;
            Ok::<_, VisualError>(page)
        }
        .await;

        let (mistakes, error, production_sha256, staging_sha256) = match &outcome {
            Ok(page) => {
                let found = page.mistake_count();
                let error = (found > 0).then(|| VisualError::VisualMistakes { found }.to_string());
                (
                    found,
                    error,
                    Some(page.production.sha256().to_string()),
                    Some(page.staging.sha256().to_string()),
                )
            }
            Err(e) => (0, Some(e.to_string()), None, None),
        };
        let success = error.is_none();

        PageResult {
            path: path.to_string(),
            production_url,
            staging_url,
            success,
            mistakes,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error,
            production_sha256,
            staging_sha256,
            screenshots: if success { ScreenshotsCache::new() } else { cache },
        }
    }

    /// Compare every configured path, one at a time
    pub async fn run_all(&self) -> SuiteResult {
        self.run_paths(&self.paths).await
    }

    /// Compare the given paths, one at a time
    pub async fn run_paths(&self, paths: &[String]) -> SuiteResult {
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Comparing {} page(s)...", paths.len());

        for path in paths {
            let result = self.run_page(path).await;
            if result.success {
                info!("✓ {} ({} ms)", result.path, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.path,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = SuiteResult::from_pages(results, start.elapsed().as_millis() as u64);

        info!("");
        info!(
            "Layout Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );

        suite
    }
}

/// Await `fut` and record how it went as a step
async fn record<T, F>(steps: &mut Vec<StepResult>, step_name: String, fut: F) -> VisualResult<T>
where
    F: Future<Output = VisualResult<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    steps.push(StepResult {
        success: result.is_ok(),
        step_name,
        duration_ms: start.elapsed().as_millis() as u64,
        error: result.as_ref().err().map(|e| e.to_string()),
    });
    result
}

/// Append a page path to a domain
pub fn join_url(domain: &str, path: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if path.is_empty() {
        format!("{}/", domain)
    } else if path.starts_with('/') {
        format!("{}{}", domain, path)
    } else {
        format!("{}/{}", domain, path)
    }
}

/// Configuration for the layout runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub production_url: String,
    pub staging_url: String,
    pub paths: Vec<String>,
    pub compare: CompareConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            production_url: "https://www.example.com".to_string(),
            staging_url: "https://staging.example.com".to_string(),
            paths: vec!["/".to_string()],
            compare: CompareConfig::default(),
        }
    }
}

impl From<EnvironmentConfig> for RunnerConfig {
    fn from(env: EnvironmentConfig) -> Self {
        Self {
            production_url: env.production_url,
            staging_url: env.staging_url,
            paths: env.paths,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://a.example", "/", "https://a.example/" ; "root")]
    #[test_case("https://a.example/", "/about", "https://a.example/about" ; "trailing slash")]
    #[test_case("https://a.example", "about", "https://a.example/about" ; "relative path")]
    #[test_case("https://a.example", "", "https://a.example/" ; "empty path")]
    fn test_join_url(domain: &str, path: &str, expected: &str) {
        assert_eq!(join_url(domain, path), expected);
    }

    #[test]
    fn test_runner_config_default() {
        let config = RunnerConfig::default();
        assert_eq!(config.paths, vec!["/".to_string()]);
        assert_eq!(config.compare.accuracy, 0.0001);
    }

    #[test]
    fn test_suite_result_counts() {
        let page = |success| PageResult {
            path: "/".to_string(),
            production_url: String::new(),
            staging_url: String::new(),
            success,
            mistakes: 0,
            duration_ms: 0,
            steps: vec![],
            error: None,
            production_sha256: None,
            staging_sha256: None,
            screenshots: ScreenshotsCache::new(),
        };
        let suite = SuiteResult::from_pages(vec![page(true), page(false), page(true)], 1);
        assert_eq!((suite.total, suite.passed, suite.failed), (3, 2, 1));
        assert!(!suite.success());
    }
}
