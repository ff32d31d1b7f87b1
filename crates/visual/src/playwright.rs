//! Playwright screenshot capture
//!
//! Each capture runs a generated Node script that opens the page, drops
//! focus from the active element so no focus ring is rendered, scrolls to
//! the origin, waits a fixed settle delay and takes a full-page screenshot.
//! The settle delay is a blind wait; slow pages may still be mid-render.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::error::{VisualError, VisualResult};

/// Anything that can turn a URL into PNG screenshot bytes
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn capture(&self, url: &str) -> VisualResult<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = VisualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(VisualError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    viewport_width: u32,
    viewport_height: u32,
    settle: Duration,
    headless: bool,
    browser: Browser,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> VisualResult<Self> {
        Self::check_playwright_installed()?;
        Ok(Self::without_check(config))
    }

    fn without_check(config: PlaywrightConfig) -> Self {
        Self {
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            settle: config.settle,
            headless: config.headless,
            browser: config.browser,
        }
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> VisualResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(VisualError::PlaywrightNotFound),
        }
    }

    /// Build the capture script for one page
    pub fn build_script(&self, url: &str, screenshot_path: &str) -> String {
        format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();

  try {{
    await page.goto({url});
    await page.evaluate(() => {{
      if (document.activeElement) document.activeElement.blur();
    }});
    await page.evaluate(() => window.scrollTo(0, 0));
    await page.waitForTimeout({settle_ms});
    await page.screenshot({{ path: {path}, fullPage: true }});
    console.log(JSON.stringify({{ success: true }}));
  }} catch (error) {{
    console.error(JSON.stringify({{ success: false, error: error.message, stack: error.stack }}));
    process.exit(1);
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            browser = self.browser.as_str(),
            headless = self.headless,
            width = self.viewport_width,
            height = self.viewport_height,
            url = js_string(url),
            settle_ms = self.settle.as_millis(),
            path = js_string(screenshot_path),
        )
    }

    /// Execute a script via Node
    async fn run_script(&self, script: &str, work_dir: &std::path::Path) -> VisualResult<()> {
        let script_path = work_dir.join("capture.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(work_dir)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(VisualError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ScreenshotSource for PlaywrightHandle {
    async fn capture(&self, url: &str) -> VisualResult<Vec<u8>> {
        let temp_dir = tempfile::tempdir()?;
        let screenshot_path: PathBuf = temp_dir.path().join("screenshot.png");
        let script = self.build_script(url, &screenshot_path.to_string_lossy());

        debug!("Capturing {}", url);
        self.run_script(&script, temp_dir.path())
            .await
            .map_err(|e| VisualError::Capture {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(std::fs::read(&screenshot_path)?)
    }
}

/// Quote a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    // JSON string syntax is valid JavaScript
    serde_json::Value::String(value.to_string()).to_string()
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Blind wait between scrolling to the top and the screenshot
    pub settle: Duration,
    pub browser: Browser,
    pub headless: bool,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            settle: Duration::from_secs(1),
            browser: Browser::Chromium,
            headless: true,
        }
    }
}
