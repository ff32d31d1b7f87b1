//! Shotdiff visual layout testing
//!
//! This crate compares the production and staging deployments of the same
//! pages screenshot by screenshot:
//! - Captures full-page screenshots through Playwright
//! - Samples both screenshots on a fixed grid and compares per-cell intensity
//! - Outlines mistaken blocks on a copy of the staging screenshot
//! - Hands base64 PNGs of all three images to the report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Layout Test Runner (Rust)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LayoutRunner                                               │
//! │    ├── ScreenshotSource::capture(url) -> PNG bytes          │
//! │    ├── ImageComparer::compare_pictures(staging, prod)       │
//! │    │     └── Grid 60x80, stride block+1, accuracy 0.0001    │
//! │    ├── compare_pages(cache, prod_url, staging_url)          │
//! │    └── run_all() -> SuiteResult                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Report                                                     │
//! │    ├── ScreenshotsCache { production, staging, diff }       │
//! │    └── layout-results.json, layout-report.html              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod encode;
pub mod error;
pub mod grid;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod visual;

pub use config::EnvironmentConfig;
pub use error::{VisualError, VisualResult};
pub use grid::{Cell, Grid};
pub use report::ScreenshotsCache;
pub use runner::LayoutRunner;
pub use visual::{Comparison, ImageComparer, Screenshot};
