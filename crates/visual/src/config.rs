//! Environment configuration
//!
//! An environment is a JSON file `config/<name>.json` naming the production
//! and staging deployments and the page paths to compare on both. The
//! bundled `config/env_main.json` points at placeholder `example.com`
//! domains; replace them with real deployments before running the harness.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{VisualError, VisualResult};

/// Environment used when none is selected
pub const DEFAULT_ENV: &str = "env_main";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Reference deployment, e.g. `https://www.example.com`
    pub production_url: String,

    /// Candidate deployment compared against production
    pub staging_url: String,

    /// Page paths appended to both deployments
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,

    /// Override for the wait before each screenshot
    #[serde(default)]
    pub settle_ms: Option<u64>,
}

fn default_paths() -> Vec<String> {
    vec!["/".to_string()]
}

/// Command-line values that take precedence over the environment file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub production_url: Option<String>,
    pub staging_url: Option<String>,
    /// Replaces the file's paths when non-empty
    pub paths: Vec<String>,
    pub settle_ms: Option<u64>,
}

impl Overrides {
    /// Whether any deployment was given explicitly
    pub fn names_a_deployment(&self) -> bool {
        self.production_url.is_some() || self.staging_url.is_some()
    }
}

impl EnvironmentConfig {
    /// Location of an environment file inside `config_dir`
    pub fn path_for(config_dir: &Path, env: &str) -> PathBuf {
        config_dir.join(format!("{}.json", env))
    }

    fn load(path: &Path) -> VisualResult<Self> {
        debug!("Loading environment from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisualError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Merge `overrides` over the named environment and validate the result
    ///
    /// The environment file is only read when the overrides do not name
    /// both deployments; a missing file is an error in that case.
    pub fn resolve(config_dir: &Path, env: &str, overrides: &Overrides) -> VisualResult<Self> {
        let mut config = match (&overrides.production_url, &overrides.staging_url) {
            (Some(production), Some(staging)) => Self {
                production_url: production.clone(),
                staging_url: staging.clone(),
                paths: default_paths(),
                settle_ms: None,
            },
            (production, staging) => {
                let mut config = Self::load(&Self::path_for(config_dir, env))?;
                if let Some(production) = production {
                    config.production_url = production.clone();
                }
                if let Some(staging) = staging {
                    config.staging_url = staging.clone();
                }
                config
            }
        };

        if !overrides.paths.is_empty() {
            config.paths = overrides.paths.clone();
        }
        if overrides.settle_ms.is_some() {
            config.settle_ms = overrides.settle_ms;
        }

        config.validate()?;
        Ok(config)
    }

    /// Keep only paths containing `filter`; returns whether any are left
    pub fn retain_paths_matching(&mut self, filter: &str) -> bool {
        self.paths.retain(|path| path.contains(filter));
        !self.paths.is_empty()
    }

    pub fn validate(&self) -> VisualResult<()> {
        for (name, url) in [
            ("production_url", &self.production_url),
            ("staging_url", &self.staging_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(VisualError::Config(format!(
                    "{} must be an absolute http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if self.paths.is_empty() {
            return Err(VisualError::Config("no paths to compare".to_string()));
        }

        Ok(())
    }

    pub fn settle(&self) -> Option<Duration> {
        self.settle_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("env_main.json"),
            r#"{"production_url": "https://www.example.com", "staging_url": "https://staging.example.com"}"#,
        )
        .unwrap();

        let config =
            EnvironmentConfig::resolve(dir.path(), DEFAULT_ENV, &Overrides::default()).unwrap();
        assert_eq!(config.paths, vec!["/".to_string()]);
        assert_eq!(config.settle(), None);
    }

    #[test]
    fn test_bundled_environment_uses_placeholder_domains() {
        let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let config =
            EnvironmentConfig::resolve(&config_dir, DEFAULT_ENV, &Overrides::default()).unwrap();
        assert!(config.production_url.ends_with("example.com"));
        assert!(config.staging_url.ends_with("example.com"));
    }

    fn write_env(dir: &Path, name: &str) {
        std::fs::write(
            dir.join(format!("{}.json", name)),
            r#"{
                "production_url": "https://www.example.com",
                "staging_url": "https://staging.example.com",
                "paths": ["/", "/about", "/pricing"],
                "settle_ms": 500
            }"#,
        )
        .unwrap();
    }

    #[test]
    fn test_resolve_both_deployments_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            production_url: Some("https://prod.example.net".to_string()),
            staging_url: Some("https://stage.example.net".to_string()),
            ..Default::default()
        };

        let config = EnvironmentConfig::resolve(dir.path(), "absent", &overrides).unwrap();
        assert_eq!(config.production_url, "https://prod.example.net");
        assert_eq!(config.staging_url, "https://stage.example.net");
        assert_eq!(config.paths, default_paths());
        assert_eq!(config.settle_ms, None);
    }

    #[test]
    fn test_resolve_one_deployment_over_file() {
        let dir = tempfile::tempdir().unwrap();
        write_env(dir.path(), DEFAULT_ENV);
        let overrides = Overrides {
            staging_url: Some("https://review-42.example.com".to_string()),
            ..Default::default()
        };

        let config = EnvironmentConfig::resolve(dir.path(), DEFAULT_ENV, &overrides).unwrap();
        assert_eq!(config.production_url, "https://www.example.com");
        assert_eq!(config.staging_url, "https://review-42.example.com");
        assert_eq!(config.paths.len(), 3);
        assert_eq!(config.settle(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_resolve_one_deployment_needs_file() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            production_url: Some("https://www.example.com".to_string()),
            ..Default::default()
        };

        let err = EnvironmentConfig::resolve(dir.path(), DEFAULT_ENV, &overrides).unwrap_err();
        assert!(matches!(err, VisualError::Config(_)));
    }

    #[test]
    fn test_resolve_paths_and_settle_replace_file() {
        let dir = tempfile::tempdir().unwrap();
        write_env(dir.path(), "staging");
        let overrides = Overrides {
            paths: vec!["/checkout".to_string()],
            settle_ms: Some(2000),
            ..Default::default()
        };

        let config = EnvironmentConfig::resolve(dir.path(), "staging", &overrides).unwrap();
        assert_eq!(config.paths, vec!["/checkout".to_string()]);
        assert_eq!(config.settle_ms, Some(2000));
    }

    #[test]
    fn test_resolve_missing_file_without_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnvironmentConfig::resolve(dir.path(), "does_not_exist", &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, VisualError::Config(_)));
    }

    #[test]
    fn test_resolve_validates_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            production_url: Some("www.example.com".to_string()),
            staging_url: Some("https://staging.example.com".to_string()),
            ..Default::default()
        };
        assert!(EnvironmentConfig::resolve(dir.path(), DEFAULT_ENV, &overrides).is_err());
    }

    #[test]
    fn test_retain_paths_matching() {
        let dir = tempfile::tempdir().unwrap();
        write_env(dir.path(), DEFAULT_ENV);
        let mut config =
            EnvironmentConfig::resolve(dir.path(), DEFAULT_ENV, &Overrides::default()).unwrap();

        assert!(config.retain_paths_matching("pri"));
        assert_eq!(config.paths, vec!["/pricing".to_string()]);
        assert!(!config.retain_paths_matching("nothing"));
        assert!(config.paths.is_empty());
    }

    #[test]
    fn test_overrides_name_deployments() {
        let mut overrides = Overrides::default();
        assert!(!overrides.names_a_deployment());
        overrides.staging_url = Some("https://staging.example.com".to_string());
        assert!(overrides.names_a_deployment());
    }

    #[test]
    fn test_relative_url_rejected() {
        let config = EnvironmentConfig {
            production_url: "www.example.com".to_string(),
            staging_url: "https://staging.example.com".to_string(),
            paths: default_paths(),
            settle_ms: Some(250),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_paths_rejected() {
        let config = EnvironmentConfig {
            production_url: "https://www.example.com".to_string(),
            staging_url: "https://staging.example.com".to_string(),
            paths: vec![],
            settle_ms: None,
        };
        assert!(config.validate().is_err());
    }
}
