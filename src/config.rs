//! Chooser configuration (`config.json`).
//!
//! Resolves to `<platform config dir>/icon-chooser/config.json`, e.g.
//! `~/.config/icon-chooser/config.json` on Linux.

use crate::error::{ChooserError, Result};
use crate::license::{LicenseRequest, is_valid_semver, resolve_version_alias};
use crate::technology::Technology;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Inputs to a chooser instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChooserConfig {
    /// Product version, aliases such as `5.x` allowed. Ignored when a kit
    /// declares its own version.
    pub version: Option<String>,
    pub kit_token: Option<String>,
    pub pro: bool,
    /// CDN asset URL; `.js` selects SVG delivery, `.css` webfonts.
    pub cdn_url: Option<String>,
    /// Base URL for individual icon payload fetches.
    pub svg_fetch_base_url: Option<String>,
    pub search_debounce_ms: u64,
    pub fetch_timeout_ms: u64,
    pub search_page_size: u32,
}

impl Default for ChooserConfig {
    fn default() -> Self {
        Self {
            version: None,
            kit_token: None,
            pro: false,
            cdn_url: None,
            svg_fetch_base_url: None,
            search_debounce_ms: 500,
            fetch_timeout_ms: 10_000,
            search_page_size: 100,
        }
    }
}

impl ChooserConfig {
    fn kit_token(&self) -> Option<&str> {
        self.kit_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Technology implied by the CDN URL, if one is set.
    pub fn cdn_technology(&self) -> Result<Option<Technology>> {
        self.cdn_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(Technology::from_cdn_url)
            .transpose()
    }

    /// Either a kit token, or a valid version plus a recognizable CDN URL.
    pub fn validate(&self) -> Result<()> {
        if self.kit_token().is_some() {
            return self.cdn_technology().map(|_| ());
        }

        let version_ok = self
            .version
            .as_deref()
            .map(|v| is_valid_semver(resolve_version_alias(v.trim())))
            .unwrap_or(false);
        if !version_ok {
            return Err(ChooserError::Configuration(
                "since no kit token was specified, there must be a valid version".into(),
            ));
        }

        match self.cdn_technology()? {
            Some(_) => Ok(()),
            None => Err(ChooserError::Configuration(
                "since no kit token was specified, there must be a cdn url".into(),
            )),
        }
    }

    pub fn license_request(&self) -> LicenseRequest {
        LicenseRequest {
            version: self.version.clone(),
            pro: self.pro,
            kit_token: self.kit_token().map(str::to_string),
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Default config file location.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("icon-chooser").join("config.json"))
}

/// Load config from `path`, returning defaults if the file is missing or invalid.
pub fn load_config_from(path: &Path) -> ChooserConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            ChooserConfig::default()
        }),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no config file, using defaults");
            ChooserConfig::default()
        }
    }
}

pub fn save_config_to(config: &ChooserConfig, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// Write to a temp file in the same directory, then rename over the target.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn cdn(version: &str, url: &str) -> ChooserConfig {
        ChooserConfig {
            version: Some(version.into()),
            cdn_url: Some(url.into()),
            ..Default::default()
        }
    }

    #[test]
    fn default_values() {
        let config = ChooserConfig::default();
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.search_page_size, 100);
        assert!(!config.pro);
    }

    #[test]
    fn kit_token_alone_is_valid() {
        let config = ChooserConfig {
            kit_token: Some("deadbeef00".into()),
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(
            config.license_request().kit_token.as_deref(),
            Some("deadbeef00")
        );
    }

    #[test]
    fn cdn_config_requires_valid_version_and_url() {
        cdn("5.x", "https://use.example.com/all.js").validate().unwrap();
        assert!(cdn("five", "https://use.example.com/all.js").validate().is_err());
        assert!(cdn("6.4.0", "https://use.example.com/all.woff").validate().is_err());
        assert!(ChooserConfig::default().validate().is_err());

        let no_cdn = ChooserConfig {
            version: Some("6.4.0".into()),
            ..Default::default()
        };
        assert!(matches!(no_cdn.validate(), Err(ChooserError::Configuration(_))));
    }

    #[test]
    fn blank_kit_token_is_ignored() {
        let config = ChooserConfig {
            kit_token: Some("  ".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.license_request().kit_token, None);
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = ChooserConfig {
            kit_token: Some("abc".into()),
            pro: true,
            search_debounce_ms: 250,
            ..Default::default()
        };
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path), config);
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json"));
        assert_eq!(config, ChooserConfig::default());
    }

    #[test]
    fn load_invalid_json_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not valid json!!!").unwrap();
        assert_eq!(load_config_from(&path), ChooserConfig::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"version":"6.4.0","unknown_field":42}"#).unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.version.as_deref(), Some("6.4.0"));
        assert_eq!(config.fetch_timeout_ms, 10_000);
    }
}
