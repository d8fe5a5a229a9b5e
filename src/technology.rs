//! Delivery technology and asset URLs
//!
//! Icons reach the page either through a kit or through the CDN, and either as
//! SVG (vector definitions) or as webfonts (glyph classes).

use crate::error::{ChooserError, Result};
use crate::query::UrlTextFetcher;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Technology {
    KitSvg,
    KitWebfont,
    CdnSvg,
    CdnWebfont,
}

impl Technology {
    /// Technology implied by a CDN URL: `.js` is SVG, `.css` is webfont.
    pub fn from_cdn_url(cdn_url: &str) -> Result<Self> {
        let path = cdn_url.split(['?', '#']).next().unwrap_or(cdn_url);
        if path.ends_with(".js") {
            Ok(Self::CdnSvg)
        } else if path.ends_with(".css") {
            Ok(Self::CdnWebfont)
        } else {
            Err(ChooserError::Configuration(format!(
                "unrecognized cdn url, expected something ending .js or .css, got: {cdn_url}"
            )))
        }
    }

    /// Technology selected in kit metadata (`svg` or `webfonts`).
    pub fn from_kit_selection(selected: &str) -> Option<Self> {
        match selected {
            "svg" => Some(Self::KitSvg),
            "webfonts" => Some(Self::KitWebfont),
            _ => None,
        }
    }

    pub fn is_svg(self) -> bool {
        matches!(self, Self::KitSvg | Self::CdnSvg)
    }

    pub fn is_webfont(self) -> bool {
        !self.is_svg()
    }

    pub fn is_kit(self) -> bool {
        matches!(self, Self::KitSvg | Self::KitWebfont)
    }
}

/// CDN subdomain for the license tier.
pub fn cdn_subdomain(pro: bool) -> &'static str {
    if pro { "pro" } else { "use" }
}

/// Asset host for the license tier, e.g. `https://pro.fontawesome.com`.
pub fn cdn_base_url(pro: bool) -> String {
    format!("https://{}.fontawesome.com", cdn_subdomain(pro))
}

/// URL of the vector library script bundle.
pub fn library_script_url(
    base_url: &str,
    version: &str,
    pro: bool,
    kit_token: Option<&str>,
) -> String {
    let base_url = base_url.trim_end_matches('/');
    match kit_token {
        Some(token) if pro => {
            format!("{base_url}/releases/v{version}/js/pro.min.js?token={token}")
        }
        _ => format!("{base_url}/releases/v{version}/js/all.js"),
    }
}

/// URL of the CDN stylesheet for webfont delivery.
pub fn cdn_stylesheet_url(version: &str, pro: bool) -> String {
    format!("{}/releases/v{version}/css/all.css", cdn_base_url(pro))
}

/// URL of the kit loader script.
pub fn kit_script_url(kit_token: &str) -> String {
    format!("https://kit.fontawesome.com/{kit_token}.js")
}

/// Retrieve the vector library script bundle text.
pub async fn fetch_library_script(
    fetcher: &dyn UrlTextFetcher,
    base_url: &str,
    version: &str,
    pro: bool,
    kit_token: Option<&str>,
) -> Result<String> {
    let url = library_script_url(base_url, version, pro, kit_token);
    debug!(%url, "fetching library script");
    fetcher.get_url_text(&url).await.map_err(|err| match err {
        ChooserError::Transport { message, .. } => ChooserError::transport(url, message),
        other => ChooserError::transport(url, other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFetcher {
        urls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl UrlTextFetcher for RecordingFetcher {
        async fn get_url_text(&self, url: &str) -> Result<String> {
            self.urls.lock().unwrap().push(url.to_string());
            if self.fail {
                Err(ChooserError::transport("fetch", "fake rejection"))
            } else {
                Ok("foobar".into())
            }
        }
    }

    #[test]
    fn technology_from_cdn_url() {
        assert_eq!(
            Technology::from_cdn_url("https://example.com/all.js").unwrap(),
            Technology::CdnSvg
        );
        assert_eq!(
            Technology::from_cdn_url("https://example.com/all.css?v=1").unwrap(),
            Technology::CdnWebfont
        );
        assert!(matches!(
            Technology::from_cdn_url("https://example.com/all.woff2"),
            Err(ChooserError::Configuration(_))
        ));
    }

    #[test]
    fn technology_from_kit_selection() {
        assert_eq!(Technology::from_kit_selection("svg"), Some(Technology::KitSvg));
        assert_eq!(
            Technology::from_kit_selection("webfonts"),
            Some(Technology::KitWebfont)
        );
        assert_eq!(Technology::from_kit_selection("unknown"), None);
    }

    #[test]
    fn stylesheet_and_kit_urls() {
        assert_eq!(
            cdn_stylesheet_url("5.15.3", true),
            "https://pro.fontawesome.com/releases/v5.15.3/css/all.css"
        );
        assert_eq!(
            cdn_stylesheet_url("5.15.3", false),
            "https://use.fontawesome.com/releases/v5.15.3/css/all.css"
        );
        assert_eq!(
            kit_script_url("deadbeef00"),
            "https://kit.fontawesome.com/deadbeef00.js"
        );
    }

    #[tokio::test]
    async fn basic_pro_kit_script() {
        let fetcher = RecordingFetcher::default();
        let text = fetch_library_script(
            &fetcher,
            "https://example.com",
            "5.0.0",
            true,
            Some("deadbeef00"),
        )
        .await
        .unwrap();

        assert_eq!(text, "foobar");
        assert_eq!(
            fetcher.urls.lock().unwrap().as_slice(),
            ["https://example.com/releases/v5.0.0/js/pro.min.js?token=deadbeef00"]
        );
    }

    #[tokio::test]
    async fn basic_free_cdn_script() {
        let fetcher = RecordingFetcher::default();
        fetch_library_script(&fetcher, "https://example.com/", "5.0.0", false, None)
            .await
            .unwrap();

        assert_eq!(
            fetcher.urls.lock().unwrap().as_slice(),
            ["https://example.com/releases/v5.0.0/js/all.js"]
        );
    }

    #[tokio::test]
    async fn rejected_script_fetch_carries_url() {
        let fetcher = RecordingFetcher {
            fail: true,
            ..Default::default()
        };
        let err = fetch_library_script(&fetcher, "https://example.com", "5.0.0", false, None)
            .await
            .unwrap_err();

        match err {
            ChooserError::Transport { context, message } => {
                assert_eq!(context, "https://example.com/releases/v5.0.0/js/all.js");
                assert_eq!(message, "fake rejection");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
