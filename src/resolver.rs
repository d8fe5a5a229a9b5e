//! Icon source resolution
//!
//! Decides, per icon, where a renderable definition comes from: the upload
//! itself, a direct definition, the shared library, or a remote fetch. Each
//! lookup moves through `Unresolved → Resolving → Resolved | Failed`; both
//! terminal states stick until the resolver is dropped.

use crate::error::{ChooserError, Result};
use crate::icon::{IconDefinition, IconLookup, IconUpload};
use crate::library::IconStore;
use crate::license::ResolvedLicense;
use crate::parser::{parse_icon_json, parse_svg_text};
use crate::query::UrlTextFetcher;
use crate::technology::Technology;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// What the caller wants rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconRequest {
    Lookup(IconLookup),
    Upload(IconUpload),
    Definition(IconDefinition),
}

impl IconRequest {
    pub fn lookup(&self) -> IconLookup {
        match self {
            Self::Lookup(lookup) => lookup.clone(),
            Self::Upload(upload) => {
                IconLookup::new(ResolvedLicense::upload_prefix(upload), &upload.name)
            }
            Self::Definition(definition) => definition.lookup(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolutionState {
    #[default]
    Unresolved,
    Resolving,
    Resolved(IconDefinition),
    Failed(ChooserError),
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved(_) | Self::Failed(_))
    }
}

type InFlight = Arc<OnceCell<Result<IconDefinition>>>;

pub struct IconSourceResolver {
    library: Arc<dyn IconStore>,
    fetcher: Arc<dyn UrlTextFetcher>,
    license: Arc<ResolvedLicense>,
    technology: Technology,
    fetch_base_url: Option<String>,
    fetch_timeout: Duration,
    in_flight: Mutex<HashMap<IconLookup, InFlight>>,
    states: Mutex<HashMap<IconLookup, ResolutionState>>,
}

impl IconSourceResolver {
    pub fn new(
        library: Arc<dyn IconStore>,
        fetcher: Arc<dyn UrlTextFetcher>,
        license: Arc<ResolvedLicense>,
        technology: Technology,
    ) -> Self {
        Self {
            library,
            fetcher,
            license,
            technology,
            fetch_base_url: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            in_flight: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_fetch_base_url(mut self, base_url: Option<String>) -> Self {
        self.fetch_base_url = base_url.map(|url| url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn state(&self, lookup: &IconLookup) -> ResolutionState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(lookup)
            .cloned()
            .unwrap_or_default()
    }

    fn set_state(&self, lookup: &IconLookup, state: ResolutionState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(lookup.clone(), state);
    }

    fn finish(&self, lookup: &IconLookup, result: Result<IconDefinition>) -> Result<IconDefinition> {
        let state = match &result {
            Ok(definition) => ResolutionState::Resolved(definition.clone()),
            Err(err) => ResolutionState::Failed(err.clone()),
        };
        self.set_state(lookup, state);
        result
    }

    /// Resolve a request to a concrete definition.
    pub async fn resolve(&self, request: &IconRequest) -> Result<IconDefinition> {
        match request {
            IconRequest::Upload(upload) => {
                let lookup = request.lookup();
                let result = upload
                    .geometry()
                    .map(|geometry| IconDefinition::new(&lookup.prefix, &lookup.name, geometry));
                self.finish(&lookup, result)
            }
            IconRequest::Definition(definition) => {
                self.finish(&definition.lookup(), Ok(definition.clone()))
            }
            IconRequest::Lookup(lookup) => self.resolve_lookup(lookup).await,
        }
    }

    async fn resolve_lookup(&self, lookup: &IconLookup) -> Result<IconDefinition> {
        if let ResolutionState::Failed(err) = self.state(lookup) {
            return Err(err);
        }

        if let Some(definition) = self.library.find_icon_definition(lookup) {
            trace!(%lookup, "library hit");
            return self.finish(lookup, Ok(definition));
        }

        let unavailable = || ChooserError::Unavailable {
            prefix: lookup.prefix.clone(),
            name: lookup.name.clone(),
        };

        if !self.license.context.is_pro || !self.technology.is_kit() {
            debug!(%lookup, technology = ?self.technology, "no source for icon");
            return self.finish(lookup, Err(unavailable()));
        }

        let (Some(base_url), Some(token)) = (
            self.fetch_base_url.as_deref(),
            self.license.context.kit_token.as_deref(),
        ) else {
            let err = ChooserError::Configuration(
                "fetching icons requires a fetch base url and a kit token".into(),
            );
            warn!(%lookup, %err, "cannot resolve icon");
            return self.finish(lookup, Err(err));
        };

        let Some(family_style) = self.license.table.family_style_for(&lookup.prefix) else {
            return self.finish(lookup, Err(unavailable()));
        };
        let extension = if self.license.context.uses_json_delivery() {
            "json"
        } else {
            "svg"
        };
        let url = format!(
            "{base_url}/{}/{}.{extension}?token={token}",
            family_style.fetch_path_segment(),
            lookup.name
        );

        let cell = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(lookup.clone())
            .or_default()
            .clone();

        self.set_state(lookup, ResolutionState::Resolving);
        let result = cell
            .get_or_init(|| self.fetch_and_register(lookup, url))
            .await
            .clone();

        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(lookup);
        self.finish(lookup, result)
    }

    async fn fetch_and_register(&self, lookup: &IconLookup, url: String) -> Result<IconDefinition> {
        debug!(%lookup, %url, "fetching icon");
        let result = self.fetch_definition(lookup, &url).await;
        match &result {
            Ok(definition) => self.library.add_icon_definition(definition.clone()),
            Err(err) => warn!(%lookup, %url, %err, "icon resolution failed"),
        }
        result
    }

    async fn fetch_definition(&self, lookup: &IconLookup, url: &str) -> Result<IconDefinition> {
        let text = tokio::time::timeout(self.fetch_timeout, self.fetcher.get_url_text(url))
            .await
            .map_err(|_| ChooserError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|err| match err {
                ChooserError::Transport { message, .. } => ChooserError::transport(url, message),
                other => other,
            })?;

        let geometry = if self.license.context.uses_json_delivery() {
            parse_icon_json(&text)?
        } else {
            parse_svg_text(&text)?
        };
        Ok(IconDefinition::new(&lookup.prefix, &lookup.name, geometry))
    }
}
