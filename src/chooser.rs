//! Icon chooser controller
//!
//! Wires license resolution, search, filtering, icon resolution and render
//! projection into one widget instance. Activation establishes the license
//! context once; any failure there is terminal (`ChooserState::Fatal`).
//! Everything afterwards is per interaction, and per-icon failures never
//! affect the rest of the chooser.

use crate::builtin;
use crate::config::ChooserConfig;
use crate::error::{ChooserError, Result};
use crate::family::{KIT_DUOTONE_PREFIX, KIT_PREFIX};
use crate::filter::StyleFilterState;
use crate::icon::{IconDefinition, IconLookup};
use crate::library::IconStore;
use crate::license::{ResolvedLicense, VersionAndLicenseResolver};
use crate::query::{QueryHandler, UrlTextFetcher};
use crate::render::{self, IconChooserResult, IconSize, RenderOutput};
use crate::resolver::{IconRequest, IconSourceResolver, ResolutionState};
use crate::search::{self, Debouncer, SearchResultProjector, SearchSequencer};
use crate::technology::{self, Technology};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{OnceCell, broadcast};
use tracing::{debug, error, info, warn};

const EVENT_BUFFER: usize = 64;

/// Host-supplied capabilities.
#[derive(Clone)]
pub struct Collaborators {
    pub query: Arc<dyn QueryHandler>,
    pub fetcher: Arc<dyn UrlTextFetcher>,
    pub library: Arc<dyn IconStore>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChooserState {
    Loading,
    Ready,
    /// Terminal. The host may build a new chooser to retry.
    Fatal(ChooserError),
}

/// Everything established by activation.
struct Session {
    license: Arc<ResolvedLicense>,
    technology: Technology,
    resolver: IconSourceResolver,
}

#[derive(Default)]
struct View {
    query: String,
    results: Vec<IconLookup>,
    filter: StyleFilterState,
}

/// Receiver for "selection finished" events.
#[derive(Debug)]
pub struct SelectionRx {
    rx: broadcast::Receiver<IconChooserResult>,
}

impl SelectionRx {
    pub async fn recv(&mut self) -> Option<IconChooserResult> {
        loop {
            match self.rx.recv().await {
                Ok(result) => return Some(result),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<IconChooserResult> {
        loop {
            match self.rx.try_recv() {
                Ok(result) => return Some(result),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

pub struct IconChooser {
    config: ChooserConfig,
    collaborators: Collaborators,
    projector: SearchResultProjector,
    sequencer: SearchSequencer,
    debouncer: Debouncer,
    state: Mutex<ChooserState>,
    session: OnceCell<Arc<Session>>,
    view: Mutex<View>,
    mounted: AtomicBool,
    events: broadcast::Sender<IconChooserResult>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl IconChooser {
    pub fn new(config: ChooserConfig, collaborators: Collaborators) -> Self {
        let projector =
            SearchResultProjector::new(collaborators.query.clone(), config.search_page_size);
        let debouncer = Debouncer::new(config.search_debounce());
        let (events, _rx) = broadcast::channel(EVENT_BUFFER);
        Self {
            config,
            collaborators,
            projector,
            sequencer: SearchSequencer::new(),
            debouncer,
            state: Mutex::new(ChooserState::Loading),
            session: OnceCell::new(),
            view: Mutex::new(View::default()),
            mounted: AtomicBool::new(true),
            events,
        }
    }

    pub fn state(&self) -> ChooserState {
        lock(&self.state).clone()
    }

    pub fn subscribe(&self) -> SelectionRx {
        SelectionRx {
            rx: self.events.subscribe(),
        }
    }

    /// Detach from the host. Pending operations finish but no longer touch
    /// chooser state.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        debug!("icon chooser unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    /// Resolve version, license and delivery technology, then show the
    /// default listing. Concurrent calls share one bootstrap; calling again
    /// after success is a no-op.
    pub async fn activate(&self) -> Result<()> {
        let session = self
            .session
            .get_or_try_init(|| async {
                if let ChooserState::Fatal(err) = self.state() {
                    return Err(ChooserError::Fatal(err.to_string()));
                }
                match self.bootstrap().await {
                    Ok(session) => Ok(Arc::new(session)),
                    Err(err) => {
                        error!(%err, "icon chooser activation failed");
                        if self.is_mounted() {
                            *lock(&self.state) = ChooserState::Fatal(err.clone());
                        }
                        Err(err)
                    }
                }
            })
            .await?;

        if !self.is_mounted() {
            debug!("activation finished after unmount, discarding");
            return Ok(());
        }

        let mut state = lock(&self.state);
        if *state == ChooserState::Loading {
            info!(
                version = %session.license.context.version,
                is_pro = session.license.context.is_pro,
                technology = ?session.technology,
                "icon chooser ready"
            );
            lock(&self.view).results = search::default_icons(&session.license);
            *state = ChooserState::Ready;
        }
        Ok(())
    }

    async fn bootstrap(&self) -> Result<Session> {
        self.config.validate()?;
        let cdn_technology = self.config.cdn_technology()?;

        let license = VersionAndLicenseResolver::new(self.collaborators.query.clone())
            .resolve(&self.config.license_request())
            .await?;

        let kit_technology = license.kit.as_ref().map(|kit| {
            kit.technology_selected
                .as_deref()
                .and_then(Technology::from_kit_selection)
        });
        let technology = match (kit_technology, cdn_technology) {
            (Some(Some(technology)), _) => technology,
            (_, Some(technology)) => technology,
            (Some(None), None) => Technology::KitSvg,
            (None, None) => {
                return Err(ChooserError::Configuration(
                    "no delivery technology could be determined".into(),
                ));
            }
        };

        let license = Arc::new(license);
        let resolver = IconSourceResolver::new(
            self.collaborators.library.clone(),
            self.collaborators.fetcher.clone(),
            license.clone(),
            technology,
        )
        .with_fetch_base_url(self.config.svg_fetch_base_url.clone())
        .with_fetch_timeout(self.config.fetch_timeout());

        Ok(Session {
            license,
            technology,
            resolver,
        })
    }

    fn session(&self) -> Result<Arc<Session>> {
        match self.state() {
            ChooserState::Fatal(err) => Err(ChooserError::Fatal(err.to_string())),
            ChooserState::Loading => Err(ChooserError::Configuration(
                "icon chooser is not activated".into(),
            )),
            ChooserState::Ready => self.session.get().cloned().ok_or_else(|| {
                ChooserError::Configuration("icon chooser is not activated".into())
            }),
        }
    }

    pub fn license(&self) -> Option<Arc<ResolvedLicense>> {
        self.session.get().map(|s| s.license.clone())
    }

    pub fn technology(&self) -> Option<Technology> {
        self.session.get().map(|s| s.technology)
    }

    /// Vector library script bundle for SVG delivery, fetched through the
    /// host's URL fetcher.
    pub async fn library_script(&self) -> Result<String> {
        let session = self.session()?;
        if session.technology.is_webfont() {
            return Err(ChooserError::Configuration(
                "webfont delivery has no library script".into(),
            ));
        }
        let context = &session.license.context;
        technology::fetch_library_script(
            self.collaborators.fetcher.as_ref(),
            &technology::cdn_base_url(context.is_pro),
            &context.version_string(),
            context.is_pro,
            context.kit_token.as_deref(),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Run a search and, unless a newer search has already been displayed,
    /// replace the displayed results.
    pub async fn search(&self, query: &str) -> Result<Vec<IconLookup>> {
        let session = self.session()?;
        let ticket = self.sequencer.begin();

        let icons = self
            .projector
            .search(query, &session.license)
            .await
            .inspect_err(|err| warn!(%query, %err, "search failed"))?;

        if !self.is_mounted() {
            debug!(%query, "search finished after unmount, discarding");
        } else if self.sequencer.try_apply(ticket) {
            let mut view = lock(&self.view);
            view.query = query.to_string();
            view.results = icons.clone();
        } else {
            debug!(%query, "discarding stale search response");
        }
        Ok(icons)
    }

    /// Keystroke entry point: searches once input has been idle for the
    /// configured debounce delay. Returns `None` when superseded by newer input.
    pub async fn on_query_input(&self, query: &str) -> Result<Option<Vec<IconLookup>>> {
        if !self.debouncer.settle().await {
            return Ok(None);
        }
        self.search(query).await.map(Some)
    }

    pub fn query(&self) -> String {
        lock(&self.view).query.clone()
    }

    /// Currently displayed results, before style filtering.
    pub fn results(&self) -> Vec<IconLookup> {
        lock(&self.view).results.clone()
    }

    // -----------------------------------------------------------------------
    // Style filter
    // -----------------------------------------------------------------------

    pub fn selected_family_style(&self) -> (String, String) {
        let view = lock(&self.view);
        (
            view.filter.family().to_string(),
            view.filter.style().to_string(),
        )
    }

    pub fn select_family(&self, family: &str) {
        if let Some(license) = self.license() {
            lock(&self.view).filter.select_family(&license.available, family);
        }
    }

    pub fn select_style(&self, style: &str) {
        if let Some(license) = self.license() {
            lock(&self.view).filter.select_style(&license.available, style);
        }
    }

    pub fn reset_filter(&self) {
        lock(&self.view).filter.reset();
    }

    /// Displayed results narrowed to the selected family/style.
    pub fn visible_icons(&self) -> Vec<IconLookup> {
        let Some(license) = self.license() else {
            return Vec::new();
        };
        let view = lock(&self.view);
        view.filter.filter(&license.available, &view.results)
    }

    /// Sad-tear markup shown in place of the grid when a ready chooser has
    /// nothing to display.
    pub fn no_results(&self, size: IconSize) -> Option<String> {
        if self.state() != ChooserState::Ready || !self.visible_icons().is_empty() {
            return None;
        }
        Some(render::render_svg(&builtin::sad_tear(), size))
    }

    // -----------------------------------------------------------------------
    // Resolution and rendering
    // -----------------------------------------------------------------------

    fn request_for(session: &Session, lookup: &IconLookup) -> IconRequest {
        if lookup.prefix == KIT_PREFIX || lookup.prefix == KIT_DUOTONE_PREFIX {
            let upload = session.license.uploads().iter().find(|upload| {
                upload.name == lookup.name && ResolvedLicense::upload_prefix(upload) == lookup.prefix
            });
            if let Some(upload) = upload {
                return IconRequest::Upload(upload.clone());
            }
        }
        IconRequest::Lookup(lookup.clone())
    }

    /// Resolve a displayed icon, using the upload's own geometry for kit uploads.
    pub async fn resolve(&self, lookup: &IconLookup) -> Result<IconDefinition> {
        let session = self.session()?;
        let request = Self::request_for(&session, lookup);
        session.resolver.resolve(&request).await
    }

    pub fn resolution_state(&self, lookup: &IconLookup) -> ResolutionState {
        self.session
            .get()
            .map(|s| s.resolver.state(lookup))
            .unwrap_or_default()
    }

    pub fn render(&self, lookup: &IconLookup, size: IconSize) -> RenderOutput {
        let Some(session) = self.session.get() else {
            return RenderOutput::Empty;
        };
        render::project(lookup, &session.resolver.state(lookup), session.technology, size)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Finish a selection: emits exactly one "selection finished" event.
    pub fn select(&self, lookup: &IconLookup) -> Result<IconChooserResult> {
        let session = self.session()?;
        let definition = match session.resolver.state(lookup) {
            ResolutionState::Resolved(definition) => Some(definition),
            _ => self.collaborators.library.find_icon_definition(lookup),
        };
        let result =
            render::selection_result(lookup, definition.as_ref(), &session.license.embed_prefixes);

        if !self.is_mounted() {
            debug!(%lookup, "selection after unmount, not emitting");
            return Ok(result);
        }

        info!(%lookup, embedded = result.icon.is_some(), "icon selected");
        let _ = self.events.send(result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::IconLibrary;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct StaticQuery(Result<Value>);

    #[async_trait]
    impl QueryHandler for StaticQuery {
        async fn query(&self, _document: &str, _variables: Option<Value>) -> Result<Value> {
            self.0.clone()
        }
    }

    struct NoFetch;

    #[async_trait]
    impl UrlTextFetcher for NoFetch {
        async fn get_url_text(&self, url: &str) -> Result<String> {
            Err(ChooserError::transport(url, "offline"))
        }
    }

    #[derive(Default)]
    struct ScriptFetch {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UrlTextFetcher for ScriptFetch {
        async fn get_url_text(&self, url: &str) -> Result<String> {
            lock(&self.urls).push(url.to_string());
            Ok("/* library */".into())
        }
    }

    fn chooser(config: ChooserConfig, response: Result<Value>) -> IconChooser {
        IconChooser::new(
            config,
            Collaborators {
                query: Arc::new(StaticQuery(response)),
                fetcher: Arc::new(NoFetch),
                library: Arc::new(IconLibrary::new()),
            },
        )
    }

    fn cdn_config(url: &str) -> ChooserConfig {
        ChooserConfig {
            version: Some("6.4.0".into()),
            cdn_url: Some(url.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn invalid_config_is_fatal() {
        let chooser = chooser(ChooserConfig::default(), Ok(json!({})));
        assert_eq!(chooser.state(), ChooserState::Loading);

        let err = chooser.activate().await.unwrap_err();
        assert!(matches!(err, ChooserError::Configuration(_)));
        assert!(matches!(chooser.state(), ChooserState::Fatal(_)));

        assert!(matches!(chooser.search("x").await, Err(ChooserError::Fatal(_))));
        assert!(matches!(chooser.activate().await, Err(ChooserError::Fatal(_))));
    }

    #[tokio::test]
    async fn kit_query_failure_is_fatal() {
        let config = ChooserConfig {
            kit_token: Some("t".into()),
            ..Default::default()
        };
        let chooser = chooser(config, Err(ChooserError::transport("kit", "offline")));
        assert!(chooser.activate().await.is_err());
        assert!(matches!(
            chooser.state(),
            ChooserState::Fatal(ChooserError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn cdn_activation_shows_defaults() {
        let chooser = chooser(cdn_config("https://use.example.com/all.css"), Ok(json!({})));
        chooser.activate().await.unwrap();

        assert_eq!(chooser.state(), ChooserState::Ready);
        assert_eq!(chooser.technology(), Some(Technology::CdnWebfont));
        assert!(chooser.visible_icons().contains(&IconLookup::new("fas", "user")));
        assert!(chooser.visible_icons().iter().all(|icon| icon.prefix == "fas"));
    }

    #[tokio::test]
    async fn kit_selection_overrides_cdn_technology() {
        let config = ChooserConfig {
            kit_token: Some("t".into()),
            cdn_url: Some("https://use.example.com/all.js".into()),
            ..Default::default()
        };
        let response = json!({"data": {"me": {"kit": {
            "version": "6.4.0", "technologySelected": "webfonts", "licenseSelected": "free"
        }}}});
        let chooser = chooser(config, Ok(response));
        chooser.activate().await.unwrap();
        assert_eq!(chooser.technology(), Some(Technology::KitWebfont));
    }

    #[tokio::test]
    async fn webfont_render_is_glyph_class() {
        let chooser = chooser(cdn_config("https://use.example.com/all.css"), Ok(json!({})));
        chooser.activate().await.unwrap();
        assert_eq!(
            chooser.render(&IconLookup::new("far", "bell"), IconSize::Multiple(2)),
            RenderOutput::Glyph {
                class: "far fa-bell fa-2x".into()
            }
        );
    }

    #[tokio::test]
    async fn filter_changes_visible_icons() {
        let chooser = chooser(cdn_config("https://use.example.com/all.js"), Ok(json!({})));
        chooser.activate().await.unwrap();

        chooser.select_family("sharp");
        assert_eq!(
            chooser.selected_family_style(),
            ("classic".to_string(), "solid".to_string())
        );

        chooser.select_style("regular");
        assert!(chooser.visible_icons().iter().all(|icon| icon.prefix == "far"));

        chooser.reset_filter();
        assert_eq!(chooser.selected_family_style().1, "solid");
    }

    #[tokio::test]
    async fn selection_emits_once() {
        let chooser = chooser(cdn_config("https://use.example.com/all.js"), Ok(json!({})));
        let mut rx = chooser.subscribe();
        chooser.activate().await.unwrap();
        assert!(rx.try_recv().is_none());

        let result = chooser.select(&IconLookup::new("fas", "user")).unwrap();
        assert_eq!(result.icon, None);
        assert_eq!(rx.recv().await, Some(result));
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn unmounted_chooser_does_not_emit() {
        let chooser = chooser(cdn_config("https://use.example.com/all.js"), Ok(json!({})));
        let mut rx = chooser.subscribe();
        chooser.activate().await.unwrap();
        chooser.unmount();

        chooser.select(&IconLookup::new("fas", "user")).unwrap();
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn empty_results_show_sad_tear() {
        let chooser = chooser(cdn_config("https://use.example.com/all.js"), Ok(json!({})));
        assert_eq!(chooser.no_results(IconSize::Normal), None);

        chooser.activate().await.unwrap();
        assert_eq!(chooser.no_results(IconSize::Normal), None);

        chooser.search("zzz").await.unwrap();
        assert!(chooser.visible_icons().is_empty());
        let markup = chooser.no_results(IconSize::Lg).unwrap();
        assert!(markup.contains("fa-sad-tear"));
        assert!(markup.contains(r#"viewBox="0 0 496 512""#));
    }

    #[tokio::test]
    async fn svg_delivery_fetches_library_script() {
        let fetcher = Arc::new(ScriptFetch::default());
        let chooser = IconChooser::new(
            cdn_config("https://use.example.com/all.js"),
            Collaborators {
                query: Arc::new(StaticQuery(Ok(json!({})))),
                fetcher: fetcher.clone(),
                library: Arc::new(IconLibrary::new()),
            },
        );
        assert!(chooser.library_script().await.is_err());

        chooser.activate().await.unwrap();
        assert_eq!(chooser.library_script().await.unwrap(), "/* library */");
        assert_eq!(
            lock(&fetcher.urls).as_slice(),
            ["https://use.fontawesome.com/releases/v6.4.0/js/all.js"]
        );
    }

    #[tokio::test]
    async fn webfont_delivery_has_no_library_script() {
        let chooser = chooser(cdn_config("https://use.example.com/all.css"), Ok(json!({})));
        chooser.activate().await.unwrap();
        assert!(matches!(
            chooser.library_script().await,
            Err(ChooserError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn unmount_before_activation_completes_keeps_loading() {
        let chooser = chooser(cdn_config("https://use.example.com/all.js"), Ok(json!({})));
        chooser.unmount();
        chooser.activate().await.unwrap();
        assert_eq!(chooser.state(), ChooserState::Loading);
    }
}
