//! Search result projection
//!
//! Maps raw search responses into [`IconLookup`] values, merges in matching
//! kit uploads, and sequences overlapping searches so that a stale response
//! never overwrites a newer one.

use crate::error::Result;
use crate::family::{BRANDS, FamilyStyle, KIT, KIT_DUOTONE};
use crate::icon::{IconLookup, null_as_default};
use crate::license::ResolvedLicense;
use crate::query::{QueryHandler, QueryOutcome, SEARCH_QUERY};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Curated listing shown before the user has typed anything.
pub const DEFAULT_ICON_NAMES: &[&str] = &[
    "user",
    "house",
    "star",
    "heart",
    "bell",
    "calendar",
    "envelope",
    "magnifying-glass",
    "briefcase",
    "paw",
    "plane",
    "gamepad",
];

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LicensedFamilyStyles {
    #[serde(default, deserialize_with = "null_as_default")]
    pub free: Vec<FamilyStyle>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pro: Vec<FamilyStyle>,
}

/// One result of the search query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub family_styles_by_license: LicensedFamilyStyles,
}

pub struct SearchResultProjector {
    query: Arc<dyn QueryHandler>,
    page_size: u32,
}

impl SearchResultProjector {
    pub fn new(query: Arc<dyn QueryHandler>, page_size: u32) -> Self {
        Self { query, page_size }
    }

    /// Run one search.
    ///
    /// An empty query returns the default listing without touching the query
    /// collaborator. A malformed response yields an empty server result (with
    /// a warning); a transport failure is returned as an error.
    pub async fn search(&self, query: &str, license: &ResolvedLicense) -> Result<Vec<IconLookup>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(default_icons(license));
        }

        let version = license.context.version_string();
        let response = self
            .query
            .query(
                SEARCH_QUERY,
                Some(json!({
                    "version": version,
                    "query": query,
                    "first": self.page_size,
                })),
            )
            .await;

        let raw = QueryOutcome::<Vec<Value>>::classify(response, "/data/search", "search")
            .or_recover(Vec::new)?;
        let hits = decode_hits(raw);
        debug!(%query, hits = hits.len(), "search results");

        let mut icons = project(&hits, license);
        icons.extend(matching_uploads(query, license));
        Ok(icons)
    }
}

/// Decode each hit on its own so one malformed entry does not sink the page.
fn decode_hits(raw: Vec<Value>) -> Vec<SearchHit> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<SearchHit>(value) {
            Ok(hit) => Some(hit),
            Err(err) => {
                warn!(%err, "skipping malformed search hit");
                None
            }
        })
        .collect()
}

/// Map search hits to lookups, one per licensed family/style.
pub fn project(hits: &[SearchHit], license: &ResolvedLicense) -> Vec<IconLookup> {
    let mut seen = HashSet::new();
    let mut icons = Vec::new();

    for hit in hits {
        let licensed = &hit.family_styles_by_license;
        let family_styles = if license.context.is_pro {
            &licensed.pro
        } else {
            &licensed.free
        };

        for family_style in family_styles {
            let Some(prefix) = license
                .available
                .prefix_for(&family_style.family, &family_style.style)
            else {
                debug!(
                    id = %hit.id,
                    family = %family_style.family,
                    style = %family_style.style,
                    "skipping unavailable family/style"
                );
                continue;
            };

            let lookup = IconLookup::new(prefix, &hit.id);
            if seen.insert(lookup.clone()) {
                icons.push(lookup);
            }
        }
    }

    icons
}

/// Kit uploads whose name contains the query (case-insensitive).
pub fn matching_uploads(query: &str, license: &ResolvedLicense) -> Vec<IconLookup> {
    let needle = query.trim().to_lowercase();
    license
        .uploads()
        .iter()
        .filter(|upload| upload.name.to_lowercase().contains(&needle))
        .map(|upload| IconLookup::new(ResolvedLicense::upload_prefix(upload), &upload.name))
        .collect()
}

/// The fixed start listing: every curated name in every available
/// non-brand family/style, followed by all uploads.
pub fn default_icons(license: &ResolvedLicense) -> Vec<IconLookup> {
    let prefixes: Vec<&str> = license
        .available
        .entries()
        .filter(|(fs, _)| ![BRANDS, KIT, KIT_DUOTONE].contains(&fs.family.as_str()))
        .map(|(_, prefix)| prefix)
        .collect();

    let mut icons: Vec<IconLookup> = DEFAULT_ICON_NAMES
        .iter()
        .flat_map(|name| prefixes.iter().map(move |prefix| IconLookup::new(*prefix, *name)))
        .collect();
    icons.extend(matching_uploads("", license));
    icons
}

/// A ticket identifying one issued search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(u64);

/// Monotonic sequencing for overlapping searches.
#[derive(Debug, Default)]
pub struct SearchSequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> SearchTicket {
        SearchTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Claim the display for `ticket`. Returns false when a newer search has
    /// already been applied, in which case the response must be discarded.
    pub fn try_apply(&self, ticket: SearchTicket) -> bool {
        self.applied.fetch_max(ticket.0, Ordering::SeqCst) < ticket.0
    }
}

/// Trailing-edge debouncer: only the last call within `delay` proceeds.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// Wait out the delay. Returns true if no newer call arrived meanwhile.
    pub async fn settle(&self) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == generation
    }
}
