//! Version and license resolution
//!
//! Establishes, once per chooser activation, the effective product version,
//! the license tier, the family/style table (extended by kit metadata) and
//! which family/styles are actually available under that version and tier.

use crate::error::{ChooserError, Result};
use crate::family::{
    BRANDS, CLASSIC, CUSTOM, DUOTONE, FamilyStyle, FamilyStyleTable, KIT, KIT_DUOTONE,
    KIT_DUOTONE_PREFIX, KIT_PREFIX, LIGHT, REGULAR, SHARP, SOLID, THIN,
};
use crate::icon::{IconUpload, null_as_default};
use crate::query::{KIT_METADATA_QUERY, QueryHandler, QueryOutcome};
use semver::Version;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefixes whose geometry may be embedded when no kit grants anything more.
pub const FREE_EMBED_PREFIXES: &[&str] = &["fas", "far", "fab"];

/// Resolve version aliases (`5.x`, `latest`, `6.x`) to concrete versions.
pub fn resolve_version_alias(version: &str) -> &str {
    match version {
        "5.x" | "latest" => "5.15.3",
        "6.x" => "6.0.0-beta1",
        other => other,
    }
}

pub fn is_valid_semver(version: &str) -> bool {
    Version::parse(version).is_ok()
}

/// Resolved version and license tier. Immutable after activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseContext {
    pub version: Version,
    pub is_pro: bool,
    pub kit_token: Option<String>,
}

impl LicenseContext {
    /// Context from an explicit version (aliases allowed) and pro flag.
    pub fn new(version: &str, is_pro: bool, kit_token: Option<String>) -> Result<Self> {
        let resolved = resolve_version_alias(version.trim());
        let version = Version::parse(resolved).map_err(|e| {
            ChooserError::Configuration(format!("invalid version {version:?}: {e}"))
        })?;
        Ok(Self {
            version,
            is_pro,
            kit_token,
        })
    }

    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    fn at_least(&self, major: u64, minor: u64, patch: u64) -> bool {
        self.version >= Version::new(major, minor, patch)
    }

    /// Whether a family/style may be offered under this version and tier.
    ///
    /// Families not known here (declared by a kit release) are pro-only.
    pub fn is_available(&self, family_style: &FamilyStyle) -> bool {
        match (family_style.family.as_str(), family_style.style.as_str()) {
            (CLASSIC, SOLID | REGULAR) | (BRANDS, _) => true,
            (CLASSIC, LIGHT) => self.is_pro,
            (CLASSIC, THIN) => self.is_pro && self.version.major >= 6,
            (DUOTONE, SOLID) => self.is_pro && self.at_least(5, 10, 0),
            (SHARP, SOLID) => self.is_pro && self.at_least(6, 2, 0),
            (SHARP, REGULAR) => self.is_pro && self.at_least(6, 3, 0),
            (SHARP, LIGHT) => self.is_pro && self.at_least(6, 4, 0),
            (KIT | KIT_DUOTONE, _) => self.kit_token.is_some(),
            _ => self.is_pro,
        }
    }

    /// Whether icon payloads are delivered as JSON rather than SVG markup.
    pub fn uses_json_delivery(&self) -> bool {
        self.version.major >= 7
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermittedFamilyStyle {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitPermits {
    #[serde(default, deserialize_with = "null_as_default")]
    pub embed_pro_svg: Vec<PermittedFamilyStyle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseFamilyStyle {
    pub family: String,
    pub style: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitRelease {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub family_styles: Vec<ReleaseFamilyStyle>,
}

/// Kit metadata as returned by the kit metadata query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitMetadata {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub technology_selected: Option<String>,
    #[serde(default)]
    pub license_selected: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon_uploads: Option<Vec<IconUpload>>,
    #[serde(default)]
    pub permits: Option<KitPermits>,
    #[serde(default)]
    pub release: Option<KitRelease>,
}

impl KitMetadata {
    pub fn uploads(&self) -> &[IconUpload] {
        self.icon_uploads.as_deref().unwrap_or_default()
    }

    pub fn is_pro(&self) -> bool {
        self.license_selected.as_deref() == Some("pro")
    }
}

/// Inputs to license resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseRequest {
    pub version: Option<String>,
    pub pro: bool,
    pub kit_token: Option<String>,
}

/// Everything established by license resolution.
#[derive(Debug, Clone)]
pub struct ResolvedLicense {
    pub context: LicenseContext,
    /// Full table: defaults plus kit release and upload families.
    pub table: FamilyStyleTable,
    /// Subset of `table` available under `context`.
    pub available: FamilyStyleTable,
    /// Prefixes whose raw geometry may be embedded in a selection result.
    pub embed_prefixes: BTreeSet<String>,
    pub kit: Option<KitMetadata>,
}

impl ResolvedLicense {
    pub fn uploads(&self) -> &[IconUpload] {
        self.kit.as_ref().map(KitMetadata::uploads).unwrap_or_default()
    }

    /// Private prefix under which an upload is listed.
    pub fn upload_prefix(upload: &IconUpload) -> &'static str {
        if upload.is_duotone() {
            KIT_DUOTONE_PREFIX
        } else {
            KIT_PREFIX
        }
    }
}

/// Build the table for a context, extended by optional kit metadata.
pub fn build_family_style_table(kit: Option<&KitMetadata>) -> FamilyStyleTable {
    let mut table = FamilyStyleTable::defaults();
    let Some(kit) = kit else {
        return table;
    };

    for entry in kit.release.iter().flat_map(|r| r.family_styles.iter()) {
        if let Err(err) = table.insert(&entry.family, &entry.style, &entry.prefix) {
            warn!(family = %entry.family, style = %entry.style, %err, "skipping release family/style");
        }
    }

    let uploads = kit.uploads();
    if !uploads.is_empty() {
        let mut add = |family: &str, prefix: &str| {
            if let Err(err) = table.insert(family, CUSTOM, prefix) {
                warn!(%family, %err, "skipping upload family");
            }
        };
        add(KIT, KIT_PREFIX);
        if uploads.iter().any(IconUpload::is_duotone) {
            add(KIT_DUOTONE, KIT_DUOTONE_PREFIX);
        }
    }

    table
}

fn embed_prefixes(kit: Option<&KitMetadata>, table: &FamilyStyleTable) -> BTreeSet<String> {
    let Some(kit) = kit else {
        return FREE_EMBED_PREFIXES.iter().map(|p| p.to_string()).collect();
    };

    kit.permits
        .iter()
        .flat_map(|p| p.embed_pro_svg.iter())
        .filter_map(|permit| match (&permit.prefix, &permit.family, &permit.style) {
            (Some(prefix), _, _) => Some(prefix.clone()),
            (None, Some(family), Some(style)) => {
                table.prefix_for(family, style).map(str::to_string)
            }
            _ => None,
        })
        .collect()
}

/// Resolves [`ResolvedLicense`] from explicit props or kit metadata.
pub struct VersionAndLicenseResolver {
    query: Arc<dyn QueryHandler>,
}

impl VersionAndLicenseResolver {
    pub fn new(query: Arc<dyn QueryHandler>) -> Self {
        Self { query }
    }

    async fn load_kit_metadata(&self, token: &str) -> Result<KitMetadata> {
        let response = self
            .query
            .query(KIT_METADATA_QUERY, Some(json!({ "token": token })))
            .await;

        QueryOutcome::<KitMetadata>::classify(response, "/data/me/kit", "kit metadata")
            .into_result()
            .map_err(|err| match err {
                ChooserError::MalformedResponse(reason) => ChooserError::Configuration(format!(
                    "could not load kit metadata: {reason}"
                )),
                other => other,
            })
    }

    /// Resolve the license. Any error here is fatal for the chooser.
    pub async fn resolve(&self, request: &LicenseRequest) -> Result<ResolvedLicense> {
        let explicit_version = request
            .version
            .as_deref()
            .map(|v| resolve_version_alias(v.trim()))
            .filter(|v| is_valid_semver(v));

        let Some(token) = request.kit_token.as_deref() else {
            let Some(version) = explicit_version else {
                return Err(ChooserError::Configuration(
                    "since no kit token was specified, there must be a valid version".into(),
                ));
            };
            let context = LicenseContext::new(version, request.pro, None)?;
            return Ok(Self::finish(context, None));
        };

        let kit = self.load_kit_metadata(token).await?;
        let version = kit
            .version
            .as_deref()
            .or_else(|| kit.release.as_ref().and_then(|r| r.version.as_deref()))
            .or(request.version.as_deref())
            .ok_or_else(|| {
                ChooserError::Configuration("invalid state: there must be a resolved version".into())
            })?;

        let is_pro = kit.is_pro() || request.pro;
        let context = LicenseContext::new(version, is_pro, Some(token.to_string()))?;
        info!(
            version = %context.version,
            is_pro,
            kit = kit.name.as_deref().unwrap_or(""),
            "kit metadata resolved"
        );
        Ok(Self::finish(context, Some(kit)))
    }

    fn finish(context: LicenseContext, kit: Option<KitMetadata>) -> ResolvedLicense {
        let table = build_family_style_table(kit.as_ref());
        let available = table.filtered(|fs| context.is_available(fs));
        let embed_prefixes = embed_prefixes(kit.as_ref(), &table);
        debug!(
            version = %context.version,
            is_pro = context.is_pro,
            available = available.len(),
            "license resolved"
        );
        ResolvedLicense {
            context,
            table,
            available,
            embed_prefixes,
            kit,
        }
    }
}
