//! Family/style table
//!
//! Two-level classification of icon variants (family → style) mapped to the
//! short style-prefix codes used to reference icons. Every prefix is unique
//! across the whole table so that reverse lookup is injective.

use crate::error::{ChooserError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const CLASSIC: &str = "classic";
pub const DUOTONE: &str = "duotone";
pub const SHARP: &str = "sharp";
pub const BRANDS: &str = "brands";
pub const KIT: &str = "kit";
pub const KIT_DUOTONE: &str = "kit-duotone";

pub const SOLID: &str = "solid";
pub const REGULAR: &str = "regular";
pub const LIGHT: &str = "light";
pub const THIN: &str = "thin";
pub const CUSTOM: &str = "custom";

/// Private prefixes given to kit uploads.
pub const KIT_PREFIX: &str = "fak";
pub const KIT_DUOTONE_PREFIX: &str = "fakd";

const DEFAULT_ENTRIES: &[(&str, &str, &str)] = &[
    (CLASSIC, SOLID, "fas"),
    (CLASSIC, REGULAR, "far"),
    (CLASSIC, LIGHT, "fal"),
    (CLASSIC, THIN, "fat"),
    (DUOTONE, SOLID, "fad"),
    (SHARP, SOLID, "fass"),
    (SHARP, REGULAR, "fasr"),
    (SHARP, LIGHT, "fasl"),
    (BRANDS, BRANDS, "fab"),
];

/// A (family, style) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyStyle {
    pub family: String,
    pub style: String,
}

impl FamilyStyle {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }

    /// Path segment used when fetching individual icon payloads.
    ///
    /// classic/solid → `solid`, duotone/solid → `duotone`,
    /// sharp/regular → `sharp-regular`.
    pub fn fetch_path_segment(&self) -> String {
        match (self.family.as_str(), self.style.as_str()) {
            (CLASSIC, style) => style.to_string(),
            (DUOTONE, SOLID) => DUOTONE.to_string(),
            (BRANDS, _) => BRANDS.to_string(),
            (family, style) => format!("{family}-{style}"),
        }
    }
}

/// Mapping family → style → prefix, with an injective reverse index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyStyleTable {
    families: BTreeMap<String, BTreeMap<String, String>>,
    by_prefix: HashMap<String, FamilyStyle>,
}

impl FamilyStyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The static default table.
    pub fn defaults() -> Self {
        let mut table = Self::new();
        for (family, style, prefix) in DEFAULT_ENTRIES {
            table
                .families
                .entry((*family).to_string())
                .or_default()
                .insert((*style).to_string(), (*prefix).to_string());
            table
                .by_prefix
                .insert((*prefix).to_string(), FamilyStyle::new(*family, *style));
        }
        table
    }

    /// Add a family/style entry.
    ///
    /// Re-inserting an identical entry is a no-op. A prefix already bound to a
    /// different family/style, or a family/style already bound to a different
    /// prefix, is rejected.
    pub fn insert(&mut self, family: &str, style: &str, prefix: &str) -> Result<()> {
        if let Some(existing) = self.by_prefix.get(prefix) {
            if existing.family == family && existing.style == style {
                return Ok(());
            }
            return Err(ChooserError::Configuration(format!(
                "prefix {prefix} already maps to {}/{}",
                existing.family, existing.style
            )));
        }
        if let Some(existing) = self.prefix_for(family, style) {
            return Err(ChooserError::Configuration(format!(
                "{family}/{style} already maps to prefix {existing}"
            )));
        }

        self.families
            .entry(family.to_string())
            .or_default()
            .insert(style.to_string(), prefix.to_string());
        self.by_prefix
            .insert(prefix.to_string(), FamilyStyle::new(family, style));
        Ok(())
    }

    pub fn prefix_for(&self, family: &str, style: &str) -> Option<&str> {
        self.families
            .get(family)
            .and_then(|styles| styles.get(style))
            .map(String::as_str)
    }

    pub fn family_style_for(&self, prefix: &str) -> Option<&FamilyStyle> {
        self.by_prefix.get(prefix)
    }

    pub fn contains_family(&self, family: &str) -> bool {
        self.families.contains_key(family)
    }

    pub fn contains(&self, family: &str, style: &str) -> bool {
        self.prefix_for(family, style).is_some()
    }

    /// Family names in sorted order.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    /// Style names of a family in sorted order.
    pub fn styles(&self, family: &str) -> Vec<&str> {
        self.families
            .get(family)
            .map(|styles| styles.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn first_style(&self, family: &str) -> Option<&str> {
        self.families
            .get(family)
            .and_then(|styles| styles.keys().next())
            .map(String::as_str)
    }

    /// All entries as (family/style, prefix), sorted by family then style.
    pub fn entries(&self) -> impl Iterator<Item = (FamilyStyle, &str)> {
        self.families.iter().flat_map(|(family, styles)| {
            styles
                .iter()
                .map(move |(style, prefix)| (FamilyStyle::new(family, style), prefix.as_str()))
        })
    }

    /// A copy of the table keeping only the entries accepted by `keep`.
    pub fn filtered(&self, mut keep: impl FnMut(&FamilyStyle) -> bool) -> Self {
        let mut table = Self::new();
        for (family_style, prefix) in self.entries() {
            if keep(&family_style) {
                table
                    .families
                    .entry(family_style.family.clone())
                    .or_default()
                    .insert(family_style.style.clone(), prefix.to_string());
                table.by_prefix.insert(prefix.to_string(), family_style);
            }
        }
        table
    }

    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }
}
