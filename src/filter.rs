//! Single family/style selector narrowing the displayed icons

use crate::family::{CLASSIC, FamilyStyleTable, SOLID};
use crate::icon::IconLookup;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleFilterState {
    family: String,
    style: String,
}

impl Default for StyleFilterState {
    fn default() -> Self {
        Self {
            family: CLASSIC.to_string(),
            style: SOLID.to_string(),
        }
    }
}

impl StyleFilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    /// Switch family. Unknown families are ignored; on change the style
    /// resets to the family's first style in sorted order.
    pub fn select_family(&mut self, table: &FamilyStyleTable, family: &str) {
        let Some(first) = table.first_style(family) else {
            debug!(%family, "ignoring unknown family");
            return;
        };
        if self.family != family {
            self.family = family.to_string();
            self.style = first.to_string();
        }
    }

    /// Switch style within the current family. Invalid styles are ignored.
    pub fn select_style(&mut self, table: &FamilyStyleTable, style: &str) {
        if table.contains(&self.family, style) {
            self.style = style.to_string();
        } else {
            debug!(family = %self.family, %style, "ignoring style outside selected family");
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn selected_prefix<'a>(&self, table: &'a FamilyStyleTable) -> Option<&'a str> {
        table.prefix_for(&self.family, &self.style)
    }

    /// Icons whose prefix matches the selection. Empty when the selection
    /// has no prefix in `table`.
    pub fn filter<'i>(
        &self,
        table: &FamilyStyleTable,
        icons: impl IntoIterator<Item = &'i IconLookup>,
    ) -> Vec<IconLookup> {
        let Some(prefix) = self.selected_prefix(table) else {
            return Vec::new();
        };
        icons
            .into_iter()
            .filter(|icon| icon.prefix == prefix)
            .cloned()
            .collect()
    }
}
