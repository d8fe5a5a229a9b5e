//! Shared in-memory vector icon library
//!
//! One library instance is shared by every resolver (and may outlive any
//! single chooser). Definitions are keyed by (prefix, name) and written once
//! per key; a second write of the same key replaces it with identical content.

use crate::icon::{IconDefinition, IconLookup};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Lookup-by-(prefix, name) and add-definition capability of a vector icon
/// library.
///
/// Hosts that already have a page-wide library implement this; everyone else
/// uses [`IconLibrary`].
pub trait IconStore: Send + Sync {
    fn find_icon_definition(&self, lookup: &IconLookup) -> Option<IconDefinition>;

    fn add_icon_definition(&self, definition: IconDefinition);
}

/// Default shared library. Cloning shares the same underlying registry.
#[derive(Debug, Clone, Default)]
pub struct IconLibrary {
    icons: Arc<RwLock<HashMap<IconLookup, Arc<IconDefinition>>>>,
}

impl IconLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library pre-seeded with the given definitions.
    pub fn with_definitions(definitions: impl IntoIterator<Item = IconDefinition>) -> Self {
        let library = Self::new();
        for definition in definitions {
            library.add_icon_definition(definition);
        }
        library
    }

    pub fn len(&self) -> usize {
        self.icons
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IconStore for IconLibrary {
    fn find_icon_definition(&self, lookup: &IconLookup) -> Option<IconDefinition> {
        self.icons
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(lookup)
            .map(|definition| definition.as_ref().clone())
    }

    fn add_icon_definition(&self, definition: IconDefinition) {
        let key = definition.lookup();
        trace!(prefix = %key.prefix, name = %key.name, "library add");
        self.icons
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(definition));
    }
}
