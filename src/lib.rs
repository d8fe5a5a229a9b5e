//! Icon chooser core: resolves, filters and renders icons for an embeddable
//! icon-browsing widget.
//!
//! Network transport and the vector icon library are injected by the host
//! (see [`query`] and [`library`]); everything else lives here.

pub mod builtin;
pub mod chooser;
pub mod config;
pub mod error;
pub mod family;
pub mod filter;
pub mod icon;
pub mod library;
pub mod license;
pub mod parser;
pub mod query;
pub mod render;
pub mod resolver;
pub mod search;
pub mod technology;

pub use chooser::{ChooserState, Collaborators, IconChooser, SelectionRx};
pub use config::ChooserConfig;
pub use error::{ChooserError, Result};
pub use icon::{IconDefinition, IconGeometry, IconLookup, IconUpload, PathData};
pub use library::{IconLibrary, IconStore};
pub use query::{QueryHandler, UrlTextFetcher};
pub use render::{IconChooserResult, IconSize, RenderOutput};
pub use technology::Technology;
