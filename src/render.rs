//! Render projection
//!
//! Turns resolution state into final output: SVG markup for vector delivery,
//! glyph classes for webfont delivery. Also builds the selection result.

use crate::builtin;
use crate::error::{ChooserError, Result};
use crate::icon::{IconDefinition, IconLookup, PathData};
use crate::resolver::ResolutionState;
use crate::technology::Technology;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Size modifier (`xs`, `sm`, `lg`, `1x` through `10x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconSize {
    Xs,
    Sm,
    #[default]
    Normal,
    Lg,
    Multiple(u8),
}

impl IconSize {
    /// CSS class for the size, if any.
    pub fn class(self) -> Option<String> {
        match self {
            Self::Xs => Some("fa-xs".into()),
            Self::Sm => Some("fa-sm".into()),
            Self::Normal => None,
            Self::Lg => Some("fa-lg".into()),
            Self::Multiple(n) => Some(format!("fa-{n}x")),
        }
    }

    /// Scale factor in em.
    pub fn scale(self) -> f32 {
        match self {
            Self::Xs => 0.75,
            Self::Sm => 0.875,
            Self::Normal => 1.0,
            Self::Lg => 4.0 / 3.0,
            Self::Multiple(n) => f32::from(n),
        }
    }
}

impl FromStr for IconSize {
    type Err = ChooserError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "xs" => Ok(Self::Xs),
            "sm" => Ok(Self::Sm),
            "lg" => Ok(Self::Lg),
            "" | "1x" => Ok(Self::Normal),
            other => other
                .strip_suffix('x')
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (2..=10).contains(n))
                .map(Self::Multiple)
                .ok_or_else(|| ChooserError::Configuration(format!("unknown icon size: {other}"))),
        }
    }
}

impl fmt::Display for IconSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xs => f.write_str("xs"),
            Self::Sm => f.write_str("sm"),
            Self::Normal => f.write_str("1x"),
            Self::Lg => f.write_str("lg"),
            Self::Multiple(n) => write!(f, "{n}x"),
        }
    }
}

/// What a grid cell shows for one icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    Svg(String),
    Glyph { class: String },
    /// Resolution in progress; carries the spinner markup.
    Spinner(String),
    /// Resolution failed or has not started.
    Empty,
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

fn class_list(base: &[&str], size: IconSize) -> String {
    let mut classes: Vec<String> = base.iter().map(|c| c.to_string()).collect();
    classes.extend(size.class());
    classes.join(" ")
}

/// SVG markup for a definition. Duotone icons draw secondary first so that
/// it sits under primary; an empty half is omitted.
pub fn render_svg(definition: &IconDefinition, size: IconSize) -> String {
    render_svg_with(definition, size, &[])
}

fn render_svg_with(definition: &IconDefinition, size: IconSize, extra: &[&str]) -> String {
    let name_class = format!("fa-{}", definition.name);
    let mut base = vec!["svg-inline--fa", name_class.as_str()];
    base.extend_from_slice(extra);
    let geometry = &definition.geometry;

    let body = match &geometry.path {
        PathData::Single(d) => format!(r#"<path fill="currentColor" d="{}"></path>"#, escape_attr(d)),
        PathData::Duotone(secondary, primary) => {
            let mut group = String::from(r#"<g class="fa-duotone-group">"#);
            for (class, d) in [("fa-secondary", secondary), ("fa-primary", primary)] {
                if !d.is_empty() {
                    group.push_str(&format!(
                        r#"<path class="{class}" fill="currentColor" d="{}"></path>"#,
                        escape_attr(d)
                    ));
                }
            }
            group.push_str("</g>");
            group
        }
    };

    let scale = size.scale();
    let style = if size == IconSize::Normal {
        String::new()
    } else {
        format!(r#" style="font-size: {scale}em""#)
    };

    format!(
        r#"<svg class="{}" aria-hidden="true" role="img" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}"{style}>{body}</svg>"#,
        escape_attr(&class_list(&base, size)),
        geometry.width,
        geometry.height,
    )
}

/// Glyph class for webfont delivery, e.g. `fas fa-house fa-2x`.
pub fn glyph_class(lookup: &IconLookup, size: IconSize) -> String {
    let name_class = format!("fa-{}", lookup.name);
    class_list(&[lookup.prefix.as_str(), name_class.as_str()], size)
}

/// Project one icon's current state into output for `technology`.
pub fn project(
    lookup: &IconLookup,
    state: &ResolutionState,
    technology: Technology,
    size: IconSize,
) -> RenderOutput {
    if technology.is_webfont() {
        return RenderOutput::Glyph {
            class: glyph_class(lookup, size),
        };
    }
    match state {
        ResolutionState::Resolved(definition) => RenderOutput::Svg(render_svg(definition, size)),
        ResolutionState::Resolving => {
            RenderOutput::Spinner(render_svg_with(&builtin::spinner(), size, &["fa-spin"]))
        }
        ResolutionState::Unresolved | ResolutionState::Failed(_) => RenderOutput::Empty,
    }
}

/// Payload of the "selection finished" event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconChooserResult {
    #[serde(rename = "stylePrefix")]
    pub prefix: String,
    pub name: String,
    /// `[width, height, [], unicode, path]`, present only when embedding is
    /// permitted for the prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Value>,
}

impl IconChooserResult {
    pub fn lookup(&self) -> IconLookup {
        IconLookup::new(&self.prefix, &self.name)
    }
}

/// Build the selection result, embedding geometry only for permitted prefixes.
pub fn selection_result(
    lookup: &IconLookup,
    definition: Option<&IconDefinition>,
    embed_prefixes: &BTreeSet<String>,
) -> IconChooserResult {
    let icon = definition
        .filter(|_| embed_prefixes.contains(&lookup.prefix))
        .map(|definition| definition.geometry.to_icon_array());
    IconChooserResult {
        prefix: lookup.prefix.clone(),
        name: lookup.name.clone(),
        icon,
    }
}
