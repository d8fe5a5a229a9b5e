//! Icon payload parsers
//!
//! Turns a fetched SVG document, or a JSON icon payload, into [`IconGeometry`].
//! Both parsers are pure; malformed input is always an explicit
//! [`ChooserError::Parse`], never an empty sentinel.

use crate::error::{ChooserError, Result};
use crate::icon::{IconGeometry, PathData};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static VIEW_BOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"viewBox\s*=\s*"([^"]*)""#).expect("valid viewBox regex"));
static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<path\b([^>]*)>").expect("valid path regex"));
static D_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)d\s*=\s*"([^"]*)""#).expect("valid d regex"));
static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:^|\s)class\s*=\s*"([^"]*)""#).expect("valid class regex"));

const PRIMARY_CLASS: &str = "fa-primary";
const SECONDARY_CLASS: &str = "fa-secondary";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Primary,
    Secondary,
}

#[derive(Debug)]
struct SvgPath<'a> {
    d: &'a str,
    role: Option<Role>,
}

fn parse_view_box(svg: &str) -> Result<(u32, u32)> {
    let raw = VIEW_BOX_RE
        .captures(svg)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ChooserError::Parse("svg has no viewBox".into()))?;

    let parts: Vec<&str> = raw.split_whitespace().collect();
    let [_, _, width, height] = parts.as_slice() else {
        return Err(ChooserError::Parse(format!("invalid viewBox {raw:?}")));
    };

    let parse = |value: &str| {
        value
            .parse::<u32>()
            .map_err(|_| ChooserError::Parse(format!("non-integer viewBox component {value:?}")))
    };
    Ok((parse(width)?, parse(height)?))
}

fn collect_paths(svg: &str) -> Vec<SvgPath<'_>> {
    PATH_RE
        .captures_iter(svg)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let d = D_ATTR_RE.captures(attrs)?.get(1)?.as_str();
            let role = CLASS_ATTR_RE
                .captures(attrs)
                .and_then(|c| c.get(1))
                .and_then(|class| {
                    class.as_str().split_whitespace().find_map(|token| match token {
                        PRIMARY_CLASS => Some(Role::Primary),
                        SECONDARY_CLASS => Some(Role::Secondary),
                        _ => None,
                    })
                });
            Some(SvgPath { d, role })
        })
        .collect()
}

/// Duotone roles from class names. Unclassed paths fill whichever role is
/// still missing, secondary first.
fn assign_roles<'a>(paths: &[SvgPath<'a>]) -> Result<(&'a str, &'a str)> {
    let classed = |role| paths.iter().find(|p| p.role == Some(role)).map(|p| p.d);
    let mut secondary = classed(Role::Secondary);
    let mut primary = classed(Role::Primary);

    for unclassed in paths.iter().filter(|p| p.role.is_none()) {
        if secondary.is_none() {
            secondary = Some(unclassed.d);
        } else if primary.is_none() {
            primary = Some(unclassed.d);
        } else {
            return Err(ChooserError::Parse(
                "svg has an unclassed path beyond both duotone roles".into(),
            ));
        }
    }

    Ok((secondary.unwrap_or_default(), primary.unwrap_or_default()))
}

/// Parse raw SVG markup into icon geometry.
///
/// - one unclassed path: a single path
/// - two unclassed paths: duotone, document order gives (secondary, primary)
/// - any `fa-primary`/`fa-secondary` class: duotone with roles taken from the
///   class; unclassed paths fill a missing role, and a role still missing is
///   an empty string
///
/// Duotone pairs are always (secondary, primary), so a lone `fa-primary` path
/// comes out as `["", d]`.
pub fn parse_svg_text(svg: &str) -> Result<IconGeometry> {
    let (width, height) = parse_view_box(svg)?;
    let paths = collect_paths(svg);

    let path = if paths.iter().any(|p| p.role.is_some()) {
        let (secondary, primary) = assign_roles(&paths)?;
        PathData::duotone(secondary, primary)
    } else {
        match paths.as_slice() {
            [] => return Err(ChooserError::Parse("svg has no path data".into())),
            [single] => PathData::Single(single.d.to_string()),
            [secondary, primary] => PathData::duotone(secondary.d, primary.d),
            more => {
                return Err(ChooserError::Parse(format!(
                    "unsupported svg with {} unclassed paths",
                    more.len()
                )));
            }
        }
    };

    Ok(IconGeometry::new(width, height, path))
}

/// JSON icon payloads come either as an object or as the icon array form
/// `[width, height, ligatures, unicode, path]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IconJson {
    Object {
        width: u32,
        height: u32,
        #[serde(default)]
        unicode: Option<String>,
        #[serde(alias = "pathData")]
        path: JsonPath,
    },
    Array(u32, u32, serde_json::Value, Option<String>, JsonPath),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonPath {
    Single(String),
    Many(Vec<String>),
}

impl JsonPath {
    fn into_path_data(self) -> Result<PathData> {
        match self {
            Self::Single(path) => Ok(PathData::Single(path)),
            Self::Many(paths) => match <[String; 2]>::try_from(paths) {
                Ok([secondary, primary]) => Ok(PathData::Duotone(secondary, primary)),
                Err(paths) if paths.len() == 1 => {
                    Ok(PathData::Single(paths.into_iter().next().unwrap_or_default()))
                }
                Err(paths) => Err(ChooserError::Parse(format!(
                    "unsupported json icon with {} paths",
                    paths.len()
                ))),
            },
        }
    }
}

/// Parse a JSON icon payload into icon geometry.
pub fn parse_icon_json(text: &str) -> Result<IconGeometry> {
    let parsed: IconJson = serde_json::from_str(text)
        .map_err(|e| ChooserError::Parse(format!("invalid json icon payload: {e}")))?;

    let (width, height, unicode, path) = match parsed {
        IconJson::Object {
            width,
            height,
            unicode,
            path,
        } => (width, height, unicode, path),
        IconJson::Array(width, height, _, unicode, path) => (width, height, unicode, path),
    };

    Ok(IconGeometry {
        width,
        height,
        unicode,
        path: path.into_path_data()?,
    })
}
