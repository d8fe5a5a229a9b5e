//! Icon value types: lookups, uploads and resolved definitions

use crate::error::{ChooserError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// A reference to an icon by style-prefix code and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IconLookup {
    #[serde(rename = "stylePrefix")]
    pub prefix: String,
    pub name: String,
}

impl IconLookup {
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for IconLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fa-{}", self.prefix, self.name)
    }
}

/// Path data of an icon: a single path, or a duotone pair.
///
/// Duotone pairs are stored in draw order: secondary first, primary second.
/// Either half may be empty when the source only carried one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathData {
    Single(String),
    Duotone(String, String),
}

impl PathData {
    pub fn duotone(secondary: impl Into<String>, primary: impl Into<String>) -> Self {
        Self::Duotone(secondary.into(), primary.into())
    }

    pub fn is_duotone(&self) -> bool {
        matches!(self, Self::Duotone(..))
    }
}

/// Width, height and path data describing an icon's vector shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconGeometry {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unicode: Option<String>,
    pub path: PathData,
}

impl IconGeometry {
    pub fn new(width: u32, height: u32, path: PathData) -> Self {
        Self {
            width,
            height,
            unicode: None,
            path,
        }
    }

    /// The `[width, height, ligatures, unicode, path]` array form used by
    /// vector icon libraries.
    pub fn to_icon_array(&self) -> Value {
        json!([self.width, self.height, [], self.unicode, self.path])
    }
}

/// The fully resolved, renderable form of an icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconDefinition {
    #[serde(rename = "stylePrefix")]
    pub prefix: String,
    pub name: String,
    pub geometry: IconGeometry,
}

impl IconDefinition {
    pub fn new(prefix: impl Into<String>, name: impl Into<String>, geometry: IconGeometry) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
            geometry,
        }
    }

    pub fn lookup(&self) -> IconLookup {
        IconLookup::new(&self.prefix, &self.name)
    }
}

/// A user/kit-specific custom icon, as delivered by kit metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconUpload {
    pub name: String,
    #[serde(default)]
    pub unicode: Option<u32>,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(deserialize_with = "deserialize_dimension")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_dimension")]
    pub height: u32,
    /// Legacy single path field.
    #[serde(default)]
    pub path: Option<String>,
    /// One or two path strings; two means a duotone upload.
    #[serde(default, deserialize_with = "null_as_default")]
    pub path_data: Vec<String>,
}

impl IconUpload {
    pub fn paths(&self) -> Vec<&str> {
        if !self.path_data.is_empty() {
            return self.path_data.iter().map(String::as_str).collect();
        }
        self.path.as_deref().into_iter().collect()
    }

    pub fn is_duotone(&self) -> bool {
        self.paths().len() > 1
    }

    /// Geometry synthesized from the upload's stored path data.
    pub fn geometry(&self) -> Result<IconGeometry> {
        let path = match self.paths().as_slice() {
            [single] => PathData::Single((*single).to_string()),
            [secondary, primary, ..] => PathData::duotone(*secondary, *primary),
            [] => {
                return Err(ChooserError::Parse(format!(
                    "upload {} has no path data",
                    self.name
                )));
            }
        };

        Ok(IconGeometry {
            width: self.width,
            height: self.height,
            unicode: self.unicode.map(|u| format!("{u:x}")),
            path,
        })
    }
}

/// Query responses send `null` for absent list fields; read that as empty.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Upload dimensions arrive as either strings or numbers.
fn deserialize_dimension<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid dimension {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|e| D::Error::custom(format!("invalid dimension {s:?}: {e}"))),
        other => Err(D::Error::custom(format!("invalid dimension {other}"))),
    }
}
