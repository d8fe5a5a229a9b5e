//! Error taxonomy for the icon chooser core
//!
//! Errors are `Clone` so that a single in-flight resolution result can be
//! handed to every caller waiting on it.

use thiserror::Error;

/// Errors raised by the chooser core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChooserError {
    /// Required inputs absent or mutually exclusive constraints unmet.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The query or fetch collaborator rejected or returned non-success.
    #[error("transport error for {context}: {message}")]
    Transport { context: String, message: String },

    /// A structurally unexpected success response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// An SVG/JSON geometry payload could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// No source can provide the icon under the current license context.
    #[error("icon {prefix} {name} is unavailable")]
    Unavailable { prefix: String, name: String },

    /// A fetch did not complete within the configured bound.
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// The widget is in its terminal fatal-error state.
    #[error("icon chooser is in a fatal state: {0}")]
    Fatal(String),
}

impl ChooserError {
    pub fn transport(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Errors scoped to a single icon leave the rest of the chooser usable.
    pub fn is_per_icon(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::Unavailable { .. } | Self::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ChooserError>;
