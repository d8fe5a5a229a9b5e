//! Injected host collaborators and the query documents sent through them
//!
//! The core never performs network I/O itself. The host supplies a query
//! handler (structured metadata/search queries) and a URL text fetcher (script
//! bundles and individual icon payloads).

use crate::error::{ChooserError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Structured (GraphQL-like) query transport.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    async fn query(&self, document: &str, variables: Option<Value>) -> Result<Value>;
}

/// Raw URL text retrieval.
#[async_trait]
pub trait UrlTextFetcher: Send + Sync {
    async fn get_url_text(&self, url: &str) -> Result<String>;
}

pub const KIT_METADATA_QUERY: &str = r#"
query KitMetadata($token: String!) {
  me {
    kit(token: $token) {
      version
      technologySelected
      licenseSelected
      name
      iconUploads {
        name
        unicode
        version
        width
        height
        path
        pathData
      }
      permits {
        embedProSvg {
          family
          style
          prefix
        }
      }
      release {
        version
        familyStyles {
          family
          style
          prefix
        }
      }
    }
  }
}
"#;

pub const SEARCH_QUERY: &str = r#"
query Search($version: String!, $query: String!, $first: Int!) {
  search(version: $version, query: $query, first: $first) {
    id
    label
    familyStylesByLicense {
      free {
        family
        style
      }
      pro {
        family
        style
      }
    }
  }
}
"#;

/// Result of a query, classified by shape rather than probed ad hoc.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<T> {
    /// Success with the expected payload.
    Ok(T),
    /// Success, but the payload was missing or structurally unexpected.
    Malformed(String),
    /// The collaborator rejected, or the response carried query errors.
    Failed(ChooserError),
}

impl<T> QueryOutcome<T> {
    /// Classify a raw collaborator result, extracting and decoding the value
    /// at `pointer` (a JSON pointer such as `/data/search`).
    pub fn classify(response: Result<Value>, pointer: &str, context: &str) -> Self
    where
        T: DeserializeOwned,
    {
        let response = match response {
            Ok(response) => response,
            Err(err) => return Self::Failed(err),
        };

        if let Some(errors) = response.get("errors").filter(|e| !e.is_null()) {
            return Self::Failed(ChooserError::transport(
                context,
                format!("query errors: {errors}"),
            ));
        }

        let Some(payload) = response.pointer(pointer).filter(|v| !v.is_null()) else {
            return Self::Malformed(format!("{context}: response has no {pointer}"));
        };

        match serde_json::from_value::<T>(payload.clone()) {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Malformed(format!("{context}: unexpected {pointer} shape: {e}")),
        }
    }

    /// Recover a malformed response with `fallback`, logging a soft warning.
    /// Transport failures are still returned as errors.
    pub fn or_recover(self, fallback: impl FnOnce() -> T) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Malformed(reason) => {
                warn!(%reason, "malformed query response, substituting empty result");
                Ok(fallback())
            }
            Self::Failed(err) => Err(err),
        }
    }

    /// Treat a malformed response as an error.
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Malformed(reason) => Err(ChooserError::MalformedResponse(reason)),
            Self::Failed(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_ok() {
        let outcome: QueryOutcome<Vec<u32>> =
            QueryOutcome::classify(Ok(json!({"data": {"items": [1, 2]}})), "/data/items", "test");
        assert_eq!(outcome, QueryOutcome::Ok(vec![1, 2]));
    }

    #[test]
    fn classify_missing_is_malformed() {
        let outcome: QueryOutcome<Vec<u32>> =
            QueryOutcome::classify(Ok(json!({})), "/data/items", "test");
        assert!(matches!(outcome, QueryOutcome::Malformed(_)));
    }

    #[test]
    fn classify_null_is_malformed() {
        let outcome: QueryOutcome<Vec<u32>> =
            QueryOutcome::classify(Ok(json!({"data": {"items": null}})), "/data/items", "test");
        assert!(matches!(outcome, QueryOutcome::Malformed(_)));
    }

    #[test]
    fn classify_wrong_shape_is_malformed() {
        let outcome: QueryOutcome<Vec<u32>> =
            QueryOutcome::classify(Ok(json!({"data": {"items": "nope"}})), "/data/items", "test");
        assert!(matches!(outcome, QueryOutcome::Malformed(_)));
    }

    #[test]
    fn classify_query_errors_fail() {
        let outcome: QueryOutcome<Vec<u32>> = QueryOutcome::classify(
            Ok(json!({"errors": [{"message": "bad token"}]})),
            "/data/items",
            "kit",
        );
        assert!(matches!(
            outcome,
            QueryOutcome::Failed(ChooserError::Transport { .. })
        ));
    }

    #[test]
    fn classify_rejection_fails() {
        let outcome: QueryOutcome<Vec<u32>> = QueryOutcome::classify(
            Err(ChooserError::transport("search", "offline")),
            "/data/items",
            "search",
        );
        assert!(matches!(outcome, QueryOutcome::Failed(_)));
    }

    #[test]
    fn recover_substitutes_fallback_only_for_malformed() {
        let malformed: QueryOutcome<Vec<u32>> = QueryOutcome::Malformed("x".into());
        assert_eq!(malformed.or_recover(Vec::new).unwrap(), Vec::<u32>::new());

        let failed: QueryOutcome<Vec<u32>> =
            QueryOutcome::Failed(ChooserError::transport("search", "offline"));
        assert!(failed.or_recover(Vec::new).is_err());
    }
}
