// URL paths as segment lists

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Absolute application path, stored as its non-empty segments
///
/// `/mixing/box-1` and `mixing/box-1/` are the same path. Query strings and
/// fragments are dropped. The empty path is the terminal page of the workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoutePath(Vec<String>);

impl RoutePath {
    /// The empty (terminal) path
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        Self::from_segments(path.split('/'))
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            segments
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether this is the empty path
    pub fn is_terminal(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any segment is still a `:name` placeholder
    pub fn has_placeholders(&self) -> bool {
        self.0.iter().any(|segment| segment.starts_with(':'))
    }

    /// Replace `:name` placeholders with the given parameters; unknown ones are kept
    pub fn fill(&self, params: &HashMap<String, String>) -> Self {
        Self(
            self.0
                .iter()
                .map(|segment| {
                    segment
                        .strip_prefix(':')
                        .and_then(|name| params.get(name))
                        .cloned()
                        .unwrap_or_else(|| segment.clone())
                })
                .collect(),
        )
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

impl FromStr for RoutePath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for RoutePath {
    fn from(url: &str) -> Self {
        Self::parse(url)
    }
}

impl From<String> for RoutePath {
    fn from(url: String) -> Self {
        Self::parse(&url)
    }
}

impl From<RoutePath> for String {
    fn from(path: RoutePath) -> Self {
        path.to_string()
    }
}
