//! Route patterns
//!
//! A pattern is either an exact path (`"home"`) or a prefix followed by one
//! dynamic segment (`"messages/:chatId"`). The dynamic segment captures the
//! whole remainder of the path, slashes included.

use crate::RouterError;
use std::fmt;

/// A single route pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutePattern {
    /// Matches exactly this path
    Exact(String),
    /// Matches `prefix/<rest>` with a non-empty `rest`, captured as `param`
    Dynamic {
        /// Static part before the dynamic segment
        prefix: String,
        /// Name of the captured parameter
        param: String,
    },
}

impl RoutePattern {
    /// Parse pattern syntax.
    ///
    /// At most one `:name` segment is allowed and it must be the last one.
    pub fn parse(pattern: &str) -> Result<Self, RouterError> {
        let invalid = |reason: &str| RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }

        let segments: Vec<&str> = pattern.split('/').collect();
        let dynamic_positions: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.starts_with(':'))
            .map(|(i, _)| i)
            .collect();

        match dynamic_positions.as_slice() {
            [] => Ok(Self::Exact(pattern.to_string())),
            [pos] if *pos + 1 != segments.len() => {
                Err(invalid("dynamic segment must be the last segment"))
            }
            [0] => Err(invalid("dynamic segment needs a static prefix")),
            [pos] => {
                let param = &segments[*pos][1..];
                if param.is_empty() {
                    return Err(invalid("dynamic segment has no name"));
                }
                Ok(Self::Dynamic {
                    prefix: segments[..*pos].join("/"),
                    param: param.to_string(),
                })
            }
            _ => Err(invalid("only one dynamic segment is supported")),
        }
    }

    /// Whether this pattern captures a parameter
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }

    /// Match a dynamic pattern against a path, returning `(param, value)`.
    pub(crate) fn capture<'p>(&self, path: &'p str) -> Option<(&str, &'p str)> {
        match self {
            Self::Exact(_) => None,
            Self::Dynamic { prefix, param } => path
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .filter(|rest| !rest.is_empty())
                .map(|rest| (param.as_str(), rest)),
        }
    }

    /// Match an exact pattern against a path
    pub(crate) fn matches_exact(&self, path: &str) -> bool {
        matches!(self, Self::Exact(exact) if exact == path)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => write!(f, "{path}"),
            Self::Dynamic { prefix, param } => write!(f, "{prefix}/:{param}"),
        }
    }
}
