//! Route pattern parsing and matching.
//!
//! A pattern is a `/`-separated template. Each segment is one of:
//!
//! - a literal (`users`), which must equal the path segment exactly
//! - a placeholder (`@id`), which consumes one path segment and binds it
//! - a trailing capture (`*path` or `*`), which consumes the rest of the path
//!
//! Empty segments are ignored on both sides, so `/users/`, `users` and
//! `//users` all denote the same pattern.

use std::fmt;
use std::str::FromStr;

use crate::params::Params;

/// One parsed segment of a [`RoutePattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly (case-sensitive).
    Literal(String),
    /// Binds exactly one path segment under the given name.
    Param(String),
    /// Binds the remaining path (possibly empty); unnamed captures bind nothing.
    Rest(Option<String>),
}

/// Errors raised while parsing a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// A placeholder was written as a bare `@`.
    EmptyParamName {
        /// The offending pattern.
        pattern: String,
    },
    /// The same placeholder name appears twice.
    DuplicateParam {
        /// The offending pattern.
        pattern: String,
        /// The repeated name.
        name: String,
    },
    /// A `*` capture is followed by more segments.
    RestNotLast {
        /// The offending pattern.
        pattern: String,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyParamName { pattern } => {
                write!(f, "empty placeholder name in route pattern '{pattern}'")
            }
            Self::DuplicateParam { pattern, name } => {
                write!(f, "placeholder '@{name}' bound twice in route pattern '{pattern}'")
            }
            Self::RestNotLast { pattern } => {
                write!(f, "'*' capture must be the last segment of route pattern '{pattern}'")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// A compiled route pattern.
///
/// # Example
///
/// ```rust
/// use electro_router::RoutePattern;
///
/// let pattern = RoutePattern::parse("/users/@id").unwrap();
///
/// let params = pattern.match_path("/users/42").unwrap();
/// assert_eq!(params.get("id"), Some("42"));
///
/// assert!(pattern.match_path("/users").is_none());
/// assert!(pattern.match_path("/users/42/edit").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    /// The pattern as it was written
    source: String,
    /// Parsed segments, empty ones removed
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] for a bare `@`, a repeated placeholder name or
    /// a `*` capture that is not the final segment.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let raw: Vec<&str> = path_segments(pattern).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut names: Vec<&str> = Vec::new();

        for (index, segment) in raw.iter().enumerate() {
            let parsed = if let Some(name) = segment.strip_prefix('@') {
                if name.is_empty() {
                    return Err(PatternError::EmptyParamName {
                        pattern: pattern.to_string(),
                    });
                }
                Self::claim(pattern, &mut names, name)?;
                Segment::Param(name.to_string())
            } else if let Some(name) = segment.strip_prefix('*') {
                if index + 1 != raw.len() {
                    return Err(PatternError::RestNotLast {
                        pattern: pattern.to_string(),
                    });
                }
                if name.is_empty() {
                    Segment::Rest(None)
                } else {
                    Self::claim(pattern, &mut names, name)?;
                    Segment::Rest(Some(name.to_string()))
                }
            } else {
                Segment::Literal((*segment).to_string())
            };
            segments.push(parsed);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    fn claim<'p>(pattern: &str, names: &mut Vec<&'p str>, name: &'p str) -> Result<(), PatternError> {
        if names.contains(&name) {
            return Err(PatternError::DuplicateParam {
                pattern: pattern.to_string(),
                name: name.to_string(),
            });
        }
        names.push(name);
        Ok(())
    }

    /// Matches a request path, returning the bound placeholders on success.
    ///
    /// Without a trailing capture the segment counts must be equal and every
    /// literal must match. Matching never allocates for literal-only patterns
    /// beyond the empty [`Params`].
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let mut remaining = path_segments(path);
        let mut params = Params::with_capacity(self.param_count());

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    if remaining.next()? != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.push(name.as_str(), remaining.next()?);
                }
                Segment::Rest(name) => {
                    if let Some(name) = name {
                        let rest: Vec<&str> = remaining.collect();
                        params.push(name.as_str(), rest.join("/"));
                    }
                    return Some(params);
                }
            }
        }

        if remaining.next().is_some() {
            return None;
        }
        Some(params)
    }

    /// Returns true if the path matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.match_path(path).is_some()
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the pattern has no placeholders or captures.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Returns true if the pattern ends in a `*` capture.
    #[must_use]
    pub fn has_rest(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Rest(_)))
    }

    /// Returns the names this pattern binds, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) | Segment::Rest(Some(name)) => Some(name.as_str()),
            Segment::Literal(_) | Segment::Rest(None) => None,
        })
    }

    fn param_count(&self) -> usize {
        self.param_names().count()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for RoutePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Splits a path into its non-empty segments.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
