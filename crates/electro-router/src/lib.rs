//! Route patterns for Electro.
//!
//! This crate provides the pattern language used as keys of a route table
//! and the parameter storage that carries extracted bindings into requests.
//! The route table itself (ordering, anchors, dispatch) lives in
//! `electro-pipeline`; this crate only answers "does this pattern match this
//! path, and with which bindings?".
//!
//! # Pattern Language
//!
//! | Segment | Meaning |
//! |---------|---------|
//! | `users` | Literal, compared exactly |
//! | `@id`   | Placeholder, binds one path segment as `id` |
//! | `*path` | Trailing capture, binds the rest of the path as `path` |
//! | `*`     | Trailing capture without a binding |
//!
//! A pattern without a trailing capture matches only paths with the same
//! number of (non-empty) segments.
//!
//! # Example
//!
//! ```rust
//! use electro_router::RoutePattern;
//!
//! let pattern = RoutePattern::parse("/orgs/@org/files/*path").unwrap();
//!
//! let params = pattern.match_path("/orgs/acme/files/docs/readme.md").unwrap();
//! assert_eq!(params.get("org"), Some("acme"));
//! assert_eq!(params.get("path"), Some("docs/readme.md"));
//! ```

mod params;
mod pattern;

pub use params::Params;
pub use pattern::{path_segments, PatternError, RoutePattern, Segment};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_matching_pattern_wins() {
        let patterns: Vec<RoutePattern> = ["/a", "/@x"]
            .iter()
            .map(|p| RoutePattern::parse(p).unwrap())
            .collect();

        let first = patterns.iter().position(|p| p.matches("/a"));
        assert_eq!(first, Some(0));

        let first = patterns.iter().position(|p| p.matches("/b"));
        assert_eq!(first, Some(1));
    }

    #[test]
    fn test_no_match() {
        let pattern = RoutePattern::parse("/users").unwrap();
        assert!(pattern.match_path("/posts").is_none());
    }

    #[test]
    fn test_path_segments() {
        let segments: Vec<_> = path_segments("//a/b//c/").collect();
        assert_eq!(segments, vec!["a", "b", "c"]);
    }
}
