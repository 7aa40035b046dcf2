//! Path patterns with parameterized segments.
//!
//! # Responsibilities
//! - Parse `/users/{id}/posts` style patterns
//! - Match request paths and capture parameters
//! - Rank patterns so literal segments beat parameters
//!
//! # Design Decisions
//! - Parameter names are not part of a pattern's identity: `/u/{id}` and
//!   `/u/{uid}` have the same [`PatternKey`]
//! - Ranking compares segment by segment, independent of registration order
//! - No regex, no wildcards: segment count must match exactly

use std::cmp::Ordering;
use std::fmt;

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// Shape of a pattern with parameter names erased. Literal segments sort
/// before parameter segments at the same position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternKey(Vec<KeySegment>);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum KeySegment {
    Literal(String),
    Param,
}

/// A parsed path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern. Returns a description of the problem on failure.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err("pattern must start with `/`".to_string());
        }
        let normalized = normalize_path(raw);
        let mut segments = Vec::new();
        for part in split_segments(&normalized) {
            if part.is_empty() {
                return Err("empty path segment".to_string());
            }
            let segment = match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) => {
                    if name.is_empty()
                        || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
                    {
                        return Err(format!("invalid parameter name in `{}`", part));
                    }
                    Segment::Param(name.to_string())
                }
                None if part.contains(['{', '}']) => {
                    return Err(format!("unbalanced braces in `{}`", part));
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: normalized,
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn key(&self) -> PatternKey {
        PatternKey(
            self.segments
                .iter()
                .map(|s| match s {
                    Segment::Literal(l) => KeySegment::Literal(l.clone()),
                    Segment::Param(_) => KeySegment::Param,
                })
                .collect(),
        )
    }

    /// Match already-split request segments, returning captured parameters.
    pub fn captures(&self, path: &[&str]) -> Option<Vec<(String, String)>> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if actual.is_empty() => return None,
                Segment::Param(name) => params.push((name.clone(), (*actual).to_string())),
            }
        }
        Some(params)
    }

    /// `Less` when `self` is more specific than `other`: at the first position
    /// where one has a literal and the other a parameter, the literal wins.
    pub fn specificity_cmp(&self, other: &PathPattern) -> Ordering {
        for (a, b) in self.segments.iter().zip(&other.segments) {
            match (a, b) {
                (Segment::Literal(_), Segment::Param(_)) => return Ordering::Less,
                (Segment::Param(_), Segment::Literal(_)) => return Ordering::Greater,
                _ => {}
            }
        }
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Ensure a leading `/` and drop a trailing one (except for the root).
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Split a normalized path into segments. The root has none.
pub fn split_segments(path: &str) -> Vec<&str> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> PathPattern {
        PathPattern::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_and_normalize() {
        assert_eq!(p("/health/").as_str(), "/health");
        assert_eq!(p("/").segments().len(), 0);
        assert_eq!(
            p("/users/{id}").segments(),
            &[Segment::Literal("users".into()), Segment::Param("id".into())]
        );
    }

    #[test]
    fn test_parse_rejects_bad_patterns() {
        assert!(PathPattern::parse("health").is_err());
        assert!(PathPattern::parse("/a//b").is_err());
        assert!(PathPattern::parse("/users/{}").is_err());
        assert!(PathPattern::parse("/users/{id").is_err());
        assert!(PathPattern::parse("/users/{i-d}").is_err());
    }

    #[test]
    fn test_captures() {
        let pattern = p("/users/{id}/posts/{post}");
        let params = pattern.captures(&["users", "7", "posts", "42"]).unwrap();
        assert_eq!(
            params,
            vec![("id".to_string(), "7".to_string()), ("post".to_string(), "42".to_string())]
        );
        assert!(pattern.captures(&["users", "7", "posts"]).is_none());
        assert!(pattern.captures(&["users", "7", "comments", "1"]).is_none());
        assert!(p("/").captures(&[]).is_some());
    }

    #[test]
    fn test_same_shape_same_key() {
        assert_eq!(p("/u/{id}").key(), p("/u/{uid}").key());
        assert_ne!(p("/u/{id}").key(), p("/u/me").key());
    }

    #[test]
    fn test_literal_beats_param() {
        assert_eq!(p("/users/me").specificity_cmp(&p("/users/{id}")), Ordering::Less);
        assert_eq!(p("/{a}/b").specificity_cmp(&p("/a/{b}")), Ordering::Greater);
        assert_eq!(p("/a/{b}").specificity_cmp(&p("/{a}/b")), Ordering::Less);
    }

    #[test]
    fn test_split_segments() {
        assert!(split_segments("/").is_empty());
        assert_eq!(split_segments("/a/b"), vec!["a", "b"]);
        assert_eq!(split_segments(&normalize_path("a/b/")), vec!["a", "b"]);
    }
}
