//! Route patterns in the path-to-regexp dialect used by the frontend.
//!
//! Supported syntax:
//! - literal segments: `/api/webhook/clerk`
//! - named parameters matching one non-empty segment: `/events/:id`
//! - raw regex groups: `/sign-in(.*)`
//!
//! Matching is anchored, case-insensitive and tolerates one trailing slash.

use regex::{Regex, RegexSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("route pattern {pattern:?} must start with '/'")]
    MissingLeadingSlash { pattern: String },
    #[error("route pattern {pattern:?} has an empty parameter name")]
    EmptyParameter { pattern: String },
    #[error("route pattern {pattern:?} has an unbalanced group")]
    UnbalancedGroup { pattern: String },
    #[error("route pattern {pattern:?} is not a valid expression: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Translate one route pattern into an anchored regex source.
fn compile(pattern: &str) -> Result<String, PatternError> {
    if !pattern.starts_with('/') {
        return Err(PatternError::MissingLeadingSlash {
            pattern: pattern.to_string(),
        });
    }

    let trimmed = pattern.strip_suffix('/').unwrap_or(pattern);
    let mut out = String::from("(?i)^");
    let mut chars = trimmed.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ':' => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(PatternError::EmptyParameter {
                        pattern: pattern.to_string(),
                    });
                }
                out.push_str("([^/]+?)");
            }
            '(' => {
                let mut depth = 1;
                let mut group = String::new();
                for g in chars.by_ref() {
                    match g {
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        _ => {}
                    }
                    if depth == 0 {
                        break;
                    }
                    group.push(g);
                }
                if depth != 0 {
                    return Err(PatternError::UnbalancedGroup {
                        pattern: pattern.to_string(),
                    });
                }
                out.push_str("(?:");
                out.push_str(&group);
                out.push(')');
            }
            ')' => {
                return Err(PatternError::UnbalancedGroup {
                    pattern: pattern.to_string(),
                });
            }
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
        }
    }

    out.push_str("/?$");

    // Surface group syntax errors against the pattern that caused them
    Regex::new(&out).map_err(|source| PatternError::Regex {
        pattern: pattern.to_string(),
        source,
    })?;

    Ok(out)
}

/// An immutable list of route patterns.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    patterns: Vec<String>,
    set: RegexSet,
}

impl RouteMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let sources = patterns
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        let set = RegexSet::new(&sources).map_err(|source| PatternError::Regex {
            pattern: patterns.join(", "),
            source,
        })?;

        Ok(Self { patterns, set })
    }

    /// Whether any pattern matches the path.
    pub fn matches(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(patterns: &[&str]) -> RouteMatcher {
        RouteMatcher::new(patterns.iter().copied()).unwrap()
    }

    #[test]
    fn test_root_pattern() {
        let m = matcher(&["/"]);
        assert!(m.matches("/"));
        assert!(!m.matches("/dashboard"));
    }

    #[test]
    fn test_literal_pattern() {
        let m = matcher(&["/api/webhook/clerk"]);
        assert!(m.matches("/api/webhook/clerk"));
        assert!(m.matches("/api/webhook/clerk/"));
        assert!(m.matches("/API/Webhook/Clerk"));
        assert!(!m.matches("/api/webhook/clerk/extra"));
        assert!(!m.matches("/api/webhook"));
    }

    #[test]
    fn test_wildcard_group() {
        let m = matcher(&["/sign-in(.*)"]);
        assert!(m.matches("/sign-in"));
        assert!(m.matches("/sign-in/factor-one"));
        assert!(m.matches("/sign-in-legacy"));
        assert!(!m.matches("/sign-up"));
    }

    #[test]
    fn test_named_parameter() {
        let m = matcher(&["/events/:id"]);
        assert!(m.matches("/events/42"));
        assert!(m.matches("/events/42/"));
        assert!(!m.matches("/events"));
        assert!(!m.matches("/events/"));
        assert!(!m.matches("/events/42/edit"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let m = matcher(&["/a.b"]);
        assert!(m.matches("/a.b"));
        assert!(!m.matches("/axb"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            RouteMatcher::new(["events"]),
            Err(PatternError::MissingLeadingSlash { .. })
        ));
        assert!(matches!(
            RouteMatcher::new(["/events/:"]),
            Err(PatternError::EmptyParameter { .. })
        ));
        assert!(matches!(
            RouteMatcher::new(["/sign-in(.*"]),
            Err(PatternError::UnbalancedGroup { .. })
        ));
        assert!(matches!(
            RouteMatcher::new(["/sign-in)"]),
            Err(PatternError::UnbalancedGroup { .. })
        ));
        assert!(matches!(
            RouteMatcher::new(["/x([)"]),
            Err(PatternError::Regex { .. })
        ));
    }

    #[test]
    fn test_empty_matcher() {
        let m = RouteMatcher::new(Vec::<String>::new()).unwrap();
        assert!(!m.matches("/"));
        assert!(m.patterns().is_empty());
    }
}
