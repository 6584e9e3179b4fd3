//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse registration patterns
//! - Match request paths (case-sensitive)
//! - Rank competing matches
//!
//! # Design Decisions
//! - A pattern ending in `/` names a subtree, anything else an exact path
//! - `/` is the root subtree and therefore the default handler
//! - A subtree also matches its own path without the trailing slash

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathPattern {
    /// Matches one path exactly.
    Exact(String),
    /// Matches every path under a prefix ending in `/`.
    Subtree(String),
}

impl PathPattern {
    /// Parse a registration pattern. Empty patterns mean the root.
    pub fn parse(pattern: &str) -> Self {
        let mut normalized = pattern.trim().to_string();
        if !normalized.starts_with('/') {
            normalized.insert(0, '/');
        }

        if normalized.ends_with('/') {
            PathPattern::Subtree(normalized)
        } else {
            PathPattern::Exact(normalized)
        }
    }

    pub fn root() -> Self {
        PathPattern::Subtree("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            PathPattern::Exact(p) | PathPattern::Subtree(p) => p,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Subtree(prefix) => {
                path.starts_with(prefix.as_str())
                    || (prefix.len() > 1 && path == &prefix[..prefix.len() - 1])
            }
        }
    }

    /// Ordering used for lookup: exact patterns before subtrees, longer
    /// subtrees before shorter ones.
    pub fn precedence(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PathPattern::Exact(a), PathPattern::Exact(b)) => a.cmp(b),
            (PathPattern::Exact(_), PathPattern::Subtree(_)) => Ordering::Less,
            (PathPattern::Subtree(_), PathPattern::Exact(_)) => Ordering::Greater,
            (PathPattern::Subtree(a), PathPattern::Subtree(b)) => {
                b.len().cmp(&a.len()).then_with(|| a.cmp(b))
            }
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
