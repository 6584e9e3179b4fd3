//! Handler registry.
//!
//! # Responsibilities
//! - Store path pattern → handler registrations
//! - Look up the handler for an event path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Copy-on-write: registration swaps in a new sorted route table, lookups
//!   read the current snapshot without locking
//! - O(n) scan over a table sorted by precedence (acceptable for typical
//!   route counts); the first match is the best match
//! - Explicit NoMatch rather than silent default
//! - Handlers live as long as the registry that owns them

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::dispatch::handler::EventHandler;
use crate::routing::matcher::PathPattern;

#[derive(Clone)]
struct Route {
    pattern: PathPattern,
    handler: Arc<dyn EventHandler>,
}

/// Result of a successful lookup.
#[derive(Clone)]
pub struct RouteMatch {
    pub pattern: PathPattern,
    pub handler: Arc<dyn EventHandler>,
}

impl std::fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Shared registry of event handlers.
///
/// Cloning is cheap and clones observe each other's registrations.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    routes: Arc<ArcSwap<Vec<Route>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `pattern`, replacing any previous handler for
    /// the same pattern. Returns true if one was replaced.
    pub fn register(&self, pattern: &str, handler: Arc<dyn EventHandler>) -> bool {
        let pattern = PathPattern::parse(pattern);
        let mut replaced = false;

        self.routes.rcu(|current| {
            let mut next: Vec<Route> = current.iter().cloned().collect();
            replaced = false;
            match next.iter_mut().find(|route| route.pattern == pattern) {
                Some(route) => {
                    route.handler = Arc::clone(&handler);
                    replaced = true;
                }
                None => next.push(Route {
                    pattern: pattern.clone(),
                    handler: Arc::clone(&handler),
                }),
            }
            next.sort_by(|a, b| a.pattern.precedence(&b.pattern));
            next
        });

        tracing::info!(pattern = %pattern, replaced, "Handler registered");
        replaced
    }

    /// Find the handler for a request path.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.routes
            .load()
            .iter()
            .find(|route| route.pattern.matches(path))
            .map(|route| RouteMatch {
                pattern: route.pattern.clone(),
                handler: Arc::clone(&route.handler),
            })
    }

    /// Registered patterns in lookup order.
    pub fn patterns(&self) -> Vec<String> {
        self.routes
            .load()
            .iter()
            .map(|route| route.pattern.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("patterns", &self.patterns())
            .finish()
    }
}
