//! Route table: (path, method) → version-bound handler bindings.
//!
//! # Responsibilities
//! - Store bindings registered at startup
//! - Reject duplicate (path, method, version) triples
//! - Look up candidate bindings for a request path and method
//!
//! # Design Decisions
//! - Immutable after `freeze()` (shared via Arc, no locks on the hot path)
//! - Most specific pattern wins; ties are impossible because patterns are
//!   keyed by shape, so the outcome never depends on registration order
//! - O(n) pattern scan (acceptable for typical route counts)

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use axum::http::Method;
use thiserror::Error;

use crate::dispatch::handler::BoxedHandler;
use crate::routing::path::{normalize_path, split_segments, PathPattern, PatternKey};
use crate::versioning::SemanticVersion;

/// Errors raised while registering bindings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    #[error("{method} {path} is already bound for version {version}")]
    ConflictingBinding {
        path: String,
        method: Method,
        version: SemanticVersion,
    },

    #[error("{method} {path} belongs to group `{existing}`, not `{requested}`")]
    GroupMismatch {
        path: String,
        method: Method,
        existing: String,
        requested: String,
    },

    #[error("invalid path pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route table is frozen")]
    TableFrozen,
}

/// A handler bound to a path pattern, method and version.
#[derive(Clone)]
pub struct RouteBinding {
    pattern: PathPattern,
    method: Method,
    version: SemanticVersion,
    group: String,
    handler: BoxedHandler,
}

impl RouteBinding {
    pub fn new(
        pattern: &str,
        method: Method,
        version: SemanticVersion,
        group: impl Into<String>,
        handler: BoxedHandler,
    ) -> Result<Self, RouteTableError> {
        let pattern = PathPattern::parse(pattern).map_err(|reason| {
            RouteTableError::InvalidPattern {
                pattern: pattern.to_string(),
                reason,
            }
        })?;
        Ok(Self {
            pattern,
            method,
            version,
            group: group.into(),
            handler,
        })
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn version(&self) -> &SemanticVersion {
        &self.version
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn handler(&self) -> &BoxedHandler {
        &self.handler
    }
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("pattern", &self.pattern.as_str())
            .field("method", &self.method)
            .field("version", &self.version)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct MethodBindings {
    group: String,
    bindings: BTreeMap<SemanticVersion, RouteBinding>,
}

#[derive(Debug, Clone)]
struct PatternRoutes {
    pattern: PathPattern,
    methods: HashMap<Method, MethodBindings>,
}

/// Candidate bindings for a matched (path, method).
#[derive(Debug)]
pub struct RouteCandidates<'a> {
    pub pattern: &'a PathPattern,
    pub group: &'a str,
    pub params: Vec<(String, String)>,
    bindings: &'a BTreeMap<SemanticVersion, RouteBinding>,
}

impl<'a> RouteCandidates<'a> {
    /// Bindings in ascending version order.
    pub fn bindings(&self) -> impl Iterator<Item = &'a RouteBinding> {
        self.bindings.values()
    }

    pub fn versions(&self) -> impl Iterator<Item = &'a SemanticVersion> {
        self.bindings.keys()
    }

    pub fn binding(&self, version: &SemanticVersion) -> Option<&'a RouteBinding> {
        self.bindings.get(version)
    }
}

/// Outcome of a table lookup.
#[derive(Debug)]
pub enum RouteLookup<'a> {
    Found(RouteCandidates<'a>),
    /// The path matched a pattern, but not for this method.
    MethodNotAllowed { pattern: &'a PathPattern },
    NotFound,
}

/// Table of route bindings.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<PatternKey, PatternRoutes>,
    frozen: bool,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `binding` could be registered, without registering it.
    pub fn check(&self, binding: &RouteBinding) -> Result<(), RouteTableError> {
        if self.frozen {
            return Err(RouteTableError::TableFrozen);
        }
        let Some(existing) = self
            .routes
            .get(&binding.pattern.key())
            .and_then(|r| r.methods.get(&binding.method))
        else {
            return Ok(());
        };

        if existing.group != binding.group {
            return Err(RouteTableError::GroupMismatch {
                path: binding.pattern.to_string(),
                method: binding.method.clone(),
                existing: existing.group.clone(),
                requested: binding.group.clone(),
            });
        }
        if existing.bindings.contains_key(&binding.version) {
            return Err(RouteTableError::ConflictingBinding {
                path: binding.pattern.to_string(),
                method: binding.method.clone(),
                version: binding.version.clone(),
            });
        }
        Ok(())
    }

    /// Register a binding.
    pub fn register(&mut self, binding: RouteBinding) -> Result<(), RouteTableError> {
        self.check(&binding)?;

        tracing::debug!(
            path = %binding.pattern,
            method = %binding.method,
            version = %binding.version,
            group = %binding.group,
            "Registered route binding"
        );

        let routes = self
            .routes
            .entry(binding.pattern.key())
            .or_insert_with(|| PatternRoutes {
                pattern: binding.pattern.clone(),
                methods: HashMap::new(),
            });
        routes
            .methods
            .entry(binding.method.clone())
            .or_insert_with(|| MethodBindings {
                group: binding.group.clone(),
                bindings: BTreeMap::new(),
            })
            .bindings
            .insert(binding.version.clone(), binding);
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Find the most specific pattern matching `path` that serves `method`.
    pub fn route(&self, path: &str, method: &Method) -> RouteLookup<'_> {
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);

        let mut matches: Vec<(&PatternRoutes, Vec<(String, String)>)> = self
            .routes
            .values()
            .filter_map(|r| r.pattern.captures(&segments).map(|params| (r, params)))
            .collect();
        matches.sort_by(|(a, _), (b, _)| a.pattern.specificity_cmp(&b.pattern));

        let Some(most_specific) = matches.first().map(|(routes, _)| *routes) else {
            return RouteLookup::NotFound;
        };

        for (routes, params) in matches {
            if let Some(method_bindings) = routes.methods.get(method) {
                return RouteLookup::Found(RouteCandidates {
                    pattern: &routes.pattern,
                    group: &method_bindings.group,
                    params,
                    bindings: &method_bindings.bindings,
                });
            }
        }
        RouteLookup::MethodNotAllowed {
            pattern: &most_specific.pattern,
        }
    }

    /// All bindings for `(path, method)`, possibly empty.
    pub fn lookup(&self, path: &str, method: &Method) -> Vec<&RouteBinding> {
        match self.route(path, method) {
            RouteLookup::Found(candidates) => candidates.bindings().collect(),
            _ => Vec::new(),
        }
    }

    /// Every binding, ordered by pattern shape then version.
    pub fn bindings(&self) -> impl Iterator<Item = &RouteBinding> {
        self.routes.values().flat_map(|r| {
            let mut methods: Vec<_> = r.methods.iter().collect();
            methods.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
            methods.into_iter().flat_map(|(_, m)| m.bindings.values())
        })
    }

    pub fn len(&self) -> usize {
        self.routes
            .values()
            .flat_map(|r| r.methods.values())
            .map(|m| m.bindings.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::handler_fn;
    use crate::dispatch::RequestVersionContext;
    use axum::body::Body;
    use axum::http::Request;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn binding(path: &str, method: Method, version: &str, group: &str) -> RouteBinding {
        let handler = handler_fn(|_req: Request<Body>, _ctx: RequestVersionContext| async { "ok" });
        RouteBinding::new(path, method, v(version), group, handler).unwrap()
    }

    #[test]
    fn test_register_conflict() {
        let mut table = RouteTable::new();
        table.register(binding("/health", Method::GET, "1.0.0", "health")).unwrap();
        table.register(binding("/health", Method::GET, "2.0.0", "health")).unwrap();
        table.register(binding("/health", Method::POST, "1.0.0", "health")).unwrap();

        let err = table
            .register(binding("/health/", Method::GET, "1.0.0+b", "health"))
            .unwrap_err();
        assert!(matches!(err, RouteTableError::ConflictingBinding { .. }));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_param_names_do_not_distinguish_patterns() {
        let mut table = RouteTable::new();
        table.register(binding("/users/{id}", Method::GET, "1.0.0", "users")).unwrap();
        let err = table
            .register(binding("/users/{uid}", Method::GET, "1.0.0", "users"))
            .unwrap_err();
        assert!(matches!(err, RouteTableError::ConflictingBinding { .. }));
    }

    #[test]
    fn test_group_mismatch() {
        let mut table = RouteTable::new();
        table.register(binding("/health", Method::GET, "1.0.0", "health")).unwrap();
        assert!(matches!(
            table.register(binding("/health", Method::GET, "2.0.0", "status")),
            Err(RouteTableError::GroupMismatch { .. })
        ));
    }

    #[test]
    fn test_frozen_table_rejects_registration() {
        let mut table = RouteTable::new();
        table.freeze();
        assert_eq!(
            table.register(binding("/health", Method::GET, "1.0.0", "health")).unwrap_err(),
            RouteTableError::TableFrozen
        );
    }

    #[test]
    fn test_lookup_returns_all_versions() {
        let mut table = RouteTable::new();
        table.register(binding("/health", Method::GET, "2.0.0", "health")).unwrap();
        table.register(binding("/health", Method::GET, "1.0.0", "health")).unwrap();

        let versions: Vec<_> = table
            .lookup("/health", &Method::GET)
            .into_iter()
            .map(|b| b.version().clone())
            .collect();
        assert_eq!(versions, vec![v("1.0.0"), v("2.0.0")]);
        assert!(table.lookup("/health", &Method::DELETE).is_empty());
        assert!(table.lookup("/missing", &Method::GET).is_empty());
    }

    #[test]
    fn test_literal_preferred_over_param_in_any_order() {
        for reversed in [false, true] {
            let mut table = RouteTable::new();
            let mut bindings = vec![
                binding("/users/{id}", Method::GET, "1.0.0", "users"),
                binding("/users/me", Method::GET, "1.0.0", "me"),
            ];
            if reversed {
                bindings.reverse();
            }
            for b in bindings {
                table.register(b).unwrap();
            }

            let RouteLookup::Found(me) = table.route("/users/me", &Method::GET) else {
                panic!("expected /users/me to match");
            };
            assert_eq!(me.group, "me");
            assert!(me.params.is_empty());

            let RouteLookup::Found(other) = table.route("/users/42", &Method::GET) else {
                panic!("expected /users/42 to match");
            };
            assert_eq!(other.group, "users");
            assert_eq!(other.params, vec![("id".to_string(), "42".to_string())]);
        }
    }

    #[test]
    fn test_method_falls_back_to_less_specific_pattern() {
        let mut table = RouteTable::new();
        table.register(binding("/users/me", Method::GET, "1.0.0", "me")).unwrap();
        table.register(binding("/users/{id}", Method::DELETE, "1.0.0", "users")).unwrap();

        let RouteLookup::Found(found) = table.route("/users/me", &Method::DELETE) else {
            panic!("expected DELETE /users/me to reach /users/{{id}}");
        };
        assert_eq!(found.pattern.as_str(), "/users/{id}");

        assert!(matches!(
            table.route("/users/me", &Method::PUT),
            RouteLookup::MethodNotAllowed { .. }
        ));
    }

    #[test]
    fn test_bindings_listing_is_deterministic() {
        let mut table = RouteTable::new();
        table.register(binding("/b", Method::POST, "1.0.0", "b")).unwrap();
        table.register(binding("/b", Method::GET, "1.0.0", "b")).unwrap();
        table.register(binding("/a", Method::GET, "1.0.0", "a")).unwrap();

        let listed: Vec<_> = table
            .bindings()
            .map(|b| format!("{} {}", b.method(), b.pattern()))
            .collect();
        assert_eq!(listed, vec!["GET /a", "GET /b", "POST /b"]);
    }
}
