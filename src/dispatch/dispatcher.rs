//! Request dispatcher.
//!
//! # Responsibilities
//! - Negotiate the version of every inbound request
//! - Select the binding for the resolved version and invoke its handler
//! - Turn every request-time failure into a well-formed rejection
//!
//! # Data Flow
//! ```text
//! Request
//!     → Accept header parsed           (400 InvalidAcceptHeader)
//!     → route table lookup             (404 RouteNotFound)
//!     → resolve over bound versions    (400 VersionNotSupported)
//!     → lifecycle check                (410 VersionSunset)
//!     → handler(request, context)
//!     → deprecation + X-Api-Version headers
//! ```
//!
//! # Design Decisions
//! - The current snapshot is loaded once per request, so a concurrent
//!   reload never mixes two registries within one dispatch
//! - Metrics and the dispatch record are written only when the response
//!   exists; a request dropped by the surrounding deadline records nothing

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::dispatch::context::{
    Deprecation, DispatchOutcome, DispatchRecord, RequestVersionContext, X_API_VERSION,
};
use crate::dispatch::rejection::{Rejection, RejectionKind};
use crate::dispatch::snapshot::ServiceSnapshot;
use crate::observability::metrics;
use crate::routing::RouteLookup;
use crate::versioning::{match_version, RegistryError, SemanticVersion};

/// Single entry point of the request pipeline.
///
/// Cheap to clone; clones share the published snapshot.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    snapshot: Arc<ArcSwap<ServiceSnapshot>>,
}

/// A rejection plus whatever negotiation learned before it happened.
struct Rejected {
    rejection: Rejection,
    group: Option<String>,
    requested_version: Option<SemanticVersion>,
    resolved_version: Option<SemanticVersion>,
}

impl Rejected {
    fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            rejection: Rejection::new(kind, message),
            group: None,
            requested_version: None,
            resolved_version: None,
        }
    }

    fn in_group(mut self, group: &str, requested: Option<&SemanticVersion>) -> Self {
        self.group = Some(group.to_string());
        self.requested_version = requested.cloned();
        self
    }

    fn with_requested(mut self, requested: Option<&SemanticVersion>) -> Self {
        self.requested_version = requested.cloned();
        self
    }

    fn resolved(mut self, version: &SemanticVersion) -> Self {
        self.resolved_version = Some(version.clone());
        self
    }
}

impl Dispatcher {
    pub fn new(snapshot: ServiceSnapshot) -> Self {
        Self {
            snapshot: Arc::new(ArcSwap::from_pointee(snapshot)),
        }
    }

    /// Snapshot new requests will observe.
    pub fn current(&self) -> Arc<ServiceSnapshot> {
        self.snapshot.load_full()
    }

    /// Atomically replace the snapshot. In-flight requests keep the old one.
    pub fn publish(&self, snapshot: ServiceSnapshot) {
        tracing::info!(generation = snapshot.generation(), "Publishing version snapshot");
        self.snapshot.store(Arc::new(snapshot));
    }

    /// Derive a new snapshot from the current one and publish it.
    ///
    /// Retries if another writer published in between, so concurrent
    /// updates are never lost.
    pub fn update<F, E>(&self, derive: F) -> Result<Arc<ServiceSnapshot>, E>
    where
        F: Fn(&ServiceSnapshot) -> Result<ServiceSnapshot, E>,
    {
        loop {
            let current = self.snapshot.load_full();
            let next = Arc::new(derive(&current)?);
            let previous = self.snapshot.compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&previous, &current) {
                tracing::info!(generation = next.generation(), "Published version snapshot");
                return Ok(next);
            }
        }
    }

    /// Dispatch `request` at the current wall-clock time.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        self.dispatch_at(request, Utc::now()).await
    }

    /// Dispatch `request`, evaluating deprecation and sunset against `now`.
    pub async fn dispatch_at(&self, mut request: Request<Body>, now: DateTime<Utc>) -> Response {
        let started = Instant::now();
        let snapshot = self.snapshot.load_full();

        let (mut response, record) = match negotiate(&snapshot, &request, now) {
            Ok(context) => {
                let record = DispatchRecord {
                    group: Some(context.group().to_string()),
                    requested_version: context.requested_version.clone(),
                    resolved_version: Some(context.resolved_version.clone()),
                    outcome: if context.is_deprecated() {
                        DispatchOutcome::ServedDeprecated
                    } else {
                        DispatchOutcome::Served
                    },
                };
                let handler = Arc::clone(context.binding.handler());
                let version = context.resolved_version.clone();
                let deprecation = context.deprecation.clone();

                request.extensions_mut().insert(context.clone());
                let mut response = handler.call(request, context).await;
                annotate(&mut response, &version, deprecation.as_ref());
                (response, record)
            }
            Err(rejected) => {
                let record = DispatchRecord {
                    group: rejected.group,
                    requested_version: rejected.requested_version,
                    resolved_version: rejected.resolved_version,
                    outcome: DispatchOutcome::Rejected(rejected.rejection.kind),
                };
                tracing::debug!(
                    kind = %rejected.rejection.kind,
                    message = %rejected.rejection.message,
                    "Request rejected"
                );
                (rejected.rejection.into_response(), record)
            }
        };

        tracing::debug!(
            group = record.group.as_deref().unwrap_or("-"),
            requested_version = ?record.requested_version.as_ref().map(ToString::to_string),
            resolved_version = ?record.resolved_version.as_ref().map(ToString::to_string),
            outcome = record.outcome.as_str(),
            generation = snapshot.generation(),
            "Dispatched"
        );
        metrics::record_dispatch(&record, started.elapsed());
        response.extensions_mut().insert(record);
        response
    }
}

/// Run negotiation up to, but not including, handler invocation.
fn negotiate(
    snapshot: &ServiceSnapshot,
    request: &Request<Body>,
    now: DateTime<Utc>,
) -> Result<RequestVersionContext, Rejected> {
    let raw_accept = accept_header(request);
    let requested = snapshot
        .parser()
        .requested_version(raw_accept.as_deref())
        .map_err(|e| Rejected::new(RejectionKind::InvalidAcceptHeader, e.to_string()))?;
    let requested_version = requested.as_ref().map(|m| m.version.clone());

    let method = request.method();
    let path = request.uri().path();
    let candidates = match snapshot.routes().route(path, method) {
        RouteLookup::Found(candidates) => candidates,
        RouteLookup::MethodNotAllowed { .. } | RouteLookup::NotFound => {
            return Err(Rejected::new(
                RejectionKind::RouteNotFound,
                format!("no route for {} {}", method, path),
            )
            .with_requested(requested_version.as_ref()));
        }
    };
    let group = candidates.group;

    let registry = snapshot.registry();
    let unsupported = |e: RegistryError| {
        let kind = match e {
            RegistryError::NoSuchGroup(_) => RejectionKind::RouteNotFound,
            _ => RejectionKind::VersionNotSupported,
        };
        let message = match &requested_version {
            Some(v) => format!("version {} is not supported for {} {}", v, method, path),
            None => format!("no version available for {} {}", method, path),
        };
        Rejected::new(kind, message).in_group(group, requested_version.as_ref())
    };
    // An explicit request is matched against the versions bound here, not
    // every version of the group.
    let resolved = match &requested_version {
        None => registry.resolve(group, None).map_err(unsupported)?,
        Some(requested) => {
            if !registry.groups().any(|g| g == group) {
                return Err(unsupported(RegistryError::NoSuchGroup(group.to_string())));
            }
            match_version(requested, candidates.versions(), registry.policy(group))
                .map_err(|e| unsupported(e.into()))?
        }
    };

    let binding = candidates.binding(&resolved).ok_or_else(|| {
        Rejected::new(
            RejectionKind::VersionNotSupported,
            format!("version {} is not available for {} {}", resolved, method, path),
        )
        .in_group(group, requested_version.as_ref())
        .resolved(&resolved)
    })?;

    let entry = registry.entry(group, &resolved);
    if let Some(sunset) = entry.filter(|e| e.is_sunset(now)).and_then(|e| e.sunset_at) {
        return Err(Rejected::new(
            RejectionKind::VersionSunset,
            format!(
                "version {} was sunset at {}",
                resolved,
                sunset.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        )
        .in_group(group, requested_version.as_ref())
        .resolved(&resolved));
    }
    let deprecation = entry.filter(|e| e.is_deprecated(now)).map(|e| Deprecation {
        deprecated_at: e.deprecated_at,
        sunset_at: e.sunset_at,
    });

    Ok(RequestVersionContext {
        raw_accept,
        vendor: requested.map(|m| m.vendor),
        requested_version,
        resolved_version: resolved,
        binding: binding.clone(),
        params: candidates.params,
        deprecation,
    })
}

/// Every `Accept` field joined into one list.
///
/// Bytes outside UTF-8 are replaced rather than rejected, so only a vendor
/// range that fails to parse turns into a rejection.
fn accept_header(request: &Request<Body>) -> Option<String> {
    let mut fields = request.headers().get_all(header::ACCEPT).iter().peekable();
    fields.peek()?;
    let joined = fields
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    Some(joined)
}

/// Attach the served version and any deprecation notice to a handler response.
fn annotate(response: &mut Response, version: &SemanticVersion, deprecation: Option<&Deprecation>) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&version.to_string()) {
        headers.insert(X_API_VERSION, value);
    }
    if let Some(deprecation) = deprecation {
        for (name, value) in deprecation.headers(version) {
            headers.insert(name, value);
        }
    }
}
