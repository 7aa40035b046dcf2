//! Request-scoped version context.
//!
//! # Responsibilities
//! - Carry the negotiation result to the selected handler
//! - Expose `requested_version` / `resolved_version` to downstream layers
//!   (logging, response formatting) without recomputation
//!
//! # Design Decisions
//! - One context per request, owned by the request task
//! - The handler receives it by value and in the request extensions
//! - The [`DispatchRecord`] lands in the response extensions for every
//!   outcome, including rejections

use axum::http::{HeaderName, HeaderValue, Method};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::dispatch::rejection::RejectionKind;
use crate::routing::RouteBinding;
use crate::versioning::SemanticVersion;

/// `Deprecation` response header (RFC 9745).
pub const DEPRECATION: HeaderName = HeaderName::from_static("deprecation");

/// `Sunset` response header (RFC 8594).
pub const SUNSET: HeaderName = HeaderName::from_static("sunset");

/// Version actually served, echoed on every successful response.
pub const X_API_VERSION: HeaderName = HeaderName::from_static("x-api-version");

/// Lifecycle state of a served version that is deprecated but not yet sunset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deprecation {
    pub deprecated_at: Option<DateTime<Utc>>,
    pub sunset_at: Option<DateTime<Utc>>,
}

impl Deprecation {
    /// Value for the `Warning` header.
    pub fn warning(&self, version: &SemanticVersion) -> String {
        match self.sunset_at {
            Some(sunset) => format!(
                "299 - \"version {} deprecated, sunset at {}\"",
                version,
                sunset.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => format!("299 - \"version {} deprecated\"", version),
        }
    }

    /// Headers announcing the deprecation. Values that cannot be encoded are skipped.
    pub fn headers(&self, version: &SemanticVersion) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = Vec::with_capacity(3);
        if let Ok(value) = HeaderValue::from_str(&self.warning(version)) {
            headers.push((axum::http::header::WARNING, value));
        }
        let deprecation = match self.deprecated_at {
            Some(at) => format!("@{}", at.timestamp()),
            None => "true".to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&deprecation) {
            headers.push((DEPRECATION, value));
        }
        if let Some(sunset) = self.sunset_at {
            let http_date = sunset.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
            if let Ok(value) = HeaderValue::from_str(&http_date) {
                headers.push((SUNSET, value));
            }
        }
        headers
    }
}

/// Negotiation result handed to the selected handler.
#[derive(Debug, Clone)]
pub struct RequestVersionContext {
    /// Raw `Accept` header, if any.
    pub raw_accept: Option<String>,
    /// Vendor named by the accepted media type.
    pub vendor: Option<String>,
    pub requested_version: Option<SemanticVersion>,
    pub resolved_version: SemanticVersion,
    /// Binding selected for the resolved version.
    pub binding: RouteBinding,
    /// Path parameters captured by the binding's pattern.
    pub params: Vec<(String, String)>,
    pub deprecation: Option<Deprecation>,
}

impl RequestVersionContext {
    pub fn group(&self) -> &str {
        self.binding.group()
    }

    pub fn method(&self) -> &Method {
        self.binding.method()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation.is_some()
    }
}

/// Final outcome of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchOutcome {
    Served,
    ServedDeprecated,
    Rejected(RejectionKind),
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Served => "served",
            DispatchOutcome::ServedDeprecated => "served_deprecated",
            DispatchOutcome::Rejected(kind) => kind.as_str(),
        }
    }
}

/// What the dispatcher decided, readable from the response extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRecord {
    pub group: Option<String>,
    pub requested_version: Option<SemanticVersion>,
    pub resolved_version: Option<SemanticVersion>,
    pub outcome: DispatchOutcome,
}
