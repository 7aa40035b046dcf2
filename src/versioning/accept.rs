//! Vendor media type parsing for the `Accept` header.
//!
//! # Grammar
//! ```text
//! application/vnd.{vendor}.v{major}[.{minor}[.{patch}]][-{prerelease}][+{build}]+json
//! ```
//!
//! # Design Decisions
//! - Pure functions over the input string; no I/O, no shared state
//! - A header without any `application/vnd.` range is "no version requested",
//!   not an error. Only a vendor range that fails to parse is rejected.
//! - Media type parameters (`; charset=utf-8`, `; q=0.9`) are ignored
//! - Only the first vendor range of the configured vendor is considered

use thiserror::Error;

use crate::versioning::semver::SemanticVersion;

/// Literal prefix shared by every vendor media type.
pub const VENDOR_PREFIX: &str = "application/vnd.";

const JSON_SUFFIX: &str = "+json";

/// A vendor media type matched the `application/vnd.` prefix but was malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid media type `{media_type}`: {reason}")]
pub struct InvalidMediaType {
    pub media_type: String,
    pub reason: String,
}

impl InvalidMediaType {
    fn new(media_type: &str, reason: impl Into<String>) -> Self {
        Self {
            media_type: media_type.to_string(),
            reason: reason.into(),
        }
    }
}

/// Vendor and version extracted from a vendor media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaVersion {
    pub vendor: String,
    pub version: SemanticVersion,
}

/// Parse a single media range such as `application/vnd.svc.v2.0.0+json`.
pub fn parse_media_type(range: &str) -> Result<MediaVersion, InvalidMediaType> {
    let media_type = strip_parameters(range);
    let rest = strip_prefix_ignore_case(media_type, VENDOR_PREFIX)
        .ok_or_else(|| InvalidMediaType::new(media_type, "not a vendor media type"))?;
    let body = strip_suffix_ignore_case(rest, JSON_SUFFIX)
        .ok_or_else(|| InvalidMediaType::new(media_type, "missing `+json` suffix"))?;

    let (vendor, version) = body
        .split_once('.')
        .ok_or_else(|| InvalidMediaType::new(media_type, "missing version segment"))?;
    if vendor.is_empty() || !vendor.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err(InvalidMediaType::new(media_type, "invalid vendor segment"));
    }
    let version = version
        .strip_prefix('v')
        .ok_or_else(|| InvalidMediaType::new(media_type, "version must start with `v`"))?;
    let version = SemanticVersion::parse_partial(version)
        .map_err(|e| InvalidMediaType::new(media_type, e.to_string()))?;

    Ok(MediaVersion {
        vendor: vendor.to_string(),
        version,
    })
}

/// True when the media range starts with `application/vnd.`.
pub fn is_vendor_media_type(range: &str) -> bool {
    strip_prefix_ignore_case(strip_parameters(range), VENDOR_PREFIX).is_some()
}

fn strip_parameters(range: &str) -> &str {
    range.split(';').next().unwrap_or_default().trim()
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    let tail = value.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &value[..split])
}

/// Extracts the requested version from a full `Accept` header value.
#[derive(Debug, Clone, Default)]
pub struct AcceptHeaderParser {
    vendor: Option<String>,
}

impl AcceptHeaderParser {
    /// Accept vendor media types of any vendor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only honor media types of `vendor`; other vendors count as "no version".
    pub fn for_vendor(vendor: impl Into<String>) -> Self {
        Self {
            vendor: Some(vendor.into()),
        }
    }

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    /// Parse a single media range. See [`parse_media_type`].
    pub fn parse(&self, header: &str) -> Result<MediaVersion, InvalidMediaType> {
        parse_media_type(header)
    }

    /// Resolve the requested version from an optional `Accept` header.
    ///
    /// Returns `Ok(None)` when the header is absent or carries no vendor
    /// media type for this parser's vendor.
    pub fn requested_version(
        &self,
        header: Option<&str>,
    ) -> Result<Option<MediaVersion>, InvalidMediaType> {
        let Some(header) = header else {
            return Ok(None);
        };

        for range in header.split(',').filter(|r| is_vendor_media_type(r)) {
            let parsed = parse_media_type(range)?;
            match &self.vendor {
                Some(expected) if !expected.eq_ignore_ascii_case(&parsed.vendor) => {
                    tracing::trace!(vendor = %parsed.vendor, "Ignoring media type of another vendor");
                    continue;
                }
                _ => return Ok(Some(parsed)),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vendor_media_type() {
        let parsed = parse_media_type("application/vnd.authentication.v2.0.0+json").unwrap();
        assert_eq!(parsed.vendor, "authentication");
        assert_eq!(parsed.version, SemanticVersion::new(2, 0, 0));
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let parsed = parse_media_type("application/vnd.svc.v1.0.0-alpha.1+b.7+json").unwrap();
        assert_eq!(parsed.version.to_string(), "1.0.0-alpha.1+b.7");
    }

    #[test]
    fn test_parse_partial_versions() {
        let parsed = parse_media_type("application/vnd.svc.v1+json").unwrap();
        assert_eq!(parsed.version, SemanticVersion::new(1, 0, 0));
        let parsed = parse_media_type("application/vnd.svc.v1.4+json").unwrap();
        assert_eq!(parsed.version, SemanticVersion::new(1, 4, 0));
    }

    #[test]
    fn test_parse_ignores_parameters_and_prefix_case() {
        let parsed = parse_media_type("Application/VND.svc.v3.1.4+json; charset=utf-8").unwrap();
        assert_eq!(parsed.version, SemanticVersion::new(3, 1, 4));
    }

    #[test]
    fn test_malformed_vendor_types_fail() {
        for bad in [
            "application/vnd.svc.v1.0.0",
            "application/vnd.svc.1.0.0+json",
            "application/vnd.svc.vv1.0.0+json",
            "application/vnd.svc+json",
            "application/vnd..v1.0.0+json",
            "application/vnd.svc.vX.Y.Z+json",
        ] {
            assert!(parse_media_type(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_requested_version_absent_or_plain() {
        let parser = AcceptHeaderParser::new();
        assert_eq!(parser.requested_version(None), Ok(None));
        assert_eq!(parser.requested_version(Some("application/json")), Ok(None));
        assert_eq!(parser.requested_version(Some("*/*")), Ok(None));
    }

    #[test]
    fn test_requested_version_from_list() {
        let parser = AcceptHeaderParser::new();
        let parsed = parser
            .requested_version(Some("application/json, application/vnd.test.v1.2.3+json;q=0.9"))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.version, SemanticVersion::new(1, 2, 3));
    }

    #[test]
    fn test_requested_version_malformed_vendor_fails() {
        let parser = AcceptHeaderParser::new();
        let err = parser
            .requested_version(Some("application/vnd.test.v1.x+json"))
            .unwrap_err();
        assert_eq!(err.media_type, "application/vnd.test.v1.x+json");
    }

    #[test]
    fn test_other_vendor_is_ignored() {
        let parser = AcceptHeaderParser::for_vendor("test");
        assert_eq!(
            parser.requested_version(Some("application/vnd.other.v1.0.0+json")),
            Ok(None)
        );
        let parsed = parser
            .requested_version(Some("application/vnd.other.v1.0.0+json, application/vnd.TEST.v2.0.0+json"))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.version, SemanticVersion::new(2, 0, 0));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let header = "application/vnd.svc.v1.0.0-rc.1+json";
        assert_eq!(parse_media_type(header), parse_media_type(header));
    }
}
