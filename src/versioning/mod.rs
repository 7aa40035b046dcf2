//! Version negotiation primitives.
//!
//! # Data Flow
//! ```text
//! Accept header
//!     → accept.rs (vendor media type → requested SemanticVersion)
//!     → registry.rs (group lookup, default/latest, lifecycle metadata)
//!     → matcher.rs (requested vs registered, per-group policy)
//!     → resolved SemanticVersion
//! ```
//!
//! # Design Decisions
//! - Everything here is pure, in-memory computation
//! - The registry is built during startup, frozen, then shared read-only

pub mod accept;
pub mod matcher;
pub mod registry;
pub mod semver;

pub use accept::{AcceptHeaderParser, InvalidMediaType, MediaVersion};
pub use matcher::{match_version, MatchPolicy, VersionNotSupported};
pub use registry::{GroupOptions, RegistryError, VersionEntry, VersionOptions, VersionRegistry};
pub use semver::{Identifier, ParseVersionError, SemanticVersion};
