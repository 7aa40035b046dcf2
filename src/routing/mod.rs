//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Registration (at startup):
//!     RouteBinding(path pattern, method, version, group, handler)
//!     → path.rs (parse pattern into literal / param segments)
//!     → table.rs (index by pattern shape, method, version)
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request (path, method)
//!     → normalize + split path
//!     → every matching pattern, most specific first
//!     → Return: candidate bindings across all versions, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Table built at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: literal segments beat parameters position by
//!   position, so registration order never changes the outcome

pub mod path;
pub mod table;

pub use path::{normalize_path, PathPattern, Segment};
pub use table::{RouteBinding, RouteCandidates, RouteLookup, RouteTable, RouteTableError};
