//! Version negotiation and handler dispatch.
//!
//! Registration happens once at startup through [`RouteRegistrar`]; the
//! frozen result is a [`ServiceSnapshot`] served by the [`Dispatcher`].

pub mod builder;
pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod rejection;
pub mod snapshot;

pub use builder::{registry_from_config, RegistrationError, RouteRegistrar};
pub use context::{
    Deprecation, DispatchOutcome, DispatchRecord, RequestVersionContext, DEPRECATION, SUNSET,
    X_API_VERSION,
};
pub use dispatcher::Dispatcher;
pub use handler::{handler_fn, BoxedHandler, HandlerFuture, VersionedHandler};
pub use rejection::{Rejection, RejectionKind};
pub use snapshot::ServiceSnapshot;
