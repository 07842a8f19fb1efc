//! HTTP binding for TenantGuard.
//!
//! This crate wires the credential resolver and the authorization engine into
//! an HTTP request pipeline:
//!
//! - **Credentials**: derives one credential from request headers
//! - **Guard**: extract, resolve, authorize; errors short-circuit
//! - **Handler trait**: business logic that only sees admitted requests
//! - **Service**: hyper `Service` collecting the body and running the guard
//! - **Response helpers**: `{"error": ...}` JSON responses

pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod guard;
pub mod response;
pub mod service;

pub use dispatch::{GuardedRequest, HandlerFuture, ProtectedHandler};
pub use error::GuardError;
pub use guard::{Admitted, Guard};
pub use response::GuardResponseBody;
pub use service::{GuardHttpConfig, GuardHttpService};
