//! Protected handler trait.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::GuardError;
use crate::response::GuardResponseBody;
use crate::guard::Admitted;

/// A request that passed the guard, handed to the protected handler.
#[derive(Debug)]
pub struct GuardedRequest {
    /// Request head.
    pub parts: http::request::Parts,
    /// Request body, exactly as received.
    pub body: Bytes,
    /// Principal and tenant the guard admitted.
    pub admitted: Admitted,
}

/// Boxed future returned by [`ProtectedHandler::handle`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<GuardResponseBody>, GuardError>> + Send>>;

/// Business logic behind the guard.
///
/// The handler only ever sees requests with an explicit allow decision.
pub trait ProtectedHandler: Send + Sync + 'static {
    /// Check that this handler serves the request's method and path.
    ///
    /// Runs before the guard, so unknown routes never touch credentials or
    /// consume a nonce. The default accepts everything.
    ///
    /// # Errors
    ///
    /// Typically [`GuardError::NotFound`] or [`GuardError::MethodNotAllowed`].
    fn route(&self, _parts: &http::request::Parts) -> Result<(), GuardError> {
        Ok(())
    }

    /// Handle an admitted request.
    fn handle(&self, request: GuardedRequest) -> HandlerFuture;
}
