//! Credential verification for TenantGuard.
//!
//! This crate implements the replay-safe HMAC request-signing protocol and
//! resolves every supported credential kind to a principal:
//!
//! - [`canonical`]: canonical message construction
//! - [`signature`]: HMAC-SHA256 signing and constant-time verification
//! - [`nonce`] and [`replay`]: nonce storage and freshness checks
//! - [`jwt`]: the JWT verification capability and a JWKS implementation
//! - [`resolver`]: credential to principal resolution
//! - [`signer`] and [`api_key`]: client-side helpers
//!
//! # Signing
//!
//! ```
//! use tenantguard_auth::canonical::build_canonical_message;
//! use tenantguard_auth::signature::{sign, verify};
//!
//! let canonical = build_canonical_message("GET", "/api/tenant/1/secured", "1700000000000", "0123456789abcdef", b"");
//! let signature = sign(&canonical, b"shared-secret");
//! assert!(verify(&canonical, b"shared-secret", &signature).is_ok());
//! ```

pub mod api_key;
pub mod canonical;
pub mod clock;
pub mod error;
pub mod jwt;
pub mod nonce;
pub mod replay;
pub mod resolver;
pub mod signature;
pub mod signer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AuthError;
pub use jwt::{JwksVerifier, JwtError, JwtVerifier, VerifiedToken};
pub use nonce::{MemoryNonceStore, NonceCheck, NonceStore};
pub use replay::ReplayGuard;
pub use resolver::{PrincipalResolver, SigningContext};
pub use signer::{RequestSigner, SignedRequest, sign_request};
