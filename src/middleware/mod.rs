//! Cross-cutting request processing.
//!
//! The only middleware this gateway needs of its own is the authorization
//! contract; logging, compression and CORS come from `tower-http` layers
//! wired in `main`.

pub mod auth;

pub use auth::{AuthContext, MaybeAuth};
