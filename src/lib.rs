//! # Archivgut Backend Library
//!
//! REST API gateway for archive management on top of a hosted Supabase
//! backend. Every data operation is delegated to the backend's HTTP surface
//! (GoTrue auth, PostgREST, Storage); this service holds no authoritative
//! state of its own.
//!
//! ## Architecture
//!
//! The application is built using:
//! - **Axum**: HTTP server, routing and middleware layering
//! - **Reqwest**: client towards the Supabase backend
//! - **Tokio**: async runtime
//! - **Serde**: JSON request/response handling
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (embedded defaults, TOML, env)
//! - [`error`]: error taxonomy and HTTP error responses
//! - [`middleware`]: the authorization contract (token → identity → role)
//! - [`routes`]: HTTP endpoint handlers and router assembly
//! - [`state`]: shared application state (backend handle + config)
//! - [`supabase`]: typed backend client adapter
//! - [`types`]: data transfer objects and shared type definitions

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod supabase;
pub mod types;

#[cfg(test)]
mod tests;
