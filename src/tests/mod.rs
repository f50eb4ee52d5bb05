//! Integration tests for the Archivgut gateway.
//!
//! The Supabase backend is mocked with `wiremock`; the full router is
//! driven through `tower::ServiceExt::oneshot`, so every test exercises the
//! real middleware chain.

mod api_tests;
mod config_tests;
