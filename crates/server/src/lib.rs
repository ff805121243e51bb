//! HTTP surface for the SESAME session manager.
//!
//! Each endpoint maps 1:1 to one session-manager operation; the manager is
//! constructed once at startup and injected into the router as shared
//! state. Everything stateful lives in `sesame-core`.

pub mod config;
pub mod envelope;
pub mod logging;
pub mod routes;
