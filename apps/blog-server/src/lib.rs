//! # Blogicum server
//!
//! Server-rendered multi-user blog: public feeds, post pages with comments,
//! author profiles and the forms to write all of it.
//!
//! The binary in `main.rs` only wires configuration and telemetry; everything
//! else lives here so integration tests can build the same `App`.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod state;
pub mod telemetry;
pub mod views;
