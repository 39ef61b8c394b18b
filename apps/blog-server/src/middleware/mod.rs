//! Middleware and request extractors.

pub mod auth;
pub mod client_ctx;
pub mod csrf;
pub mod error;

pub use client_ctx::ClientCtx;
