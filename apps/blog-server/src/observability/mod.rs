//! Observability module - request IDs threaded through tracing spans.

mod request_id;

pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdMiddleware};
