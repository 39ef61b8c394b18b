//! # Blogicum Core
//!
//! The domain layer of the blog.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, the visibility rules that decide which posts a viewer may see,
//! pagination, and the ports implemented by `blogicum-infra`.

pub mod domain;
pub mod error;
pub mod pagination;
pub mod policy;
pub mod ports;
pub mod visibility;

pub use error::DomainError;
pub use pagination::{Page, PageRequest, PageWindow};
pub use policy::{OwnershipDecision, OwnershipPolicy};
pub use visibility::{FeedQuery, FeedScope, Viewer, Visibility};
