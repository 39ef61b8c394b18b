//! Uploaded media storage.

mod local;

pub use local::LocalMediaStore;
