//! Collaborator abstractions for feeds and ETA consumers.

pub mod traits;

pub use traits::{EtaSink, FeedSource};
