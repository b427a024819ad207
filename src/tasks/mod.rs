//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache
//! instance.
//!
//! # Tasks
//! - Janitor: removes stale cache entries at the window interval

mod cleanup;

pub use cleanup::Janitor;
