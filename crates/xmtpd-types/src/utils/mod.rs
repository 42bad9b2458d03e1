//! Utility functions for hex string handling.

pub mod formatting;

pub use formatting::{truncate_id, with_0x_prefix, without_0x_prefix};
