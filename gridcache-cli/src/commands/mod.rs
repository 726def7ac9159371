//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`gridset`] - Build a grid set and print its levels
//! - [`locate`] - Print the cache path of a tile
//! - [`quota`] - Scan the cache and enforce disk quotas

pub mod common;
pub mod gridset;
pub mod locate;
pub mod quota;
