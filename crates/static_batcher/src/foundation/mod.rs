//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the batcher:
//! - Math types and operations
//! - Handle types for scene resources
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
