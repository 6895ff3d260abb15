//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the GUI core:
//! - 2D math types and transforms
//! - Arena key types for control storage
//! - Frame timing
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod time;
pub mod logging;
