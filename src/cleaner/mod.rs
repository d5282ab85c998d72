//! Marker removal: block segmentation, sanitizing, replacement, batch runs.

pub mod batch;
pub mod blocks;
pub mod replace;
pub mod sanitizer;
