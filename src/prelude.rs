//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use scene_vaccine_sweeper::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SvsError};

// Cleaner
pub use crate::cleaner::batch::{BatchCleaner, BatchReport, FileFailure, FileOutcome};
pub use crate::cleaner::blocks::{Block, BlockReader, segment_bytes};
pub use crate::cleaner::replace::{ReplaceOptions, place_clean_copy, replace};
pub use crate::cleaner::sanitizer::{MARKER, SanitizeOutcome, Sanitizer, SanitizerOptions, sanitize};

// Logger
pub use crate::logger::sink::{
    ActivityEvent, ActivitySink, FanoutSink, JsonlSink, MemorySink, NullSink, StderrSink,
};

// Scanner
pub use crate::scanner::walker::{DirectoryWalker, WalkerConfig};
