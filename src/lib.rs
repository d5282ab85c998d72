#![forbid(unsafe_code)]

//! Scene Vaccine Sweeper (svs): removes "vaccine" script-node blocks from
//! Maya ASCII (`.ma`) scene files.
//!
//! Pipeline per file:
//! 1. **Segmenter** splits the scene into header + continuation blocks
//! 2. **Sanitizer** writes every block without the marker to a temp file
//! 3. **Replacement** swaps the result in place (optionally keeping a `.bkp`)
//!    or drops it next to the original as `.clean`
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use scene_vaccine_sweeper::prelude::*;
//!
//! let config = Config::default();
//! let sink = StderrSink::default();
//! let walker = DirectoryWalker::new(WalkerConfig::from_settings(&config.walker)?);
//! let report = BatchCleaner::new(&config, &sink).sweep(&walker, std::path::Path::new("scenes"))?;
//! println!("{} cleaned, {} failed", report.cleaned_count(), report.failed_count());
//! # Ok::<(), SvsError>(())
//! ```

pub mod prelude;

pub mod cleaner;
pub mod core;
pub mod logger;
pub mod scanner;
