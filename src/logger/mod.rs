//! Activity logging: injected sinks with an append-only JSONL backend.

pub mod jsonl;
pub mod sink;
