//! Candidate discovery: walks directory trees for `.ma` scene files.

pub mod walker;
