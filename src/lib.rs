//! Blockdelta: a binary differencing match engine.
//!
//! Given a reference and a target byte sequence, the engine computes the
//! list of maximal `(p1, p2, num)` matches such that
//! `reference[p1..p1+num] == target[p2..p2+num]`, ordered by target
//! offset. The match list is the compressed representation of the target
//! relative to the reference; emitting a concrete patch container from it
//! is left to the caller.
//!
//! Matching runs in passes: each pass slides a rolling block checksum over
//! the still-unmatched target regions, probes an index built over the
//! still-unmatched reference regions, and extends candidate hits byte by
//! byte across the whole inputs. Callers typically run several passes with
//! decreasing block sizes — coarse passes find the strong matches cheaply,
//! finer passes fill in the gaps.
//!
//! The crate provides:
//! - The pass engine and its instance type (`engine`)
//! - A coarse-to-fine driver plus segment/reconstruction helpers (`diff`)
//! - Rolling checksums and the per-pass block index (`hash`)
//! - Random-access input abstraction (`source`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use blockdelta::diff::{self, DiffOptions};
//!
//! let reference = b"The quick brown fox jumps over the lazy dog".repeat(4);
//! let mut target = reference.clone();
//! target.extend_from_slice(b" -- and then some");
//!
//! let engine = diff::diff_matches(reference.as_slice(), target.as_slice(),
//!                                 &DiffOptions::default());
//! let segments = diff::segments(&engine);
//! let rebuilt = diff::reconstruct(engine.source(), engine.target(), &segments);
//! assert_eq!(rebuilt, target);
//! ```

pub mod diff;
pub mod engine;
pub mod hash;
pub mod io;
pub mod match_list;
pub mod source;

#[cfg(feature = "cli")]
pub mod cli;

pub use engine::{CleanPolicy, DeltaEngine, PassError, PassOptions};
pub use match_list::Match;
pub use source::{FnSource, Source};
