// High-level differencing driver.
//
// Runs the standard coarse-to-fine pass schedule over a pair of inputs and
// turns the resulting match list into copy/literal segments an encoder can
// consume, plus the inverse operation for verification.

use log::debug;

use crate::engine::{CleanPolicy, DeltaEngine, PassOptions};
use crate::source::Source;

/// Configuration for [`diff_matches`].
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Finest block size the schedule descends to.
    pub min_block_size: usize,
    /// Coarsest block size the schedule starts from (capped by input size).
    pub max_block_size: usize,
    /// Truncate overlapping matches after the final pass.
    pub remove_overlap: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            min_block_size: 16,
            max_block_size: 4096,
            remove_overlap: true,
        }
    }
}

/// Compute matches between `source` and `target` with a descending
/// block-size schedule: one global pass at the coarsest size, then local
/// passes at each halved size down to `min_block_size`, and a final
/// overlap cleanup.
pub fn diff_matches<S: Source>(source: S, target: S, opts: &DiffOptions) -> DeltaEngine<S> {
    let mut engine = DeltaEngine::new(source, target);

    let min_block = opts.min_block_size.max(1);
    let max_block = opts.max_block_size.max(min_block);
    let cap = engine.source().len().min(engine.target().len());
    if cap < min_block {
        return engine;
    }

    let mut block_size = max_block.min(prev_power_of_two(cap / 2)).max(min_block);
    debug!(
        "diff: {} -> {} bytes, initial block size {}",
        engine.source().len(),
        engine.target().len(),
        block_size
    );

    let mut pass = PassOptions::new(block_size, block_size);
    pass.global = true;
    engine
        .pass(&pass)
        .expect("schedule block sizes are non-zero");

    while block_size / 2 >= min_block {
        block_size /= 2;
        let pass = PassOptions::new(block_size, block_size);
        engine
            .pass(&pass)
            .expect("schedule block sizes are non-zero");
    }

    engine.clean_matches(if opts.remove_overlap {
        CleanPolicy::RemoveOverlap
    } else {
        CleanPolicy::KeepOverlap
    });
    engine
}

fn prev_power_of_two(n: usize) -> usize {
    if n == 0 {
        1
    } else {
        1 << (usize::BITS - 1 - n.leading_zeros())
    }
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One piece of the target expressed against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// `target[p2..p2+num]` equals `reference[p1..p1+num]`.
    Copy { p1: usize, p2: usize, num: usize },
    /// `target[p2..p2+num]` has no counterpart and must be carried
    /// literally.
    Literal { p2: usize, num: usize },
}

/// Express the whole target as copy/literal segments in target order.
///
/// Matches whose target range overlaps already-covered bytes are clipped
/// to their uncovered suffix (and dropped when nothing remains), so a
/// list kept with [`CleanPolicy::KeepOverlap`] works too. After a
/// [`CleanPolicy::RemoveOverlap`] cleanup the segments mirror the match
/// list verbatim.
pub fn segments<S: Source>(engine: &DeltaEngine<S>) -> Vec<Segment> {
    let target_len = engine.target().len();
    let mut out = Vec::with_capacity(engine.num_matches() * 2 + 1);
    let mut covered = 0usize;

    for m in engine.matches() {
        let end = m.p2 + m.num;
        if end <= covered {
            continue;
        }
        if m.p2 > covered {
            out.push(Segment::Literal {
                p2: covered,
                num: m.p2 - covered,
            });
        }
        let skip = covered.saturating_sub(m.p2);
        out.push(Segment::Copy {
            p1: m.p1 + skip,
            p2: m.p2 + skip,
            num: m.num - skip,
        });
        covered = end;
    }

    if covered < target_len {
        out.push(Segment::Literal {
            p2: covered,
            num: target_len - covered,
        });
    }
    out
}

/// Rebuild the target from the reference plus the literal bytes the
/// segments name. The result must equal the original target byte for
/// byte; this is the round-trip check an encoder relies on.
pub fn reconstruct<S: Source>(source: &S, target: &S, segments: &[Segment]) -> Vec<u8> {
    let mut out = Vec::with_capacity(target.len());
    let mut buf = Vec::new();
    for seg in segments {
        let (side, offset, num) = match *seg {
            Segment::Copy { p1, num, .. } => (source, p1, num),
            Segment::Literal { p2, num } => (target, p2, num),
        };
        if let Some(direct) = side.as_slice(offset, num) {
            out.extend_from_slice(direct);
        } else {
            buf.resize(num, 0);
            let n = side.get_bytes(offset, &mut buf);
            out.extend_from_slice(&buf[..n]);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
