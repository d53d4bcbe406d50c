// Differencing engine instance.
//
// Owns the two inputs and the ordered match list, and exposes the public
// operations: run a pass at one block size, swap input roles, resolve
// overlaps, and enumerate the result. Pass orchestration derives the
// unmatched ranges on both sides from the current match list, then hands
// paired range sets to the sub-pass machinery.

use log::debug;

use crate::hash::matching::sub_pass;
use crate::match_list::{Match, MatchList, NodeId, UnusedRange};
use crate::source::Source;

// ---------------------------------------------------------------------------
// Options and errors
// ---------------------------------------------------------------------------

/// Configuration for one pass.
#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Window length for checksum blocks; also the minimum forward
    /// extension a candidate must reach.
    pub block_size: usize,
    /// Lower bound on a reported match length.
    pub min_match: usize,
    /// Skip gap pairs where either side exceeds this length (local mode
    /// only). `None` scans every pair.
    pub max_hole: Option<usize>,
    /// Run one sub-pass over all gaps combined instead of one per pair.
    pub global: bool,
    /// Local mode only: require each gap pair to be bounded by the same
    /// two matches on both sides.
    pub sides_ordered: bool,
}

impl PassOptions {
    pub fn new(block_size: usize, min_match: usize) -> Self {
        Self {
            block_size,
            min_match,
            max_hole: None,
            global: false,
            sides_ordered: false,
        }
    }
}

impl Default for PassOptions {
    fn default() -> Self {
        Self::new(16, 16)
    }
}

/// What to do with overlapping target ranges during cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanPolicy {
    /// Only erase matches fully covered by their predecessor.
    KeepOverlap,
    /// Additionally truncate the predecessor so adjacent target ranges
    /// never overlap.
    RemoveOverlap,
}

/// Invalid pass configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassError {
    /// `block_size` was zero.
    ZeroBlockSize,
    /// `min_match` was zero.
    ZeroMinMatch,
}

impl std::fmt::Display for PassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBlockSize => write!(f, "block size must be non-zero"),
            Self::ZeroMinMatch => write!(f, "minimum match size must be non-zero"),
        }
    }
}

impl std::error::Error for PassError {}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// One differencing instance over a reference (side 1) and a target
/// (side 2). Distinct instances are independent; a single instance must
/// not be shared across threads.
pub struct DeltaEngine<S: Source> {
    source: S,
    target: S,
    matches: MatchList,
    /// Enumeration position: last accessed (index, node).
    cursor: Option<(usize, NodeId)>,
}

impl<S: Source> DeltaEngine<S> {
    /// Create an instance with an empty match list.
    pub fn new(source: S, target: S) -> Self {
        Self {
            source,
            target,
            matches: MatchList::new(),
            cursor: None,
        }
    }

    /// The reference input.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The target input.
    pub fn target(&self) -> &S {
        &self.target
    }

    /// Number of matches currently held.
    pub fn num_matches(&self) -> usize {
        self.matches.len()
    }

    /// Iterate matches in target order.
    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    #[cfg(test)]
    pub(crate) fn matches_mut(&mut self) -> &mut MatchList {
        &mut self.matches
    }

    /// Match at position `n` in target order.
    ///
    /// Sequential access is O(1) amortized; random access walks from the
    /// previously accessed position.
    ///
    /// # Panics
    /// Panics if `n >= num_matches()`.
    pub fn get_match(&mut self, n: usize) -> Match {
        assert!(n < self.matches.len(), "match index {n} out of range");
        let (mut idx, mut at) = match self.cursor {
            Some(c) => c,
            None => (0, self.matches.front().expect("match list is empty")),
        };
        while idx < n {
            at = self.matches.next(at).expect("walked past list tail");
            idx += 1;
        }
        while idx > n {
            at = self.matches.prev(at).expect("walked past list head");
            idx -= 1;
        }
        self.cursor = Some((idx, at));
        *self.matches.get(at)
    }

    // -----------------------------------------------------------------------
    // Pass
    // -----------------------------------------------------------------------

    /// Run one pass at `opts.block_size`, discovering matches inside the
    /// currently unmatched regions and inserting them in target order.
    pub fn pass(&mut self, opts: &PassOptions) -> Result<(), PassError> {
        if opts.block_size == 0 {
            return Err(PassError::ZeroBlockSize);
        }
        if opts.min_match == 0 {
            return Err(PassError::ZeroMinMatch);
        }
        self.cursor = None;

        // Empty matches at both ends so every hole has a match on each
        // side, including the free ranges before the first and after the
        // last real match.
        self.matches.push_front(Match::new(0, 0, 0));
        self.matches
            .push_back(Match::new(self.source.len(), self.target.len(), 0));

        let mut unused: Vec<UnusedRange> = Vec::with_capacity(self.matches.len());
        let mut unused2: Vec<UnusedRange> = Vec::with_capacity(self.matches.len());
        let mut at = self.matches.front();
        while let Some(id) = at {
            let m = *self.matches.get(id);
            unused.push(UnusedRange {
                p: m.p1,
                num: m.num,
                ml: id,
                mr: id,
            });
            unused2.push(UnusedRange {
                p: m.p2,
                num: m.num,
                ml: id,
                mr: id,
            });
            at = self.matches.next(id);
        }

        // Reference side is not in p1 order; sort it (leaving the leading
        // empty match in place). Ties put longer matches first.
        unused[1..].sort_by(|a, b| a.p.cmp(&b.p).then(b.num.cmp(&a.num)));

        get_unused_blocks(&mut unused);
        get_unused_blocks(&mut unused2);

        if opts.global {
            sub_pass(
                &self.source,
                &self.target,
                &mut self.matches,
                opts.block_size,
                opts.min_match,
                &unused,
                &unused2,
            );
        } else {
            // Pair reference gaps with target gaps through their right
            // anchors.
            {
                let list = &self.matches;
                unused[1..].sort_by(|a, b| {
                    let ma = list.get(a.mr);
                    let mb = list.get(b.mr);
                    ma.p2.cmp(&mb.p2).then(mb.num.cmp(&ma.num))
                });
            }
            for i in 1..unused.len() {
                let u1 = unused[i];
                let u2 = unused2[i];
                if u1.num < opts.block_size || u2.num < opts.block_size {
                    continue;
                }
                if let Some(cap) = opts.max_hole {
                    if u1.num > cap || u2.num > cap {
                        continue;
                    }
                }
                if opts.sides_ordered
                    && (self.matches.next(u1.ml) != Some(u1.mr)
                        || self.matches.next(u2.ml) != Some(u2.mr))
                {
                    continue;
                }
                sub_pass(
                    &self.source,
                    &self.target,
                    &mut self.matches,
                    opts.block_size,
                    opts.min_match,
                    &[u1],
                    &[u2],
                );
            }
        }

        debug!(
            "pass (block size: {}, matches: {})",
            opts.block_size,
            self.matches.len()
        );

        // Strip the end markers: the leading one may no longer be first,
        // so find it by its zero length.
        let mut at = self.matches.front();
        while let Some(id) = at {
            if self.matches.get(id).num == 0 {
                self.matches.remove(id);
                break;
            }
            at = self.matches.next(id);
        }
        self.matches.pop_back();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Swap
    // -----------------------------------------------------------------------

    /// Exchange the roles of the two inputs: every match swaps `p1 ↔ p2`
    /// and the list is re-sorted by the new target offsets.
    pub fn swap_inputs(&mut self) {
        self.cursor = None;
        std::mem::swap(&mut self.source, &mut self.target);
        let mut at = self.matches.front();
        while let Some(id) = at {
            let m = self.matches.get_mut(id);
            std::mem::swap(&mut m.p1, &mut m.p2);
            at = self.matches.next(id);
        }
        self.matches.sort_by_p2();
    }

    // -----------------------------------------------------------------------
    // Cleanup
    // -----------------------------------------------------------------------

    /// Resolve overlapping target ranges between adjacent matches.
    ///
    /// A match fully covered by its predecessor is erased under either
    /// policy; partial overlaps shorten the predecessor only under
    /// [`CleanPolicy::RemoveOverlap`].
    pub fn clean_matches(&mut self, policy: CleanPolicy) {
        self.cursor = None;
        let Some(first) = self.matches.front() else {
            return;
        };
        let mut next_l = first;
        loop {
            let l = next_l;
            let Some(r) = self.matches.next(l) else {
                break;
            };
            next_l = r;

            let lm = *self.matches.get(l);
            let rm = *self.matches.get(r);
            if lm.p2 + lm.num > rm.p2 {
                let overlap = lm.p2 + lm.num - rm.p2;
                if overlap >= rm.num {
                    self.matches.remove(r);
                    next_l = l;
                    continue;
                }
                if policy == CleanPolicy::RemoveOverlap {
                    self.matches.get_mut(l).num -= overlap;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Gap computation
// ---------------------------------------------------------------------------

/// Rewrite per-match ranges into the complementary gap ranges.
///
/// On entry `unused[i]` holds the i-th match's own range in position
/// order for its side; on return it holds the gap *before* that match,
/// anchored on the left by the previous entry's match and on the right by
/// its own. Entry 0 is left untouched. When matches overlap on this side
/// the later gap would be negative; it is clamped to zero.
fn get_unused_blocks(unused: &mut [UnusedRange]) {
    let mut next_start = 0usize;
    for i in 1..unused.len() {
        let start = next_start;
        next_start = next_start.max(unused[i].p + unused[i].num);
        let ml = unused[i - 1].mr;
        let u = &mut unused[i];
        *u = UnusedRange {
            p: start,
            num: if u.p < start { 0 } else { u.p - start },
            ml,
            mr: u.mr,
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
