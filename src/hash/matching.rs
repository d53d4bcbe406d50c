// Match discovery inside a pair of unmatched ranges.
//
// One sub-pass owns a checksum index built over the reference ranges and
// slides a rolling hash across each paired target range. Index hits are
// extended byte-wise across the *entire* inputs (not just the gap), scored
// with a locality weight, and committed into the global match list at the
// gap's right anchor.
//
// Commits are deferred by up to a block: the first viable candidate in a
// window schedules the commit one block ahead so that overlapping window
// positions can still propose a longer or more local match.

use log::trace;

use super::rolling::{RollingHash, match_buf_backward, match_buf_forward};
use super::table::ChecksumIndex;
use crate::match_list::{Match, MatchList, NodeId, UnusedRange};
use crate::source::{Source, fetch, fetch_into};

/// Batch size for extender reads.
const SCAN_BUFFER_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// Extender
// ---------------------------------------------------------------------------

/// Extend a candidate run rightward from `(p1, p2)` until a byte mismatch
/// or either input's end, reading both sides in batches.
fn match_forward<S: Source>(
    source: &S,
    target: &S,
    buf1: &mut [u8],
    buf2: &mut [u8],
    mut p1: usize,
    mut p2: usize,
) -> usize {
    let mut num = 0;
    loop {
        let numtoread = (source.len() - p1)
            .min(target.len() - p2)
            .min(SCAN_BUFFER_SIZE);
        if numtoread == 0 {
            break;
        }
        let r1 = fetch(source, p1, numtoread, buf1);
        let r2 = fetch(target, p2, numtoread, buf2);
        p1 += numtoread;
        p2 += numtoread;
        let matched = match_buf_forward(r1, r2, numtoread);
        num += matched;
        if matched < numtoread {
            break;
        }
    }
    num
}

/// Extend a run leftward from `(p1, p2)`, never past offset 0 on either
/// side and never by more than `cap` bytes total.
fn match_backward<S: Source>(
    source: &S,
    target: &S,
    buf1: &mut [u8],
    buf2: &mut [u8],
    mut p1: usize,
    mut p2: usize,
    cap: usize,
) -> usize {
    let mut num = 0;
    let mut remaining = cap;
    loop {
        let numtoread = p1.min(p2).min(remaining).min(SCAN_BUFFER_SIZE);
        if numtoread == 0 {
            break;
        }
        p1 -= numtoread;
        p2 -= numtoread;
        let r1 = fetch(source, p1, numtoread, buf1);
        let r2 = fetch(target, p2, numtoread, buf2);
        let matched = match_buf_backward(r1, r2, numtoread);
        num += matched;
        remaining -= numtoread;
        if matched < numtoread {
            break;
        }
    }
    num
}

// ---------------------------------------------------------------------------
// Rolling scan
// ---------------------------------------------------------------------------

/// Scratch state for one sub-pass over paired range sets.
struct SubPass<'a, S: Source> {
    source: &'a S,
    target: &'a S,
    index: ChecksumIndex,
    min_match: usize,
    // Extender read batches, one per side.
    buf1: Vec<u8>,
    buf2: Vec<u8>,
    // Rolling-window double buffer over the target.
    outgoing: Vec<u8>,
    incoming: Vec<u8>,
}

impl<'a, S: Source> SubPass<'a, S> {
    fn new(source: &'a S, target: &'a S, index: ChecksumIndex, min_match: usize) -> Self {
        let block_size = index.block_size();
        Self {
            source,
            target,
            index,
            min_match,
            buf1: vec![0u8; SCAN_BUFFER_SIZE],
            buf2: vec![0u8; SCAN_BUFFER_SIZE],
            outgoing: vec![0u8; block_size],
            incoming: vec![0u8; block_size],
        }
    }

    fn fill_incoming(&mut self, offset: usize, len: usize) {
        fetch_into(self.target, offset, len, &mut self.incoming);
    }

    /// Slide a rolling hash over `target[start..end)`, committing matches
    /// into `matches` near `iter_place`. `place` is the reference position
    /// the locality score pulls toward, initially the paired reference
    /// gap's start.
    fn find_matches(
        &mut self,
        matches: &mut MatchList,
        start: usize,
        end: usize,
        mut place: usize,
        iter_place: NodeId,
    ) {
        let block_size = self.index.block_size();

        let mut best = Match::new(0, 0, 0);
        let mut process_matches_pos = 0usize;

        self.fill_incoming(start, block_size);
        let mut hash = RollingHash::new(&self.incoming[..block_size]);
        let mut buf_loc = block_size;

        let mut j = start + block_size;
        loop {
            let p2 = j - block_size;
            for p1 in self.index.candidates(hash.value()) {
                let fnum = match_forward(
                    self.source,
                    self.target,
                    &mut self.buf1,
                    &mut self.buf2,
                    p1,
                    p2,
                );
                if fnum < block_size {
                    continue;
                }
                let bnum = match_backward(
                    self.source,
                    self.target,
                    &mut self.buf1,
                    &mut self.buf2,
                    p1,
                    p2,
                    block_size,
                );
                let num = fnum + bnum;
                if num < self.min_match {
                    continue;
                }
                let p1 = p1 - bnum;
                let p2 = p2 - bnum;

                let found_better = if best.num != 0 {
                    let old_value =
                        best.num as f64 / (place.abs_diff(best.p1) + block_size * 2) as f64;
                    let new_value = num as f64 / (place.abs_diff(p1) + block_size * 2) as f64;
                    new_value > old_value
                } else {
                    // Give nearby window positions a chance to beat this
                    // candidate before it is committed.
                    process_matches_pos = (j + block_size - 1).min(end);
                    true
                };
                if found_better {
                    best = Match::new(p1, p2, num);
                }
            }

            if best.num != 0 && j >= process_matches_pos {
                trace!(
                    "commit ({}, {}, {}) at window {}",
                    best.p1, best.p2, best.num, j
                );
                matches.insert_near(best, iter_place);
                place = best.p1 + best.num;
                let match_end = best.p2 + best.num;
                if match_end > j {
                    if match_end >= end {
                        j = end;
                    } else {
                        // Fast forward over the matched area.
                        j = match_end - block_size;
                        self.fill_incoming(j, block_size);
                        hash = RollingHash::new(&self.incoming[..block_size]);
                        buf_loc = block_size;
                        j += block_size;
                    }
                }
                best.num = 0;
            }

            if buf_loc == block_size {
                buf_loc = 0;
                std::mem::swap(&mut self.outgoing, &mut self.incoming);
                let n = (end - j).min(block_size);
                self.fill_incoming(j, n);
            }

            if j >= end {
                break;
            }

            hash.advance(self.outgoing[buf_loc], self.incoming[buf_loc]);
            buf_loc += 1;
            j += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-pass driver
// ---------------------------------------------------------------------------

/// Run one sub-pass: index the reference ranges in `unused`, then scan each
/// target range in `unused2` whose length reaches a whole block. Ranges are
/// paired by position; `unused[i].p` seeds the locality anchor for target
/// range `i`, and matches land at `unused2[i].mr`.
pub(crate) fn sub_pass<S: Source>(
    source: &S,
    target: &S,
    matches: &mut MatchList,
    block_size: usize,
    min_match: usize,
    unused: &[UnusedRange],
    unused2: &[UnusedRange],
) {
    let ranges: Vec<(usize, usize)> = unused.iter().map(|u| (u.p, u.num)).collect();
    let index = ChecksumIndex::build(source, block_size, &ranges);
    trace!(
        "sub-pass: {} reference blocks indexed at block size {}",
        index.len(),
        block_size
    );

    let mut sp = SubPass::new(source, target, index, min_match);
    for (u1, u2) in unused.iter().zip(unused2) {
        if u2.num >= block_size {
            sp.find_matches(matches, u2.p, u2.p + u2.num, u1.p, u2.mr);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
