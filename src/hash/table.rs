// Block checksum index over reference sub-ranges.
//
// A fixed-size bucket table plus one contiguous array of (hash, offset)
// entries, grouped by bucket and sorted by (hash, offset) within a bucket.
// A bucket stores the array position of its first entry (offset by one so
// zero means empty); probing walks entries linearly until the bucket index
// changes. Two trailing sentinel entries bound every walk.
//
// Hash values recurring more than `MAX_IDENTICAL_CHECKSUMS` times in the
// reference are dropped wholesale: they are degenerate sequences or too
// ambiguous to pay for the extension work they would trigger.

use super::rolling::RollingHash;
use crate::source::{Source, fetch};

/// Entries sharing a hash beyond this cap are discarded at build time.
pub const MAX_IDENTICAL_CHECKSUMS: usize = 2;

/// One indexed reference block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Rolling checksum of the block.
    pub hash: u32,
    /// Block start offset in the reference.
    pub offset: usize,
}

/// Checksum index for one sub-pass.
pub struct ChecksumIndex {
    block_size: usize,
    /// `table_size - 1`; table size is a power of two.
    mask: usize,
    /// Entry position + 1, or 0 for an empty bucket.
    buckets: Vec<u32>,
    /// Live entries followed by two sentinels.
    entries: Vec<ChecksumEntry>,
    /// Number of live entries (sentinels excluded).
    live: usize,
}

impl ChecksumIndex {
    /// Index every whole block of size `block_size` inside the given
    /// disjoint `(offset, len)` reference ranges.
    pub fn build<S: Source>(source: &S, block_size: usize, ranges: &[(usize, usize)]) -> Self {
        let total: usize = ranges.iter().map(|&(_, num)| num).sum();
        let numblocks = total / block_size;
        let table_size = numblocks.next_power_of_two().max(2);
        let mask = table_size - 1;

        let mut entries: Vec<ChecksumEntry> = Vec::with_capacity(numblocks + 2);
        let mut buf = vec![0u8; block_size];
        for &(first, num) in ranges {
            let last = first + num;
            let mut prev_hash = None;
            let mut loc = first;
            while loc + block_size <= last {
                let window = fetch(source, loc, block_size, &mut buf);
                let hash = RollingHash::new(window).value();
                // Weak dedup: consecutive identical blocks keep only their
                // first occurrence, so constant regions cost one entry.
                if prev_hash != Some(hash) {
                    entries.push(ChecksumEntry { hash, offset: loc });
                    prev_hash = Some(hash);
                }
                loc += block_size;
            }
        }

        entries.sort_by(|a, b| {
            let ba = a.hash as usize & mask;
            let bb = b.hash as usize & mask;
            ba.cmp(&bb)
                .then(a.hash.cmp(&b.hash))
                .then(a.offset.cmp(&b.offset))
        });

        // Drop whole runs of over-common hashes.
        let mut write = 0;
        let mut read = 0;
        while read < entries.len() {
            let mut ahead = read;
            while ahead < entries.len() && entries[ahead].hash == entries[read].hash {
                ahead += 1;
            }
            if ahead - read <= MAX_IDENTICAL_CHECKSUMS {
                for i in read..ahead {
                    entries[write] = entries[i];
                    write += 1;
                }
            }
            read = ahead;
        }
        entries.truncate(write);
        let live = entries.len();

        // Sentinels: the max-hash entry lands in the last bucket, the zero
        // entry in bucket 0, so a probe walk always sees a bucket change
        // before running off the end (table size is at least 2).
        entries.push(ChecksumEntry {
            hash: u32::MAX,
            offset: 0,
        });
        entries.push(ChecksumEntry { hash: 0, offset: 0 });

        let mut buckets = vec![0u32; table_size];
        for i in (0..live).rev() {
            buckets[entries[i].hash as usize & mask] = i as u32 + 1;
        }

        Self {
            block_size,
            mask,
            buckets,
            entries,
            live,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Bucket a hash value maps to.
    #[inline(always)]
    fn bucket_of(&self, hash: u32) -> usize {
        hash as usize & self.mask
    }

    /// Array position of the first entry in `bucket`, if any.
    #[inline(always)]
    fn bucket_head(&self, bucket: usize) -> Option<usize> {
        match self.buckets[bucket] {
            0 => None,
            v => Some(v as usize - 1),
        }
    }

    /// Entry at array position `i` (sentinels included).
    #[inline(always)]
    fn entry(&self, i: usize) -> ChecksumEntry {
        self.entries[i]
    }

    /// Upper bound for probe walks (live entries plus sentinels).
    #[inline(always)]
    fn walk_end(&self) -> usize {
        self.entries.len()
    }

    /// Reference offsets whose block hashes exactly to `hash`.
    pub fn candidates(&self, hash: u32) -> impl Iterator<Item = usize> + '_ {
        let bucket = self.bucket_of(hash);
        let head = self.bucket_head(bucket);
        Candidates {
            index: self,
            bucket,
            hash,
            at: head.unwrap_or(usize::MAX),
        }
    }
}

struct Candidates<'a> {
    index: &'a ChecksumIndex,
    bucket: usize,
    hash: u32,
    at: usize,
}

impl Iterator for Candidates<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.at < self.index.walk_end() {
            let entry = self.index.entry(self.at);
            if self.index.bucket_of(entry.hash) != self.bucket {
                break;
            }
            self.at += 1;
            if entry.hash == self.hash {
                return Some(entry.offset);
            }
        }
        self.at = usize::MAX;
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_block(data: &[u8]) -> u32 {
        RollingHash::new(data).value()
    }

    #[test]
    fn empty_ranges_build_empty_index() {
        let data: &[u8] = b"";
        let idx = ChecksumIndex::build(&data, 4, &[]);
        assert!(idx.is_empty());
        assert_eq!(idx.candidates(0x1234).count(), 0);
    }

    #[test]
    fn indexes_whole_blocks_only() {
        let data: &[u8] = b"ABCDEFGHIJ"; // 10 bytes, block 4 -> 2 blocks
        let idx = ChecksumIndex::build(&data, 4, &[(0, data.len())]);
        assert_eq!(idx.len(), 2);
        let h = hash_block(b"ABCD");
        assert_eq!(idx.candidates(h).collect::<Vec<_>>(), vec![0]);
        let h2 = hash_block(b"EFGH");
        assert_eq!(idx.candidates(h2).collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn respects_range_boundaries() {
        let data: &[u8] = b"ABCDABCDABCD";
        // Only the middle range is indexed.
        let idx = ChecksumIndex::build(&data, 4, &[(4, 4)]);
        assert_eq!(idx.len(), 1);
        assert_eq!(
            idx.candidates(hash_block(b"ABCD")).collect::<Vec<_>>(),
            vec![4]
        );
    }

    #[test]
    fn duplicate_hash_offsets_sorted() {
        let data: &[u8] = b"ABCDxxxxABCD";
        let idx = ChecksumIndex::build(&data, 4, &[(0, data.len())]);
        let offs: Vec<usize> = idx.candidates(hash_block(b"ABCD")).collect();
        assert_eq!(offs, vec![0, 8]);
    }

    #[test]
    fn over_common_hash_runs_are_dropped() {
        // "ABCD" recurs three times at non-adjacent offsets: the run of
        // three identical hashes exceeds the cap and is discarded entirely.
        let data: &[u8] = b"ABCDxxxxABCDyyyyABCDzzzz";
        let idx = ChecksumIndex::build(&data, 4, &[(0, data.len())]);
        assert_eq!(idx.candidates(hash_block(b"ABCD")).count(), 0);
        // The unique fillers stay indexed.
        assert_eq!(idx.candidates(hash_block(b"xxxx")).collect::<Vec<_>>(), vec![4]);
        assert_eq!(idx.candidates(hash_block(b"yyyy")).collect::<Vec<_>>(), vec![12]);
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn adjacent_identical_blocks_collapse_to_one() {
        // A constant region indexes a single entry, so the sorted-run cap
        // never sees it as over-common.
        let data = vec![0u8; 32];
        let idx = ChecksumIndex::build(&data.as_slice(), 4, &[(0, data.len())]);
        assert_eq!(idx.len(), 1);
        assert_eq!(
            idx.candidates(hash_block(&[0u8; 4])).collect::<Vec<_>>(),
            vec![0]
        );
    }

    #[test]
    fn probe_misses_cleanly() {
        let data: &[u8] = b"ABCDEFGH";
        let idx = ChecksumIndex::build(&data, 4, &[(0, data.len())]);
        // A value that hashes nothing in the reference.
        let absent = hash_block(b"zzzz");
        assert_eq!(idx.candidates(absent).count(), 0);
    }

    #[test]
    fn minimum_table_size_is_two() {
        let data: &[u8] = b"ABCD";
        let idx = ChecksumIndex::build(&data, 4, &[(0, 4)]);
        assert_eq!(idx.buckets.len(), 2);
        assert_eq!(idx.len(), 1);
    }
}
