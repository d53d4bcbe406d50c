use blockdelta::diff::{self, DiffOptions};
use blockdelta::engine::{CleanPolicy, DeltaEngine, PassOptions};
use proptest::prelude::*;

fn diff_engine<'a>(source: &'a [u8], target: &'a [u8]) -> DeltaEngine<&'a [u8]> {
    diff::diff_matches(source, target, &DiffOptions::default())
}

proptest! {
    #[test]
    fn prop_reconstruction_roundtrip(
        source in proptest::collection::vec(any::<u8>(), 0..4096),
        target in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let engine = diff_engine(&source, &target);
        let segments = diff::segments(&engine);
        let rebuilt = diff::reconstruct(engine.source(), engine.target(), &segments);
        prop_assert_eq!(rebuilt, target);
    }

    #[test]
    fn prop_roundtrip_with_overlaps_kept(
        source in proptest::collection::vec(any::<u8>(), 0..2048),
        edits in proptest::collection::vec((0usize..2048, any::<u8>()), 0..8),
    ) {
        // A target derived from the source makes partial overlaps likely
        // across pass granularities; segments must clip them.
        let mut target = source.clone();
        for (pos, byte) in edits {
            if !target.is_empty() {
                let len = target.len();
                target[pos % len] = byte;
            }
        }
        let opts = DiffOptions { remove_overlap: false, ..Default::default() };
        let engine = diff::diff_matches(source.as_slice(), target.as_slice(), &opts);
        let segments = diff::segments(&engine);
        let rebuilt = diff::reconstruct(engine.source(), engine.target(), &segments);
        prop_assert_eq!(rebuilt, target);
    }

    #[test]
    fn prop_matches_hold_byte_for_byte(
        source in proptest::collection::vec(any::<u8>(), 0..2048),
        target in proptest::collection::vec(any::<u8>(), 0..2048),
        block_size in 2usize..64,
    ) {
        let mut engine = DeltaEngine::new(source.as_slice(), target.as_slice());
        engine.pass(&PassOptions::new(block_size, block_size)).unwrap();
        for m in engine.matches() {
            prop_assert_eq!(
                &source[m.p1..m.p1 + m.num],
                &target[m.p2..m.p2 + m.num]
            );
            prop_assert!(m.num >= block_size);
        }
    }

    #[test]
    fn prop_clean_removes_all_overlap(
        source in proptest::collection::vec(any::<u8>(), 0..2048),
        edits in proptest::collection::vec((0usize..2048, any::<u8>()), 0..8),
    ) {
        // Derive the target from the source so matches actually occur and
        // overlaps have a chance to arise across pass granularities.
        let mut target = source.clone();
        for (pos, byte) in edits {
            if !target.is_empty() {
                let len = target.len();
                target[pos % len] = byte;
            }
        }

        let mut engine = DeltaEngine::new(source.as_slice(), target.as_slice());
        for block_size in [64usize, 16, 4] {
            engine.pass(&PassOptions::new(block_size, block_size)).unwrap();
        }
        engine.clean_matches(CleanPolicy::RemoveOverlap);

        let all: Vec<_> = engine.matches().copied().collect();
        prop_assert_eq!(engine.num_matches(), all.len());
        for w in all.windows(2) {
            prop_assert!(w[0].p2 < w[1].p2, "not strictly p2-sorted");
            prop_assert!(w[0].p2 + w[0].num <= w[1].p2, "target overlap survived");
        }
    }

    #[test]
    fn prop_swap_is_involution(
        source in proptest::collection::vec(any::<u8>(), 0..1024),
        target in proptest::collection::vec(any::<u8>(), 0..1024),
    ) {
        let mut engine = DeltaEngine::new(source.as_slice(), target.as_slice());
        engine.pass(&PassOptions::new(8, 8)).unwrap();

        let spans = |e: &DeltaEngine<&[u8]>| {
            let mut v: Vec<(usize, usize, usize)> = e
                .matches()
                .map(|m| (m.p1.min(m.p2), m.p1.max(m.p2), m.num))
                .collect();
            v.sort_unstable();
            v
        };

        let before = spans(&engine);
        engine.swap_inputs();
        prop_assert_eq!(spans(&engine), before.clone());
        engine.swap_inputs();
        prop_assert_eq!(spans(&engine), before);
    }

    #[test]
    fn prop_identical_inputs_fully_covered(
        data in proptest::collection::vec(any::<u8>(), 64..2048),
    ) {
        let engine = diff_engine(&data, &data);
        let covered: usize = diff::segments(&engine)
            .iter()
            .map(|s| match s {
                diff::Segment::Copy { num, .. } => *num,
                diff::Segment::Literal { .. } => 0,
            })
            .sum();
        // Random data has no over-common blocks, so the whole target is
        // matched rather than carried literally.
        prop_assert_eq!(covered, data.len());
    }
}
