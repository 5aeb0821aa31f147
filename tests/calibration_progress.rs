//! Calibration-fragment completeness is monotonic under any insertion order
//! or duplication (§8).

use proptest::prelude::*;
use sonde_decode::calibration::FragmentAssembler;

proptest! {
    #[test]
    fn percent_complete_never_decreases(
        total_fragments in 1usize..32,
        seqs in prop::collection::vec(0usize..40, 0..80),
    ) {
        let fragment_size = 4;
        let mut asm = FragmentAssembler::new(total_fragments, fragment_size);
        let mut last = 0.0f32;

        for seq in seqs {
            asm.insert(seq, &[1, 2, 3, 4]);
            let now = asm.percent_complete();
            prop_assert!(now >= last, "regressed from {} to {}", last, now);
            last = now;
        }

        prop_assert!(asm.percent_complete() <= 100.0);
        if asm.is_complete() {
            prop_assert_eq!(asm.percent_complete(), 100.0);
        }
    }
}
