//! Failure-run ("block") identification.
//!
//! A block starts at the first failing sample, absorbs short passing gaps
//! (`<= max_gap`) between failing runs, and closes at the first longer gap or at
//! the end of the series. Blocks shorter than `min_duration` samples are noise
//! and are dropped.
//!
//! With `stride > 1` only every `stride`-th sample is evaluated. Gaps are then
//! counted in evaluated samples, while block indices and `min_duration` stay in
//! original sample units.

use crate::domain::{BlockParams, FailureBlock};
use crate::error::{QcError, QcResult};

/// Scan a pass/fail signal (`true` = fail) and return merged failure blocks.
pub fn identify_blocks(fail: &[bool], params: BlockParams) -> QcResult<Vec<FailureBlock>> {
    if params.stride == 0 {
        return Err(QcError::invalid_input("block stride must be >= 1"));
    }
    let stride = params.stride;

    let mut blocks = Vec::new();
    let mut open: Option<FailureBlock> = None;

    for idx in (0..fail.len()).step_by(stride) {
        if !fail[idx] {
            continue;
        }
        open = match open {
            Some(block) if (idx - block.end) / stride - 1 <= params.max_gap => Some(FailureBlock {
                start: block.start,
                end: idx,
            }),
            Some(block) => {
                push_if_long(&mut blocks, block, params.min_duration);
                Some(FailureBlock { start: idx, end: idx })
            }
            None => Some(FailureBlock { start: idx, end: idx }),
        };
    }

    if let Some(block) = open {
        push_if_long(&mut blocks, block, params.min_duration);
    }

    Ok(blocks)
}

fn push_if_long(blocks: &mut Vec<FailureBlock>, block: FailureBlock, min_duration: usize) {
    if block.span() >= min_duration {
        blocks.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(pattern: &[(bool, usize)]) -> Vec<bool> {
        pattern
            .iter()
            .flat_map(|&(v, n)| std::iter::repeat_n(v, n))
            .collect()
    }

    #[test]
    fn short_runs_merge_across_single_gap() {
        let fail = signal(&[
            (false, 5),
            (true, 3),
            (false, 1),
            (true, 3),
            (false, 2),
            (true, 70),
            (false, 1),
        ]);
        assert_eq!(fail.len(), 85);

        let blocks = identify_blocks(&fail, BlockParams::new(1, 5)).unwrap();
        assert_eq!(
            blocks,
            vec![
                FailureBlock { start: 5, end: 11 },
                FailureBlock { start: 14, end: 83 },
            ]
        );
    }

    #[test]
    fn isolated_noise_is_dropped() {
        let fail = signal(&[(false, 10), (true, 1), (false, 10), (true, 2), (false, 10)]);
        let blocks = identify_blocks(&fail, BlockParams::new(1, 5)).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn empty_and_all_pass_inputs_yield_nothing() {
        assert!(identify_blocks(&[], BlockParams::default()).unwrap().is_empty());
        assert!(
            identify_blocks(&[false; 50], BlockParams::new(0, 1))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn block_at_end_of_series_is_closed() {
        let fail = signal(&[(false, 3), (true, 6)]);
        let blocks = identify_blocks(&fail, BlockParams::new(0, 6)).unwrap();
        assert_eq!(blocks, vec![FailureBlock { start: 3, end: 8 }]);
    }

    #[test]
    fn stride_scales_indices_back_to_original_samples() {
        let fail = signal(&[(false, 20), (true, 80), (false, 20)]);
        let blocks = identify_blocks(&fail, BlockParams::new(0, 50).with_stride(10)).unwrap();
        assert_eq!(blocks, vec![FailureBlock { start: 20, end: 90 }]);
        assert!(blocks[0].end < fail.len());
    }

    #[test]
    fn zero_stride_is_rejected() {
        let err = identify_blocks(&[true], BlockParams::new(0, 1).with_stride(0)).unwrap_err();
        assert!(matches!(err, QcError::InvalidInput { .. }));
    }

    #[test]
    fn blocks_are_ordered_and_disjoint() {
        let fail: Vec<bool> = (0..500).map(|i| (i / 7) % 3 == 0).collect();
        let blocks = identify_blocks(&fail, BlockParams::new(2, 3)).unwrap();
        for pair in blocks.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
        for b in &blocks {
            assert!(b.end >= b.start && b.end < fail.len());
        }
    }
}
