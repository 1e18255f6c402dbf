//! Annotation generation, merging and roll-up flags.
//!
//! Generated (HITL) annotations and historical annotations from the
//! annotation service end up in one collection. Nothing is de-duplicated:
//! overlapping intervals simply combine in the roll-up, where the most severe
//! flag covering a sample wins.

use chrono::{DateTime, Utc};

use crate::domain::{Annotation, AnnotationOrigin, FailureBlock, QcFlag, ReferenceDesignator};
use crate::error::{QcError, QcResult};

/// Source note attached to generated annotations.
pub const HITL_SOURCE: &str = "qartod-limits automated quality checks";

/// Turn failure blocks into fail annotations.
///
/// `parameters` is copied onto every annotation; pass an empty slice to flag
/// all parameters of the instrument.
pub fn create_annotations(
    designator: &ReferenceDesignator,
    blocks: &[FailureBlock],
    times: &[DateTime<Utc>],
    parameters: &[u32],
) -> QcResult<Vec<Annotation>> {
    blocks
        .iter()
        .map(|block| {
            let (Some(&begin), Some(&end)) = (times.get(block.start), times.get(block.end)) else {
                return Err(QcError::invalid_input(format!(
                    "block [{}, {}] is outside the {} timestamps",
                    block.start,
                    block.end,
                    times.len()
                )));
            };
            Ok(Annotation {
                id: None,
                subsite: designator.site.clone(),
                node: Some(designator.node.clone()),
                sensor: Some(designator.sensor.clone()),
                method: None,
                stream: None,
                parameters: parameters.to_vec(),
                begin,
                end: Some(end),
                exclusion_flag: false,
                qc_flag: QcFlag::Fail,
                source: HITL_SOURCE.to_string(),
                annotation: format!(
                    "Data marked as fail by the automated quality checks ({} samples). \
                     Generated for human-in-the-loop review.",
                    block.span()
                ),
                origin: AnnotationOrigin::Generated,
            })
        })
        .collect()
}

/// Concatenate historical and generated annotations, historical first.
pub fn merge_annotations(historical: Vec<Annotation>, generated: Vec<Annotation>) -> Vec<Annotation> {
    let mut merged = historical;
    merged.extend(generated);
    merged
}

/// Keep the annotations that target `designator`.
pub fn for_designator(annotations: Vec<Annotation>, designator: &ReferenceDesignator) -> Vec<Annotation> {
    annotations.into_iter().filter(|a| a.targets(designator)).collect()
}

/// Most severe annotation flag covering each timestamp.
///
/// `times` must be sorted ascending. `parameter_ids` are the annotation ids of
/// one parameter; only annotations that apply to it are considered. An empty
/// slice rolls up every annotation.
pub fn rollup_flags(
    annotations: &[Annotation],
    times: &[DateTime<Utc>],
    parameter_ids: &[u32],
) -> Vec<QcFlag> {
    let mut flags = vec![QcFlag::Pass; times.len()];

    for anno in annotations.iter().filter(|a| a.applies_to(parameter_ids)) {
        let lo = times.partition_point(|t| *t < anno.begin);
        let hi = match anno.end {
            Some(end) => times.partition_point(|t| *t <= end),
            None => times.len(),
        };
        if lo >= hi {
            continue;
        }
        for flag in &mut flags[lo..hi] {
            *flag = (*flag).max(anno.qc_flag);
        }
    }

    flags
}

/// Samples to drop: raw flag fail or roll-up flag fail.
pub fn exclusion_mask(raw: Option<&[QcFlag]>, rollup: &[QcFlag]) -> Vec<bool> {
    rollup
        .iter()
        .enumerate()
        .map(|(i, &r)| {
            let raw_fail = raw.and_then(|f| f.get(i)).is_some_and(|&f| f == QcFlag::Fail);
            raw_fail || r == QcFlag::Fail
        })
        .collect()
}
