//! Post-attempt processing.
//!
//! Folds an attempt's results into a copy of the run definition and writes it.
//! The caller swaps the copy in only after the write succeeded.

use crate::engine::{SegmentResult, SplitEngine};
use crate::model::{Attempt, RunDefinition};
use crate::storage;
use crate::timecode;
use anyhow::{Context, Result};
use std::path::Path;
use time::macros::format_description;
use time::OffsetDateTime;

/// Definition after the attempt was merged, ready to replace the live one.
#[derive(Debug)]
pub(crate) struct MergedRun {
    pub definition: RunDefinition,
    pub attempt_id: u32,
    pub personal_best: bool,
    pub golds: usize,
}

fn format_timestamp(at: OffsetDateTime) -> Result<String> {
    let fmt = format_description!("[month]/[day]/[year] [hour]:[minute]:[second]");
    at.format(&fmt).context("format attempt timestamp")
}

/// Merge the engine's recorded splits into a copy of `def`.
///
/// Skipped and unreached segments keep their stored values untouched.
pub(crate) fn merge_attempt(
    def: &RunDefinition,
    engine: &SplitEngine,
    started: OffsetDateTime,
    ended: OffsetDateTime,
) -> Result<MergedRun> {
    let mut merged = def.clone();
    let attempt_id = def.next_attempt_id();
    let personal_best = engine.is_personal_best(def);

    // Only a run that reached its last split has a final time.
    let final_time = engine
        .is_completed()
        .then(|| engine.results().last().and_then(SegmentResult::elapsed))
        .flatten()
        .map(timecode::format_persisted)
        .unwrap_or_default();
    merged.attempt_history.push(Attempt {
        id: attempt_id,
        started: format_timestamp(started)?,
        is_started_synced: true,
        ended: format_timestamp(ended)?,
        is_ended_synced: true,
        real_time: final_time,
        game_time: String::new(),
        pause_time: String::new(),
    });
    merged.attempt_count = def.attempt_count + 1;

    let mut golds = 0;
    for (segment, result) in merged.segments.iter_mut().zip(engine.results()) {
        let SegmentResult::Split {
            elapsed,
            segment: duration,
            gold,
            ..
        } = *result
        else {
            continue;
        };
        if elapsed.is_zero() {
            continue;
        }

        segment.push_history(attempt_id, duration);
        if gold {
            segment.set_gold(duration);
            golds += 1;
        }
        if personal_best {
            segment.set_pb_split(elapsed);
        }
    }

    Ok(MergedRun {
        definition: merged,
        attempt_id,
        personal_best,
        golds,
    })
}

/// Merge and write the attempt. Nothing is mutated when the write fails.
pub(crate) fn save_attempt(
    path: &Path,
    def: &RunDefinition,
    engine: &SplitEngine,
    started: OffsetDateTime,
    ended: OffsetDateTime,
) -> Result<MergedRun> {
    let merged = merge_attempt(def, engine, started, ended)?;
    storage::save_run(path, &merged.definition)?;
    tracing::info!(
        attempt = merged.attempt_id,
        personal_best = merged.personal_best,
        golds = merged.golds,
        "attempt saved"
    );
    Ok(merged)
}
