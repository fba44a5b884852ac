//! Split timing state machine.
//!
//! The engine owns only in-progress timing. Stored bests are read from the
//! [`RunDefinition`] passed into each split and are never written here; saving
//! goes through `orchestrator::post_process`.

mod result;

pub use result::SegmentResult;

use crate::model::RunDefinition;
use crate::timecode;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    NotStarted,
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitEngine {
    status: RunStatus,
    segment_count: usize,
    /// One record per segment already passed; its length is the split pointer.
    results: Vec<SegmentResult>,
    confirming_reset: bool,
    started_at: Option<Instant>,
    current_elapsed: Duration,
}

impl SplitEngine {
    pub fn new(segment_count: usize) -> Self {
        Self {
            status: RunStatus::NotStarted,
            segment_count,
            results: Vec::with_capacity(segment_count),
            confirming_reset: false,
            started_at: None,
            current_elapsed: Duration::ZERO,
        }
    }

    /// Drop all timing state, e.g. after the segment list changed.
    pub fn reinitialize(&mut self, segment_count: usize) {
        *self = Self::new(segment_count);
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn confirming_reset(&self) -> bool {
        self.confirming_reset
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Index of the next segment to split: -1 before the run starts, N once finished.
    pub fn split_index(&self) -> isize {
        match self.status {
            RunStatus::NotStarted => -1,
            _ => self.results.len() as isize,
        }
    }

    /// Segment currently being timed, if any.
    pub fn current_segment(&self) -> Option<usize> {
        match self.status {
            RunStatus::Running if self.results.len() < self.segment_count => {
                Some(self.results.len())
            }
            _ => None,
        }
    }

    pub fn results(&self) -> &[SegmentResult] {
        &self.results
    }

    pub fn current_elapsed(&self) -> Duration {
        self.current_elapsed
    }

    /// Refresh the running clock. Frozen while a reset is awaiting confirmation.
    pub fn tick(&mut self, now: Instant) {
        if self.status != RunStatus::Running || self.confirming_reset {
            return;
        }
        if let Some(start) = self.started_at {
            self.current_elapsed = now.saturating_duration_since(start);
        }
    }

    pub fn start(&mut self, now: Instant) -> bool {
        if self.status != RunStatus::NotStarted || self.confirming_reset {
            return false;
        }
        self.status = RunStatus::Running;
        self.started_at = Some(now);
        self.current_elapsed = Duration::ZERO;
        self.results.clear();
        tracing::info!(segments = self.segment_count, "run started");
        true
    }

    /// Record the current elapsed time against the current segment.
    pub fn split(&mut self, def: &RunDefinition) -> bool {
        let Some(index) = self.current_segment() else {
            return false;
        };
        if self.confirming_reset {
            return false;
        }

        let elapsed = self.current_elapsed;
        let segment = elapsed.saturating_sub(self.last_recorded_elapsed());
        let gold = match def.gold(index) {
            Some(best) => segment < best,
            None => true,
        };
        let delta = def
            .pb_split(index)
            .map(|pb| timecode::signed_diff(elapsed, pb));

        self.results.push(SegmentResult::Split {
            elapsed,
            segment,
            delta,
            gold,
        });
        tracing::debug!(
            index,
            elapsed = %timecode::format_display(elapsed),
            segment = %timecode::format_display(segment),
            gold,
            "split"
        );
        self.finish_if_last();
        true
    }

    /// Pass over the current segment without recording a time.
    pub fn skip(&mut self) -> bool {
        let Some(index) = self.current_segment() else {
            return false;
        };
        if self.confirming_reset {
            return false;
        }
        self.results.push(SegmentResult::Skipped);
        tracing::debug!(index, "segment skipped");
        self.finish_if_last();
        true
    }

    fn finish_if_last(&mut self) {
        if self.results.len() >= self.segment_count {
            self.status = RunStatus::Completed;
            tracing::info!(
                elapsed = %timecode::format_display(self.current_elapsed),
                "run completed"
            );
        }
    }

    fn last_recorded_elapsed(&self) -> Duration {
        self.results
            .iter()
            .rev()
            .find_map(SegmentResult::elapsed)
            .unwrap_or(Duration::ZERO)
    }

    /// Revert the most recent split or skip. Undoing out of a finished run
    /// resumes the clock from where it stopped; undoing with nothing recorded
    /// reverts the start itself.
    pub fn undo(&mut self, now: Instant) -> bool {
        if self.confirming_reset || self.status == RunStatus::NotStarted {
            return false;
        }
        if self.results.pop().is_none() {
            tracing::debug!("start undone");
            self.reinitialize(self.segment_count);
            return true;
        }
        if self.status == RunStatus::Completed {
            self.status = RunStatus::Running;
            self.started_at = Some(now.checked_sub(self.current_elapsed).unwrap_or(now));
        }
        tracing::debug!(index = self.results.len(), "split undone");
        true
    }

    /// Ask for a reset; nothing is discarded until it is confirmed.
    pub fn request_reset(&mut self) -> bool {
        if self.confirming_reset || self.status == RunStatus::NotStarted {
            return false;
        }
        self.confirming_reset = true;
        true
    }

    pub fn cancel_reset(&mut self) -> bool {
        if !self.confirming_reset {
            return false;
        }
        self.confirming_reset = false;
        true
    }

    /// Discard the attempt and return to "not started".
    pub fn confirm_reset(&mut self) -> bool {
        if !self.confirming_reset {
            return false;
        }
        tracing::info!(recorded = self.results.len(), "run reset");
        self.reinitialize(self.segment_count);
        true
    }

    /// Whether the finished attempt beats the stored personal best.
    pub fn is_personal_best(&self, def: &RunDefinition) -> bool {
        if self.status != RunStatus::Completed || self.results.len() != self.segment_count {
            return false;
        }
        let Some(finish) = self.results.last().and_then(SegmentResult::elapsed) else {
            return false;
        };
        match def.pb_finish() {
            Some(pb) => finish < pb,
            None => true,
        }
    }

    /// Last passed segment's duration compared with the same segment in the PB run.
    pub fn previous_segment_delta(&self, def: &RunDefinition) -> Option<time::Duration> {
        let index = self.results.len().checked_sub(1)?;
        let segment = self.results[index].segment()?;
        let pb_segment = def.pb_segment_time(index)?;
        Some(timecode::signed_diff(segment, pb_segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_run(n: usize) -> RunDefinition {
        let mut def = RunDefinition::new("Game", "Any%");
        for i in 1..n {
            def.insert_after(i - 1, format!("Segment {}", i + 1));
        }
        def
    }

    fn split_at(engine: &mut SplitEngine, def: &RunDefinition, t0: Instant, ms: u64) {
        engine.tick(t0 + Duration::from_millis(ms));
        assert!(engine.split(def));
    }

    #[test]
    fn full_run_completes_with_every_segment_recorded() {
        for n in 1..=5 {
            let def = blank_run(n);
            let mut engine = SplitEngine::new(n);
            let t0 = Instant::now();
            assert_eq!(engine.split_index(), -1);
            assert!(engine.start(t0));
            assert_eq!(engine.split_index(), 0);
            for i in 0..n {
                split_at(&mut engine, &def, t0, 1_000 * (i as u64 + 1));
            }
            assert_eq!(engine.status(), RunStatus::Completed);
            assert_eq!(engine.split_index(), n as isize);
            assert_eq!(engine.results().len(), n);
            assert!(engine.results().iter().all(|r| r.elapsed().is_some()));
            assert!(!engine.split(&def));
        }
    }

    #[test]
    fn first_split_without_history_is_gold_without_delta() {
        let def = blank_run(3);
        let mut engine = SplitEngine::new(3);
        let t0 = Instant::now();
        engine.start(t0);
        split_at(&mut engine, &def, t0, 10_000);
        split_at(&mut engine, &def, t0, 25_000);
        split_at(&mut engine, &def, t0, 40_000);

        let r = engine.results();
        assert!(r.iter().all(SegmentResult::is_gold));
        assert!(r.iter().all(|x| x.delta().is_none()));
        assert_eq!(r[1].segment(), Some(Duration::from_secs(15)));
        assert!(engine.is_personal_best(&def));
    }

    #[test]
    fn gold_and_delta_against_stored_bests() {
        let mut def = blank_run(2);
        def.segments[0].set_pb_split(Duration::from_secs(10));
        def.segments[0].set_gold(Duration::from_secs(9));
        def.segments[1].set_pb_split(Duration::from_secs(20));
        def.segments[1].set_gold(Duration::from_secs(8));

        let mut engine = SplitEngine::new(2);
        let t0 = Instant::now();
        engine.start(t0);
        split_at(&mut engine, &def, t0, 9_000);
        split_at(&mut engine, &def, t0, 21_000);

        let r = engine.results();
        // 9s equals the gold: not strictly faster.
        assert!(!r[0].is_gold());
        assert_eq!(r[0].delta(), Some(time::Duration::seconds(-1)));
        assert!(!r[1].is_gold());
        assert_eq!(r[1].delta(), Some(time::Duration::seconds(1)));
        assert!(!engine.is_personal_best(&def));
        assert_eq!(
            engine.previous_segment_delta(&def),
            Some(time::Duration::seconds(2))
        );
    }

    #[test]
    fn undo_clears_the_last_record_and_walks_back_to_not_started() {
        let def = blank_run(2);
        let mut engine = SplitEngine::new(2);
        let t0 = Instant::now();
        engine.start(t0);
        split_at(&mut engine, &def, t0, 5_000);
        split_at(&mut engine, &def, t0, 8_000);
        assert!(engine.is_completed());

        let now = t0 + Duration::from_secs(30);
        assert!(engine.undo(now));
        assert_eq!(engine.status(), RunStatus::Running);
        assert_eq!(engine.results().len(), 1);
        // Clock resumes from the frozen 8s rather than jumping to 30s.
        engine.tick(now + Duration::from_secs(1));
        assert_eq!(engine.current_elapsed(), Duration::from_secs(9));

        assert!(engine.undo(now));
        assert_eq!(engine.results().len(), 0);
        assert_eq!(engine.split_index(), 0);

        assert!(engine.undo(now));
        assert_eq!(engine.split_index(), -1);
        assert_eq!(engine.status(), RunStatus::NotStarted);
        assert_eq!(engine, SplitEngine::new(2));
        assert!(!engine.undo(now));
    }

    #[test]
    fn repeated_undo_from_completed_reaches_not_started() {
        for n in 1..=4 {
            let def = blank_run(n);
            let mut engine = SplitEngine::new(n);
            let t0 = Instant::now();
            engine.start(t0);
            for i in 0..n {
                split_at(&mut engine, &def, t0, 1_000 * (i as u64 + 1));
            }
            let mut undos = 0;
            while engine.undo(t0 + Duration::from_secs(60)) {
                undos += 1;
            }
            assert_eq!(undos, n + 1);
            assert_eq!(engine.split_index(), -1);
            assert_eq!(engine.status(), RunStatus::NotStarted);
        }
    }

    #[test]
    fn skip_is_never_gold_and_can_finish_the_run() {
        let def = blank_run(2);
        let mut engine = SplitEngine::new(2);
        let t0 = Instant::now();
        engine.start(t0);
        split_at(&mut engine, &def, t0, 4_000);
        engine.tick(t0 + Duration::from_secs(6));
        assert!(engine.skip());
        assert!(engine.is_completed());
        assert_eq!(engine.results()[1], SegmentResult::Skipped);
        assert!(!engine.results()[1].is_gold());
        // A finish on a skipped segment has no final time to judge.
        assert!(!engine.is_personal_best(&def));
    }

    #[test]
    fn split_after_skip_measures_from_last_recorded_split() {
        let def = blank_run(3);
        let mut engine = SplitEngine::new(3);
        let t0 = Instant::now();
        engine.start(t0);
        split_at(&mut engine, &def, t0, 4_000);
        assert!(engine.skip());
        split_at(&mut engine, &def, t0, 10_000);
        assert_eq!(engine.results()[2].segment(), Some(Duration::from_secs(6)));
    }

    #[test]
    fn reset_then_cancel_leaves_state_untouched() {
        let def = blank_run(3);
        let mut engine = SplitEngine::new(3);
        let t0 = Instant::now();
        engine.start(t0);
        split_at(&mut engine, &def, t0, 3_000);
        let before = engine.clone();

        assert!(engine.request_reset());
        engine.tick(t0 + Duration::from_secs(50));
        assert!(!engine.split(&def));
        assert!(!engine.skip());
        assert!(!engine.undo(t0));
        assert!(engine.cancel_reset());
        assert_eq!(engine, before);
    }

    #[test]
    fn start_only_from_not_started() {
        let def = blank_run(1);
        let mut engine = SplitEngine::new(1);
        let t0 = Instant::now();
        assert!(!engine.split(&def));
        assert!(!engine.skip());
        assert!(!engine.request_reset());
        assert!(engine.start(t0));
        assert!(!engine.start(t0));
        split_at(&mut engine, &def, t0, 1_000);
        assert!(!engine.start(t0));
    }

    #[test]
    fn reinitialize_resizes_and_resets() {
        let def = blank_run(2);
        let mut engine = SplitEngine::new(2);
        let t0 = Instant::now();
        engine.start(t0);
        split_at(&mut engine, &def, t0, 1_000);
        engine.reinitialize(4);
        assert_eq!(engine.segment_count(), 4);
        assert_eq!(engine.split_index(), -1);
        assert!(engine.results().is_empty());
    }
}
