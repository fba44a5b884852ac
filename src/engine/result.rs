use std::time::Duration;

/// What happened to one segment during the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentResult {
    /// Passed over without a time; never gold and never written to history.
    Skipped,
    Split {
        /// Time from run start to this split.
        elapsed: Duration,
        /// Time since the previous recorded split (or run start).
        segment: Duration,
        /// `elapsed` minus the stored PB split; `None` without a PB on record.
        delta: Option<time::Duration>,
        gold: bool,
    },
}

impl SegmentResult {
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            SegmentResult::Split { elapsed, .. } => Some(*elapsed),
            SegmentResult::Skipped => None,
        }
    }

    pub fn segment(&self) -> Option<Duration> {
        match self {
            SegmentResult::Split { segment, .. } => Some(*segment),
            SegmentResult::Skipped => None,
        }
    }

    pub fn delta(&self) -> Option<time::Duration> {
        match self {
            SegmentResult::Split { delta, .. } => *delta,
            SegmentResult::Skipped => None,
        }
    }

    pub fn is_gold(&self) -> bool {
        matches!(self, SegmentResult::Split { gold: true, .. })
    }
}
