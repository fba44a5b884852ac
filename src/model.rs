use crate::timecode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name given to segments created by the editor.
pub const NEW_SEGMENT_NAME: &str = "New Split";

/// A run file: the ordered segments and everything recorded about past attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDefinition {
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub attempt_history: Vec<Attempt>,
    pub segments: Vec<Segment>,
    /// Timer start offset, kept as written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    /// Raw `<Metadata>` content of a LiveSplit file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// `version` attribute of a LiveSplit `<Run>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,
    /// Auto-splitter configuration owned by other tools; never interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_splitter_settings: Option<String>,
    /// Top-level keys this program does not know about, written back as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: u32,
    /// `MM/DD/YYYY HH:MM:SS`
    pub started: String,
    #[serde(default)]
    pub is_started_synced: bool,
    pub ended: String,
    #[serde(default)]
    pub is_ended_synced: bool,
    /// Final time of a finished attempt.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub real_time: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub game_time: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pause_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    /// Cumulative time at the end of this segment in the personal-best run.
    #[serde(default)]
    pub pb_split_time: String,
    /// Fastest isolated duration ever recorded for this segment.
    #[serde(default)]
    pub best_segment_time: String,
    #[serde(default)]
    pub segment_history: Vec<HistoryEntry>,
    /// Game-time counterparts, carried along for other timers.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pb_game_time: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub best_segment_game_time: String,
    /// Named comparisons other than the personal best.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comparisons: Vec<ComparisonTime>,
}

/// Isolated segment duration recorded by one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub time: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub game_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTime {
    pub name: String,
    #[serde(default)]
    pub real_time: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub game_time: String,
}

/// Read a stored duration. Empty, malformed and zero values all mean
/// "nothing on record".
fn stored_time(raw: &str, field: &str, segment: &str) -> Option<Duration> {
    if raw.trim().is_empty() {
        return None;
    }
    match timecode::try_parse(raw) {
        Some(d) if d.is_zero() => None,
        Some(d) => Some(d),
        None => {
            tracing::warn!(segment, field, value = raw, "ignoring malformed stored time");
            None
        }
    }
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: String::new(),
            pb_split_time: String::new(),
            best_segment_time: String::new(),
            segment_history: Vec::new(),
            pb_game_time: String::new(),
            best_segment_game_time: String::new(),
            comparisons: Vec::new(),
        }
    }

    pub fn pb_split(&self) -> Option<Duration> {
        stored_time(&self.pb_split_time, "pb_split_time", &self.name)
    }

    pub fn gold(&self) -> Option<Duration> {
        stored_time(&self.best_segment_time, "best_segment_time", &self.name)
    }

    /// Record a new PB split. The stale game time goes with the old value.
    pub fn set_pb_split(&mut self, elapsed: Duration) {
        self.pb_split_time = timecode::format_persisted(elapsed);
        self.pb_game_time.clear();
    }

    pub fn set_gold(&mut self, segment: Duration) {
        self.best_segment_time = timecode::format_persisted(segment);
        self.best_segment_game_time.clear();
    }

    pub fn push_history(&mut self, attempt_id: u32, segment: Duration) {
        self.segment_history.push(HistoryEntry {
            id: i64::from(attempt_id),
            time: timecode::format_persisted(segment),
            game_time: String::new(),
        });
    }
}

impl RunDefinition {
    /// A fresh run with a single segment, as written by `--new`.
    pub fn new(game_name: impl Into<String>, category_name: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            category_name: category_name.into(),
            attempt_count: 0,
            attempt_history: Vec::new(),
            segments: vec![Segment::new(NEW_SEGMENT_NAME)],
            offset: None,
            metadata: None,
            format_version: None,
            auto_splitter_settings: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Identifier for the next attempt record. Never collides with a recorded id.
    pub fn next_attempt_id(&self) -> u32 {
        let highest = self
            .attempt_history
            .iter()
            .map(|a| a.id)
            .max()
            .unwrap_or(0);
        self.attempt_count.max(highest) + 1
    }

    /// PB split of segment `index`, cumulative from run start.
    pub fn pb_split(&self, index: usize) -> Option<Duration> {
        self.segments.get(index).and_then(Segment::pb_split)
    }

    /// Duration of segment `index` within the PB run.
    pub fn pb_segment_time(&self, index: usize) -> Option<Duration> {
        let end = self.pb_split(index)?;
        if index == 0 {
            return Some(end);
        }
        let start = self.pb_split(index - 1)?;
        end.checked_sub(start)
    }

    pub fn gold(&self, index: usize) -> Option<Duration> {
        self.segments.get(index).and_then(Segment::gold)
    }

    /// Final time of the personal best, if one is recorded.
    pub fn pb_finish(&self) -> Option<Duration> {
        self.segments.last().and_then(Segment::pb_split)
    }

    /// Sum of every recorded gold. `None` when no segment has one.
    pub fn sum_of_best(&self) -> Option<Duration> {
        let golds: Vec<Duration> = self.segments.iter().filter_map(Segment::gold).collect();
        if golds.is_empty() {
            None
        } else {
            Some(golds.into_iter().sum())
        }
    }

    pub fn insert_after(&mut self, index: usize, name: impl Into<String>) -> bool {
        if index >= self.segments.len() {
            return false;
        }
        self.segments.insert(index + 1, Segment::new(name));
        true
    }

    /// Remove a segment. The last remaining segment cannot be removed.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.segments.len() <= 1 || index >= self.segments.len() {
            return false;
        }
        self.segments.remove(index);
        true
    }

    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.segments.get_mut(index) {
            Some(segment) => {
                segment.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.segments.len() {
            return false;
        }
        self.segments.swap(index - 1, index);
        true
    }

    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.segments.len() {
            return false;
        }
        self.segments.swap(index, index + 1);
        true
    }
}
