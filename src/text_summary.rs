//! Text summary builder for `--summary` output.
//!
//! Formats the stored bests of a run file as plain lines.

use crate::model::{RunDefinition, Segment};
use crate::timecode::{self, format_display};
use std::time::Duration;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn or_dash(d: Option<Duration>) -> String {
    d.map(format_display).unwrap_or_else(|| "-".to_string())
}

/// Mean of the recorded segment times. Unreadable entries are left out.
fn average(segment: &Segment) -> Option<Duration> {
    let times: Vec<Duration> = segment
        .segment_history
        .iter()
        .map(|h| timecode::parse(&h.time))
        .filter(|d| !d.is_zero())
        .collect();
    if times.is_empty() {
        return None;
    }
    Some(times.iter().sum::<Duration>() / times.len() as u32)
}

pub(crate) fn build_text_summary(def: &RunDefinition) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("{} - {}", def.game_name, def.category_name));
    lines.push(format!("Attempts: {}", def.attempt_count));

    let name_width = def
        .segments
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Segment".len());
    lines.push(format!(
        "{:<name_width$}  {:>12}  {:>12}  {:>12}  {:>7}",
        "Segment", "PB split", "Best", "Average", "History"
    ));
    for segment in &def.segments {
        lines.push(format!(
            "{:<name_width$}  {:>12}  {:>12}  {:>12}  {:>7}",
            segment.name,
            or_dash(segment.pb_split()),
            or_dash(segment.gold()),
            or_dash(average(segment)),
            segment.segment_history.len()
        ));
    }

    lines.push(format!("Personal best: {}", or_dash(def.pb_finish())));
    lines.push(format!("Sum of best: {}", or_dash(def.sum_of_best())));

    TextSummary { lines }
}
