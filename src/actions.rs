//! Key bindings and per-state action availability.
//!
//! Availability is derived from the engine on every call; nothing here is
//! cached between transitions.

use crate::engine::{RunStatus, SplitEngine};
use serde::{Deserialize, Serialize};

/// Actions a key can be bound to in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundAction {
    /// Starts the run, or splits once it is running.
    Split,
    Reset,
    Undo,
    Quit,
    Confirm,
    SaveReset,
    Cancel,
    Skip,
    Edit,
}

/// A concrete transition, after resolving combined bindings against the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Split,
    Skip,
    Undo,
    Reset,
    Confirm,
    SaveAndReset,
    Cancel,
    Edit,
    Quit,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Start,
        Action::Split,
        Action::Skip,
        Action::Undo,
        Action::Reset,
        Action::Confirm,
        Action::SaveAndReset,
        Action::Cancel,
        Action::Edit,
        Action::Quit,
    ];
}

impl BoundAction {
    pub fn resolve(self, engine: &SplitEngine) -> Action {
        match self {
            BoundAction::Split if engine.status() == RunStatus::NotStarted => Action::Start,
            BoundAction::Split => Action::Split,
            BoundAction::Reset => Action::Reset,
            BoundAction::Undo => Action::Undo,
            BoundAction::Quit => Action::Quit,
            BoundAction::Confirm => Action::Confirm,
            BoundAction::SaveReset => Action::SaveAndReset,
            BoundAction::Cancel => Action::Cancel,
            BoundAction::Skip => Action::Skip,
            BoundAction::Edit => Action::Edit,
        }
    }
}

/// Whether `action` may be taken in the engine's current state.
pub fn is_permitted(engine: &SplitEngine, action: Action) -> bool {
    if engine.confirming_reset() {
        return matches!(
            action,
            Action::Confirm | Action::SaveAndReset | Action::Cancel
        );
    }

    let status = engine.status();
    let pointer = engine.results().len();
    match action {
        Action::Start | Action::Edit => status == RunStatus::NotStarted,
        Action::Split => status == RunStatus::Running,
        Action::Undo => status != RunStatus::NotStarted,
        Action::Skip => status == RunStatus::Running && pointer < engine.segment_count(),
        Action::Reset => status != RunStatus::NotStarted,
        Action::Confirm | Action::SaveAndReset | Action::Cancel => false,
        Action::Quit => true,
    }
}

pub fn permitted_actions(engine: &SplitEngine) -> Vec<Action> {
    Action::ALL
        .into_iter()
        .filter(|a| is_permitted(engine, *a))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotkey {
    pub key: String,
    pub action: BoundAction,
    #[serde(default)]
    pub description: String,
}

impl Hotkey {
    fn new(key: &str, action: BoundAction, description: &str) -> Self {
        Self {
            key: key.to_string(),
            action,
            description: description.to_string(),
        }
    }
}

pub fn default_hotkeys() -> Vec<Hotkey> {
    vec![
        Hotkey::new("space", BoundAction::Split, "Start/Split"),
        Hotkey::new("r", BoundAction::Reset, "Reset"),
        Hotkey::new("z", BoundAction::Undo, "Undo Split"),
        Hotkey::new("k", BoundAction::Skip, "Skip Split"),
        Hotkey::new("e", BoundAction::Edit, "Edit Splits"),
        Hotkey::new("q", BoundAction::Quit, "Quit"),
        Hotkey::new("y", BoundAction::Confirm, "Confirm"),
        Hotkey::new("s", BoundAction::SaveReset, "Save and Reset"),
        Hotkey::new("n", BoundAction::Cancel, "Cancel"),
        Hotkey::new("esc", BoundAction::Cancel, "Cancel"),
    ]
}

/// Normalise a raw key identifier to the form used in bindings.
fn normalize_key(key: &str) -> String {
    match key {
        " " => "space".to_string(),
        "escape" | "Esc" => "esc".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ActionMap {
    hotkeys: Vec<Hotkey>,
}

impl Default for ActionMap {
    fn default() -> Self {
        Self::new(default_hotkeys())
    }
}

impl ActionMap {
    pub fn new(hotkeys: Vec<Hotkey>) -> Self {
        Self { hotkeys }
    }

    /// Action for a key press, if the key is bound and its action is permitted now.
    pub fn resolve(&self, key: &str, engine: &SplitEngine) -> Option<Action> {
        let key = normalize_key(key);
        self.hotkeys
            .iter()
            .filter(|hk| hk.key == key)
            .map(|hk| hk.action.resolve(engine))
            .find(|action| is_permitted(engine, *action))
    }

    /// Permitted bindings as `keys: label` pairs, e.g. `n/esc: Cancel`.
    pub fn controls_line(&self, engine: &SplitEngine) -> String {
        let mut groups: Vec<(BoundAction, &str, Vec<&str>)> = Vec::new();
        for hk in &self.hotkeys {
            if !is_permitted(engine, hk.action.resolve(engine)) {
                continue;
            }
            match groups.iter_mut().find(|(action, _, _)| *action == hk.action) {
                Some((_, _, keys)) => keys.push(hk.key.as_str()),
                None => groups.push((hk.action, hk.description.as_str(), vec![hk.key.as_str()])),
            }
        }

        groups
            .into_iter()
            .map(|(_, description, mut keys)| {
                keys.sort_unstable();
                keys.dedup();
                format!("{}: {}", keys.join("/"), description)
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunDefinition;
    use std::time::{Duration, Instant};

    fn started(n: usize) -> (SplitEngine, RunDefinition, Instant) {
        let mut def = RunDefinition::new("Game", "Any%");
        for i in 1..n {
            def.insert_after(i - 1, format!("S{i}"));
        }
        let mut engine = SplitEngine::new(n);
        let t0 = Instant::now();
        engine.start(t0);
        (engine, def, t0)
    }

    #[test]
    fn not_started_permits_start_edit_and_quit() {
        let engine = SplitEngine::new(2);
        assert_eq!(
            permitted_actions(&engine),
            [Action::Start, Action::Edit, Action::Quit]
        );
    }

    #[test]
    fn running_without_splits_can_undo_the_start() {
        let (engine, _, _) = started(2);
        assert_eq!(
            permitted_actions(&engine),
            [
                Action::Split,
                Action::Skip,
                Action::Undo,
                Action::Reset,
                Action::Quit
            ]
        );
    }

    #[test]
    fn completed_permits_undo_and_reset_only() {
        let (mut engine, def, t0) = started(1);
        engine.tick(t0 + Duration::from_secs(1));
        engine.split(&def);
        assert_eq!(
            permitted_actions(&engine),
            [Action::Undo, Action::Reset, Action::Quit]
        );
    }

    #[test]
    fn confirming_reset_overrides_everything() {
        let (mut engine, _, _) = started(2);
        engine.request_reset();
        assert_eq!(
            permitted_actions(&engine),
            [Action::Confirm, Action::SaveAndReset, Action::Cancel]
        );
    }

    #[test]
    fn split_key_resolves_by_state() {
        let map = ActionMap::default();
        let fresh = SplitEngine::new(2);
        assert_eq!(map.resolve(" ", &fresh), Some(Action::Start));
        assert_eq!(map.resolve("z", &fresh), None);
        assert_eq!(map.resolve("x", &fresh), None);

        let (engine, _, _) = started(2);
        assert_eq!(map.resolve("space", &engine), Some(Action::Split));
        assert_eq!(map.resolve("k", &engine), Some(Action::Skip));
        assert_eq!(map.resolve("e", &engine), None);
    }

    #[test]
    fn controls_line_groups_keys_per_action() {
        let map = ActionMap::default();
        let (mut engine, _, _) = started(2);
        engine.request_reset();
        assert_eq!(
            map.controls_line(&engine),
            "y: Confirm  s: Save and Reset  esc/n: Cancel"
        );

        let fresh = SplitEngine::new(2);
        assert_eq!(
            map.controls_line(&fresh),
            "space: Start/Split  e: Edit Splits  q: Quit"
        );
    }
}
