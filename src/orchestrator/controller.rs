//! Session controller.
//!
//! Single owner of the run definition and the engine. Every key press and tick
//! funnels through here one at a time, so no transition can observe a
//! definition that is halfway through a save.

use super::post_process::save_attempt;
use crate::actions::{is_permitted, permitted_actions, Action, ActionMap};
use crate::engine::SplitEngine;
use crate::model::RunDefinition;
use crate::storage;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::OffsetDateTime;

/// What the host loop should do after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Key not bound, or its action is not permitted right now.
    Ignored,
    Applied(Action),
    Saved { attempt_id: u32, personal_best: bool },
    EnterEdit,
    Quit,
}

/// Structural change to the segment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SegmentEdit {
    InsertAfter(usize, String),
    Remove(usize),
    Rename(usize, String),
    MoveUp(usize),
    MoveDown(usize),
}

fn wall_clock_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub(crate) struct Session {
    path: PathBuf,
    definition: RunDefinition,
    engine: SplitEngine,
    actions: ActionMap,
    attempt_started: Option<OffsetDateTime>,
}

impl Session {
    pub fn new(path: PathBuf, definition: RunDefinition, actions: ActionMap) -> Self {
        let engine = SplitEngine::new(definition.segment_count());
        Self {
            path,
            definition,
            engine,
            actions,
            attempt_started: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn definition(&self) -> &RunDefinition {
        &self.definition
    }

    pub fn engine(&self) -> &SplitEngine {
        &self.engine
    }

    pub fn actions(&self) -> &ActionMap {
        &self.actions
    }

    pub fn tick(&mut self, now: Instant) {
        self.engine.tick(now);
    }

    pub fn handle_key(&mut self, key: &str, now: Instant) -> Result<Outcome> {
        self.engine.tick(now);
        match self.actions.resolve(key, &self.engine) {
            Some(action) => self.apply(action, now),
            None => Ok(Outcome::Ignored),
        }
    }

    /// Apply one action. A failed save returns the error and changes nothing.
    pub fn apply(&mut self, action: Action, now: Instant) -> Result<Outcome> {
        if !is_permitted(&self.engine, action) {
            tracing::debug!(
                ?action,
                permitted = ?permitted_actions(&self.engine),
                "action not permitted"
            );
            return Ok(Outcome::Ignored);
        }

        let applied = match action {
            Action::Start => {
                self.attempt_started = Some(wall_clock_now());
                self.engine.start(now)
            }
            Action::Split => self.engine.split(&self.definition),
            Action::Skip => self.engine.skip(),
            Action::Undo => {
                let undone = self.engine.undo(now);
                if self.engine.split_index() < 0 {
                    self.attempt_started = None;
                }
                undone
            }
            Action::Reset => self.engine.request_reset(),
            Action::Cancel => self.engine.cancel_reset(),
            Action::Confirm => {
                self.attempt_started = None;
                self.engine.confirm_reset()
            }
            Action::SaveAndReset => return self.save_and_reset(),
            Action::Edit => return Ok(Outcome::EnterEdit),
            Action::Quit => return Ok(Outcome::Quit),
        };

        Ok(if applied {
            Outcome::Applied(action)
        } else {
            Outcome::Ignored
        })
    }

    fn save_and_reset(&mut self) -> Result<Outcome> {
        let ended = wall_clock_now();
        let started = self.attempt_started.unwrap_or(ended);
        let merged = save_attempt(&self.path, &self.definition, &self.engine, started, ended)?;

        self.definition = merged.definition;
        self.attempt_started = None;
        self.engine.confirm_reset();
        Ok(Outcome::Saved {
            attempt_id: merged.attempt_id,
            personal_best: merged.personal_best,
        })
    }

    /// Apply a structural edit. Any change resets the engine for the new segment list.
    pub fn edit(&mut self, edit: SegmentEdit) -> bool {
        let def = &mut self.definition;
        let changed = match &edit {
            SegmentEdit::InsertAfter(index, name) => def.insert_after(*index, name.clone()),
            SegmentEdit::Remove(index) => def.remove(*index),
            SegmentEdit::Rename(index, name) => def.rename(*index, name.clone()),
            SegmentEdit::MoveUp(index) => def.move_up(*index),
            SegmentEdit::MoveDown(index) => def.move_down(*index),
        };
        if changed {
            tracing::debug!(?edit, segments = def.segment_count(), "segments edited");
            self.reset_engine();
        }
        changed
    }

    /// Swap in another definition, e.g. to discard edits.
    pub fn replace_definition(&mut self, definition: RunDefinition) {
        self.definition = definition;
        self.reset_engine();
    }

    /// Write the definition as it stands, without recording an attempt.
    pub fn save_definition(&self) -> Result<()> {
        storage::save_run(&self.path, &self.definition)
    }

    fn reset_engine(&mut self) {
        self.attempt_started = None;
        self.engine.reinitialize(self.definition.segment_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunStatus;
    use std::time::Duration;

    fn session_with(n: usize) -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.json");
        let mut def = storage::create_run(&path).expect("create");
        for i in 1..n {
            def.insert_after(i - 1, format!("S{}", i + 1));
        }
        storage::save_run(&path, &def).expect("save");
        (dir, Session::new(path, def, ActionMap::default()))
    }

    fn press(session: &mut Session, key: &str, at: Instant) -> Outcome {
        session.handle_key(key, at).expect("key")
    }

    #[test]
    fn three_split_run_saves_a_pb() {
        let (_dir, mut s) = session_with(3);
        let t0 = Instant::now();
        assert_eq!(press(&mut s, "space", t0), Outcome::Applied(Action::Start));
        for secs in [10, 25, 40] {
            assert_eq!(
                press(&mut s, "space", t0 + Duration::from_secs(secs)),
                Outcome::Applied(Action::Split)
            );
        }
        assert!(s.engine().is_completed());
        assert!(s.engine().results().iter().all(|r| r.is_gold()));

        assert_eq!(press(&mut s, "r", t0), Outcome::Applied(Action::Reset));
        let outcome = press(&mut s, "s", t0);
        assert_eq!(
            outcome,
            Outcome::Saved {
                attempt_id: 1,
                personal_best: true
            }
        );
        assert_eq!(s.engine().split_index(), -1);

        let on_disk = storage::load_run(s.path()).expect("reload");
        assert_eq!(&on_disk, s.definition());
        assert_eq!(on_disk.attempt_count, 1);
        assert_eq!(on_disk.attempt_history.len(), 1);
        assert_eq!(on_disk.pb_split(0), Some(Duration::from_secs(10)));
        assert_eq!(on_disk.pb_split(1), Some(Duration::from_secs(25)));
        assert_eq!(on_disk.pb_split(2), Some(Duration::from_secs(40)));
    }

    #[test]
    fn save_and_reset_mid_run_keeps_only_recorded_splits() {
        let (_dir, mut s) = session_with(3);
        let t0 = Instant::now();
        press(&mut s, "space", t0);
        press(&mut s, "space", t0 + Duration::from_secs(7));
        press(&mut s, "r", t0 + Duration::from_secs(9));
        press(&mut s, "s", t0 + Duration::from_secs(9));

        let def = s.definition();
        assert_eq!(def.segments[0].segment_history.len(), 1);
        assert!(def.segments[1].segment_history.is_empty());
        assert!(def.segments[2].segment_history.is_empty());
        assert_eq!(def.pb_finish(), None);
        assert_eq!(s.engine().status(), RunStatus::NotStarted);
    }

    #[test]
    fn reset_cancel_restores_exact_state() {
        let (_dir, mut s) = session_with(2);
        let t0 = Instant::now();
        press(&mut s, "space", t0);
        press(&mut s, "space", t0 + Duration::from_secs(3));
        s.tick(t0 + Duration::from_secs(4));
        let before = s.engine().clone();

        assert_eq!(press(&mut s, "r", t0 + Duration::from_secs(4)), Outcome::Applied(Action::Reset));
        assert_eq!(press(&mut s, "space", t0 + Duration::from_secs(5)), Outcome::Ignored);
        assert_eq!(press(&mut s, "esc", t0 + Duration::from_secs(6)), Outcome::Applied(Action::Cancel));
        assert_eq!(s.engine(), &before);
    }

    #[test]
    fn confirm_discards_without_writing() {
        let (_dir, mut s) = session_with(2);
        let on_disk = std::fs::read_to_string(s.path()).expect("read");
        let t0 = Instant::now();
        press(&mut s, "space", t0);
        press(&mut s, "space", t0 + Duration::from_secs(3));
        press(&mut s, "r", t0);
        assert_eq!(press(&mut s, "y", t0), Outcome::Applied(Action::Confirm));
        assert_eq!(s.engine().split_index(), -1);
        assert_eq!(std::fs::read_to_string(s.path()).expect("read"), on_disk);
    }

    #[test]
    fn failed_save_keeps_engine_confirming() {
        let (dir, mut s) = session_with(1);
        let t0 = Instant::now();
        press(&mut s, "space", t0);
        press(&mut s, "space", t0 + Duration::from_secs(2));
        press(&mut s, "r", t0);
        let before_def = s.definition().clone();
        let before_engine = s.engine().clone();

        // Make the target unwritable by replacing the directory.
        drop(dir);
        assert!(s.handle_key("s", t0).is_err());
        assert_eq!(s.definition(), &before_def);
        assert_eq!(s.engine(), &before_engine);
        assert!(s.engine().confirming_reset());
    }

    #[test]
    fn edits_reinitialize_the_engine() {
        let (_dir, mut s) = session_with(2);
        let t0 = Instant::now();
        press(&mut s, "space", t0);
        assert!(s.edit(SegmentEdit::InsertAfter(1, "Third".into())));
        assert_eq!(s.engine().segment_count(), 3);
        assert_eq!(s.engine().split_index(), -1);

        assert!(!s.edit(SegmentEdit::Remove(9)));
        assert!(s.edit(SegmentEdit::MoveUp(2)));
        assert_eq!(s.definition().segments[1].name, "Third");
        assert!(s.edit(SegmentEdit::Rename(0, "First".into())));
        assert!(s.edit(SegmentEdit::Remove(2)));
        assert!(s.edit(SegmentEdit::MoveDown(0)));
        let names: Vec<&str> = s.definition().segments.iter().map(|x| x.name.as_str()).collect();
        assert_eq!(names, ["Third", "First"]);
    }

    #[test]
    fn edit_and_quit_keys() {
        let (_dir, mut s) = session_with(1);
        let t0 = Instant::now();
        assert_eq!(press(&mut s, "e", t0), Outcome::EnterEdit);
        assert_eq!(press(&mut s, "q", t0), Outcome::Quit);
        press(&mut s, "space", t0);
        assert_eq!(press(&mut s, "e", t0), Outcome::Ignored);
    }

    #[test]
    fn undo_key_walks_back_past_the_start() {
        let (_dir, mut s) = session_with(2);
        let t0 = Instant::now();
        press(&mut s, "space", t0);
        press(&mut s, "space", t0 + Duration::from_secs(3));
        assert_eq!(
            press(&mut s, "z", t0 + Duration::from_secs(4)),
            Outcome::Applied(Action::Undo)
        );
        assert_eq!(s.engine().split_index(), 0);
        assert_eq!(
            press(&mut s, "z", t0 + Duration::from_secs(5)),
            Outcome::Applied(Action::Undo)
        );
        assert_eq!(s.engine().status(), RunStatus::NotStarted);
        assert!(s.attempt_started.is_none());
        assert_eq!(press(&mut s, "z", t0 + Duration::from_secs(6)), Outcome::Ignored);
        assert_eq!(press(&mut s, "e", t0 + Duration::from_secs(6)), Outcome::EnterEdit);
    }
}
