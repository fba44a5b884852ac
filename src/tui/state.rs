use crate::model::{RunDefinition, NEW_SEGMENT_NAME};
use crate::orchestrator::{SegmentEdit, Session};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub struct UiState {
    pub view: View,
    pub info: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            view: View::Timer,
            info: String::new(),
        }
    }
}

pub enum View {
    Timer,
    Editor(EditorState),
}

/// What the editor wants the loop to do after a key.
#[derive(Debug, PartialEq, Eq)]
pub enum EditorOutcome {
    Continue,
    Closed(&'static str),
    SaveFailed(String),
}

pub struct EditorState {
    pub selected: usize,
    /// Text being typed while renaming the selected segment.
    pub input: Option<String>,
    /// Definition as it was when the editor opened; restored on cancel.
    snapshot: RunDefinition,
}

impl EditorState {
    pub fn new(definition: &RunDefinition) -> Self {
        Self {
            selected: 0,
            input: None,
            snapshot: definition.clone(),
        }
    }

    pub fn handle_key(&mut self, session: &mut Session, key: KeyEvent) -> EditorOutcome {
        if let Some(input) = self.input.as_mut() {
            match key.code {
                KeyCode::Enter => {
                    let name = std::mem::take(input);
                    session.edit(SegmentEdit::Rename(self.selected, name));
                    self.input = None;
                }
                KeyCode::Esc => self.input = None,
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            }
            return EditorOutcome::Continue;
        }

        let last = session.definition().segment_count().saturating_sub(1);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Esc => {
                session.replace_definition(self.snapshot.clone());
                return EditorOutcome::Closed("Edits discarded");
            }
            KeyCode::Enter => {
                return match session.save_definition() {
                    Ok(()) => EditorOutcome::Closed("Splits saved"),
                    Err(e) => EditorOutcome::SaveFailed(format!("Save failed: {e:#}")),
                };
            }
            KeyCode::Up if shift => self.move_up(session),
            KeyCode::Down if shift => self.move_down(session),
            KeyCode::Char('K') => self.move_up(session),
            KeyCode::Char('J') => self.move_down(session),
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.selected = (self.selected + 1).min(last),
            KeyCode::Char('r') => {
                if let Some(segment) = session.definition().segments.get(self.selected) {
                    self.input = Some(segment.name.clone());
                }
            }
            KeyCode::Char('a') => {
                if session.edit(SegmentEdit::InsertAfter(self.selected, NEW_SEGMENT_NAME.into())) {
                    self.selected += 1;
                }
            }
            KeyCode::Char('d') => {
                if session.edit(SegmentEdit::Remove(self.selected)) {
                    let last = session.definition().segment_count().saturating_sub(1);
                    self.selected = self.selected.min(last);
                }
            }
            _ => {}
        }
        EditorOutcome::Continue
    }

    fn move_up(&mut self, session: &mut Session) {
        if session.edit(SegmentEdit::MoveUp(self.selected)) {
            self.selected -= 1;
        }
    }

    fn move_down(&mut self, session: &mut Session) {
        if session.edit(SegmentEdit::MoveDown(self.selected)) {
            self.selected += 1;
        }
    }
}
