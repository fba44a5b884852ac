mod help;
mod splits;
mod state;

use crate::actions::Action;
use crate::cli::StartView;
use crate::config::Component;
use crate::orchestrator::{Outcome, Session};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use state::{EditorOutcome, EditorState, UiState, View};
use std::{io, time::Duration, time::Instant};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub fn run(
    mut session: Session,
    layout: &[Component],
    tick_rate: Duration,
    start_view: StartView,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend).context("create terminal") {
        Ok(t) => t,
        Err(e) => {
            disable_raw_mode().ok();
            execute!(io::stdout(), LeaveAlternateScreen).ok();
            return Err(e);
        }
    };
    terminal.clear().ok();

    let mut state = UiState::default();
    if start_view == StartView::Editor {
        state.view = View::Editor(EditorState::new(session.definition()));
    }

    let res = event_loop(&mut terminal, &mut session, &mut state, layout, tick_rate);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    res
}

fn event_loop(
    terminal: &mut Term,
    session: &mut Session,
    state: &mut UiState,
    layout: &[Component],
    tick_rate: Duration,
) -> Result<()> {
    loop {
        session.tick(Instant::now());
        terminal
            .draw(|f| {
                let area = f.area();
                match &state.view {
                    View::Timer => splits::draw_timer_view(f, area, session, layout, &state.info),
                    View::Editor(editor) => {
                        help::draw_editor(f, area, session.definition(), editor, &state.info)
                    }
                }
            })
            .context("draw frame")?;

        if !event::poll(tick_rate).unwrap_or(false) {
            continue;
        }
        let Ok(Event::Key(k)) = event::read() else {
            continue;
        };
        if k.kind != KeyEventKind::Press {
            continue;
        }
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            tracing::info!("interrupted");
            return Ok(());
        }

        if let View::Editor(editor) = &mut state.view {
            match editor.handle_key(session, k) {
                EditorOutcome::Continue => {}
                EditorOutcome::Closed(msg) => {
                    state.info = msg.to_string();
                    state.view = View::Timer;
                }
                EditorOutcome::SaveFailed(msg) => state.info = msg,
            }
            continue;
        }

        let Some(name) = key_name(&k) else {
            continue;
        };
        match session.handle_key(&name, Instant::now()) {
            Ok(Outcome::Quit) => return Ok(()),
            Ok(Outcome::EnterEdit) => {
                state.info.clear();
                state.view = View::Editor(EditorState::new(session.definition()));
            }
            Ok(Outcome::Saved {
                attempt_id,
                personal_best,
            }) => {
                state.info = if personal_best {
                    format!("New personal best! Saved attempt #{attempt_id}")
                } else {
                    format!("Saved attempt #{attempt_id}")
                };
            }
            Ok(Outcome::Applied(Action::Start)) => state.info.clear(),
            Ok(Outcome::Applied(Action::Confirm)) => state.info = "Run discarded".into(),
            Ok(Outcome::Applied(_)) | Ok(Outcome::Ignored) => {}
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "save failed");
                state.info = format!("Save failed: {e:#}");
            }
        }
    }
}

/// Name of a key as written in the `[[hotkey]]` config table.
fn key_name(k: &KeyEvent) -> Option<String> {
    let shift = k.modifiers.contains(KeyModifiers::SHIFT);
    let name = match k.code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::Up if shift => "shift+up".to_string(),
        KeyCode::Down if shift => "shift+down".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn key_names_match_config_spelling() {
        let none = KeyModifiers::NONE;
        assert_eq!(key_name(&press(KeyCode::Char(' '), none)).as_deref(), Some("space"));
        assert_eq!(key_name(&press(KeyCode::Char('z'), none)).as_deref(), Some("z"));
        assert_eq!(
            key_name(&press(KeyCode::Char('K'), KeyModifiers::SHIFT)).as_deref(),
            Some("K")
        );
        assert_eq!(key_name(&press(KeyCode::Esc, none)).as_deref(), Some("esc"));
        assert_eq!(
            key_name(&press(KeyCode::Up, KeyModifiers::SHIFT)).as_deref(),
            Some("shift+up")
        );
        assert_eq!(key_name(&press(KeyCode::F(3), none)).as_deref(), Some("f3"));
        assert_eq!(key_name(&press(KeyCode::Home, none)), None);
    }
}
