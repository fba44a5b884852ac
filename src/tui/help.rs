use super::state::EditorState;
use crate::model::RunDefinition;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_hint(key: &'static str, label: &'static str) -> Vec<Span<'static>> {
    vec![
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(format!(" {label}  ")),
    ]
}

pub fn editor_help_lines(renaming: bool) -> Vec<Line<'static>> {
    if renaming {
        return vec![Line::from(
            [key_hint("Enter", "Confirm"), key_hint("Esc", "Cancel")].concat(),
        )];
    }
    vec![
        Line::from(
            [
                key_hint("j/k", "Navigate"),
                key_hint("r", "Rename"),
                key_hint("a", "Add"),
                key_hint("d", "Delete"),
                key_hint("J/K", "Reorder"),
            ]
            .concat(),
        ),
        Line::from([key_hint("Enter", "Save & Exit"), key_hint("Esc", "Cancel")].concat()),
    ]
}

pub fn draw_editor(f: &mut Frame, area: Rect, def: &RunDefinition, editor: &EditorState, info: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(area);

    let title = vec![
        Line::from(Span::styled(
            "Edit Splits",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{} - {}", def.game_name, def.category_name)),
    ];
    f.render_widget(Paragraph::new(title).alignment(Alignment::Center), chunks[0]);

    let visible = chunks[1].height.saturating_sub(2) as usize;
    let offset = super::splits::scroll_offset(def.segment_count(), visible, editor.selected);
    let lines: Vec<Line> = def
        .segments
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, segment)| {
            if i != editor.selected {
                return Line::from(format!("  {}", segment.name));
            }
            let selected = Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD);
            match &editor.input {
                Some(input) => Line::from(vec![
                    Span::styled("> ", selected),
                    Span::styled(input.clone(), Style::default().fg(Color::White)),
                    Span::styled("█", Style::default().fg(Color::Magenta)),
                ]),
                None => Line::from(Span::styled(format!("> {}", segment.name), selected)),
            }
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Segments")),
        chunks[1],
    );

    let mut help = editor_help_lines(editor.input.is_some());
    if !info.is_empty() {
        help.push(Line::from(Span::styled(
            info.to_string(),
            Style::default().fg(Color::Gray),
        )));
    }
    f.render_widget(Paragraph::new(help).alignment(Alignment::Center), chunks[2]);
}
