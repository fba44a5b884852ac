use crate::config::Component;
use crate::engine::SegmentResult;
use crate::orchestrator::Session;
use crate::timecode::{format_delta, format_display};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

const AHEAD: Color = Color::Green;
const BEHIND: Color = Color::Red;
const GOLD: Color = Color::Yellow;
const ACCENT: Color = Color::Magenta;
const CURRENT_BG: Color = Color::Indexed(236);

fn delta_color(delta: time::Duration) -> Color {
    if delta.is_negative() {
        AHEAD
    } else {
        BEHIND
    }
}

fn component_height(component: Component) -> Constraint {
    match component {
        Component::Header => Constraint::Length(3),
        Component::Splits => Constraint::Min(3),
        Component::Timer => Constraint::Length(3),
        Component::PreviousSegment => Constraint::Length(1),
        Component::Controls => Constraint::Length(2),
    }
}

pub fn draw_timer_view(f: &mut Frame, area: Rect, session: &Session, layout: &[Component], info: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(layout.iter().map(|c| component_height(*c)).collect::<Vec<_>>())
        .split(area);

    for (component, chunk) in layout.iter().zip(chunks.iter()) {
        match component {
            Component::Header => draw_header(f, *chunk, session),
            Component::Splits => draw_splits(f, *chunk, session),
            Component::Timer => draw_timer(f, *chunk, session),
            Component::PreviousSegment => draw_previous_segment(f, *chunk, session),
            Component::Controls => draw_controls(f, *chunk, session, info),
        }
    }
}

fn draw_header(f: &mut Frame, area: Rect, session: &Session) {
    let def = session.definition();
    let sob = def
        .sum_of_best()
        .map(format_display)
        .unwrap_or_else(|| "-".into());
    let lines = vec![
        Line::from(Span::styled(
            def.game_name.clone(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(def.category_name.clone()),
        Line::from(vec![
            Span::styled("Attempts: ", Style::default().fg(Color::Gray)),
            Span::raw(def.attempt_count.to_string()),
            Span::raw("   "),
            Span::styled("Sum of Best: ", Style::default().fg(Color::Gray)),
            Span::raw(sob),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

/// First row to show so the current segment stays visible.
pub(super) fn scroll_offset(total: usize, visible: usize, current: usize) -> usize {
    if total <= visible || visible == 0 {
        return 0;
    }
    current
        .saturating_sub(visible / 2)
        .min(total - visible)
}

fn draw_splits(f: &mut Frame, area: Rect, session: &Session) {
    let def = session.definition();
    let engine = session.engine();
    let results = engine.results();
    let current = engine.current_segment();

    let visible = area.height.saturating_sub(2) as usize;
    let last = def.segment_count().saturating_sub(1) as isize;
    let anchor = engine.split_index().clamp(0, last) as usize;
    let offset = scroll_offset(def.segment_count(), visible, anchor);

    let rows: Vec<Row> = def
        .segments
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, segment)| {
            let pb = def.pb_split(i).map(format_display).unwrap_or_else(|| "-".into());
            match results.get(i) {
                Some(result @ SegmentResult::Split { elapsed, delta, .. }) => {
                    let gold = result.is_gold();
                    let delta_cell = match delta {
                        Some(d) => Cell::from(format_delta(*d))
                            .style(Style::default().fg(if gold { GOLD } else { delta_color(*d) })),
                        None => Cell::from(""),
                    };
                    let name_style = if gold {
                        Style::default().fg(GOLD)
                    } else {
                        Style::default()
                    };
                    Row::new(vec![
                        Cell::from(segment.name.clone()).style(name_style),
                        delta_cell,
                        Cell::from(format_display(*elapsed)),
                    ])
                }
                Some(SegmentResult::Skipped) => Row::new(vec![
                    Cell::from(segment.name.clone()),
                    Cell::from(""),
                    Cell::from("-"),
                ])
                .style(Style::default().fg(Color::DarkGray)),
                None => {
                    let row = Row::new(vec![
                        Cell::from(segment.name.clone()),
                        Cell::from(""),
                        Cell::from(pb).style(Style::default().fg(Color::Gray)),
                    ]);
                    if current == Some(i) {
                        row.style(Style::default().bg(CURRENT_BG).add_modifier(Modifier::BOLD))
                    } else {
                        row
                    }
                }
            }
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(11),
            Constraint::Length(12),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title("Splits"));
    f.render_widget(table, area);
}

fn draw_timer(f: &mut Frame, area: Rect, session: &Session) {
    let engine = session.engine();
    let last_delta = engine.results().iter().rev().find_map(SegmentResult::delta);
    let color = if engine.is_completed() {
        ACCENT
    } else {
        last_delta.map(delta_color).unwrap_or(ACCENT)
    };
    let text = format_display(engine.current_elapsed());
    let p = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Right)
    .block(Block::default().borders(Borders::TOP | Borders::BOTTOM));
    f.render_widget(p, area);
}

fn draw_previous_segment(f: &mut Frame, area: Rect, session: &Session) {
    let value = match session.engine().previous_segment_delta(session.definition()) {
        Some(d) => Span::styled(format_delta(d), Style::default().fg(delta_color(d))),
        None => Span::styled("-", Style::default().fg(Color::DarkGray)),
    };
    let line = Line::from(vec![
        Span::styled("Previous Segment: ", Style::default().fg(Color::Gray)),
        value,
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_controls(f: &mut Frame, area: Rect, session: &Session, info: &str) {
    let engine = session.engine();
    let mut lines = Vec::with_capacity(2);
    let controls = session.actions().controls_line(engine);
    if engine.confirming_reset() {
        lines.push(Line::from(vec![
            Span::styled("Reset run? ", Style::default().fg(BEHIND).add_modifier(Modifier::BOLD)),
            Span::styled(controls, Style::default().fg(ACCENT)),
        ]));
    } else {
        lines.push(Line::from(Span::styled(controls, Style::default().fg(ACCENT))));
    }
    if !info.is_empty() {
        lines.push(Line::from(Span::styled(
            info.to_string(),
            Style::default().fg(Color::Gray),
        )));
    }
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}
