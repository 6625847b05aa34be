use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tasklist_core::{storage::TaskStorage, tasks::Task};

use super::app::{App, Level, Mode};
use crate::tasks::stats_line;

pub fn draw<S: TaskStorage>(frame: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(input_box(app), chunks[0]);

    let view = app.visible();
    let items: Vec<ListItem> = view.iter().map(task_item).collect();
    let title = if app.search().is_empty() {
        format!("Tasks ({})", app.sort().label())
    } else {
        format!("Tasks matching '{}' ({})", app.search(), app.sort().label())
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(app.selected_index(view.len()));
    frame.render_stateful_widget(list, chunks[1], &mut state);

    frame.render_widget(status_bar(app), chunks[2]);
    frame.render_widget(controls(), chunks[3]);

    match app.mode() {
        Mode::ConfirmDelete { title, .. } => {
            confirm_popup(frame, format!("Remove task '{title}'?"));
        }
        Mode::ConfirmClear { count } => {
            confirm_popup(frame, format!("Remove {count} completed task(s)?"));
        }
        _ => {}
    }
}

fn input_box<S: TaskStorage>(app: &App<S>) -> Paragraph<'static> {
    let (label, text, active) = match app.mode() {
        Mode::Add { buffer } => ("New task", buffer.clone(), true),
        Mode::Edit { buffer, .. } => ("Edit task", buffer.clone(), true),
        Mode::Search => ("Search", app.search().to_string(), true),
        _ => ("Search", app.search().to_string(), false),
    };
    let border = if active { Color::Cyan } else { Color::DarkGray };
    let cursor = if active { "_" } else { "" };
    Paragraph::new(Line::from(vec![Span::raw(text), Span::raw(cursor)])).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border))
            .title(Span::styled(
                label,
                Style::default().add_modifier(Modifier::BOLD),
            )),
    )
}

fn task_item(task: &Task) -> ListItem<'static> {
    let (mark, style) = if task.completed {
        ("✓ ", Style::default().fg(Color::DarkGray))
    } else {
        ("☐ ", Style::default())
    };
    ListItem::new(Line::from(vec![
        Span::styled(mark, style.add_modifier(Modifier::BOLD)),
        Span::styled(task.title.clone(), style),
    ]))
}

fn status_bar<S: TaskStorage>(app: &App<S>) -> Paragraph<'static> {
    let mut spans = vec![Span::styled(
        stats_line(&app.store().stats()),
        Style::default().fg(Color::Gray),
    )];
    if let Some(notice) = app.notice() {
        let color = match notice.level {
            Level::Info => Color::Green,
            Level::Warning => Color::Yellow,
            Level::Error => Color::Red,
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(notice.text.clone(), Style::default().fg(color)));
    }
    Paragraph::new(Line::from(spans))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"))
}

fn controls() -> Paragraph<'static> {
    let keys = [
        ("a", "add"),
        ("e", "edit"),
        ("space", "toggle"),
        ("d", "delete"),
        ("c", "clear done"),
        ("/", "search"),
        ("s", "sort"),
        ("w", "save"),
        ("q", "quit"),
    ];
    let mut spans = Vec::new();
    for (key, action) in keys {
        spans.push(Span::styled(key, Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(format!(" {action}  ")));
    }
    Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Controls"))
}

fn confirm_popup(frame: &mut Frame, question: String) {
    let area = centered(frame.area(), 50, 5);
    let body = Paragraph::new(vec![
        Line::from(question),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Cyan)),
            Span::raw(" confirm   "),
            Span::styled("n", Style::default().fg(Color::Cyan)),
            Span::raw(" cancel"),
        ]),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(Span::styled(
                "Confirm",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(body, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}
