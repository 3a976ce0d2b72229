use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs},
    Frame,
};

use super::app::{App, InputField, InputMode, Tab, ViewMode};
use crate::due::{due_label, task_due_status, DueStatus};
use crate::models::{category_key, Priority, DEFAULT_CATEGORY_COLOR};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Status + help
        ])
        .split(f.area());

    render_tabs(f, app, chunks[0]);
    match app.view_mode {
        ViewMode::Tasks => render_tasks(f, app, chunks[1]),
        ViewMode::Categories => render_categories(f, app, chunks[1]),
    }
    render_footer(f, app, chunks[2]);

    if matches!(app.input_mode, InputMode::Adding | InputMode::Editing) {
        render_input(f, app);
    }
}

fn render_tabs(f: &mut Frame, app: &App, area: Rect) {
    let active = app.counts.values().sum::<usize>();
    let titles = vec![Line::from(format!("Active ({active})")), Line::from("Completed")];
    let selected = match app.tab {
        Tab::Active => 0,
        Tab::Completed => 1,
    };

    let mut title = "TaskFlow".to_string();
    if let Some(c) = &app.category_filter {
        title.push_str(&format!(" - {c}"));
    }
    if !app.search.is_empty() {
        title.push_str(&format!(" - \"{}\"", app.search));
    }

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

fn render_tasks(f: &mut Frame, app: &mut App, area: Rect) {
    let today = Local::now().date_naive();

    let rows: Vec<Row> = app
        .tasks
        .iter()
        .map(|t| {
            let priority_style = match t.priority {
                Priority::High => Style::default().fg(Color::Red),
                Priority::Medium => Style::default().fg(Color::Yellow),
                Priority::Low => Style::default().fg(Color::Green),
            };
            let due = t.due_date.map(|d| due_label(d, today)).unwrap_or_default();
            let due_style = match task_due_status(t) {
                Some(DueStatus::Overdue) => Style::default().fg(Color::Red),
                Some(DueStatus::Today) => Style::default().fg(Color::Yellow),
                Some(DueStatus::Tomorrow) => Style::default().fg(Color::Blue),
                _ => Style::default(),
            };
            let mark = if app.marked.contains(&t.id) { "[x]" } else { "[ ]" };
            let row = Row::new(vec![
                Cell::from(mark),
                Cell::from(t.id.to_string()),
                Cell::from(t.title.clone()),
                Cell::from(t.priority.as_str()).style(priority_style),
                Cell::from(t.category.clone()),
                Cell::from(due).style(due_style),
                Cell::from(t.recurring.as_ref().map(|r| r.describe()).unwrap_or_default()),
            ]);
            if t.completed {
                row.style(Style::default().add_modifier(Modifier::CROSSED_OUT).fg(Color::DarkGray))
            } else {
                row
            }
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Length(5),
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(30),
    ];

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["", "ID", "Title", "Priority", "Category", "Due", "Repeats"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title("Tasks"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_categories(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .categories
        .iter()
        .map(|c| {
            let count = app.counts.get(&category_key(&c.name)).copied().unwrap_or(0);
            Row::new(vec![
                Cell::from("■").style(Style::default().fg(hex_color(&c.color))),
                Cell::from(c.name.clone()),
                Cell::from(count.to_string()),
            ])
        })
        .collect();

    let widths = [Constraint::Length(2), Constraint::Min(20), Constraint::Length(12)];

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["", "Name", "Active Tasks"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title("Categories"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.category_state);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | Space: Done | e: Title | t: Due | d: Del | x: Mark | D: Del marked | Tab: Active/Done | /: Search | f: Category | F: Clear | v: Categories",
            ViewMode::Categories => "q: Quit | Enter: Show tasks | d: Delete category | v: Tasks",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step (blank = default) | Esc: Cancel",
        InputMode::Searching => "Type to search | Enter: Keep | Esc: Clear",
    };

    let (text, style) = match (&app.status, app.input_mode) {
        (_, InputMode::Searching) => (format!("/{}", app.input_buffer), Style::default().fg(Color::Yellow)),
        (Some(status), _) => (status.clone(), Style::default().fg(Color::Green)),
        _ => (help_text.to_string(), Style::default().fg(Color::Gray)),
    };

    let footer = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(if app.status.is_some() { help_text } else { "" }));
    f.render_widget(footer, area);
}

fn render_input(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 3, f.area());
    f.render_widget(Clear, area);

    let title = match app.input_mode {
        InputMode::Adding => match app.add_state.step {
            0 => "Add Task: Enter Title",
            1 => "Add Task: Priority (high/medium/low)",
            2 => "Add Task: Category (Optional)",
            3 => "Add Task: Due Date (YYYY-MM-DD, Optional)",
            _ => "Add Task: Repeat, e.g. 'weekly on mon,thu until 2025-06-30' (Optional)",
        },
        InputMode::Editing => match app.input_field {
            InputField::Title => "Edit Title",
            InputField::Due => "Edit Due Date (YYYY-MM-DD, blank clears)",
            InputField::None => "Edit",
        },
        _ => "",
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, area);
}

/// Parses `#rrggbb`, falling back to the default category colour.
fn hex_color(hex: &str) -> Color {
    let parse = |s: &str| {
        let s = s.strip_prefix('#')?;
        if s.len() != 6 {
            return None;
        }
        let v = u32::from_str_radix(s, 16).ok()?;
        Some(Color::Rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
    };
    parse(hex)
        .or_else(|| parse(DEFAULT_CATEGORY_COLOR))
        .unwrap_or(Color::Blue)
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Length(r.height.saturating_sub(height) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color_parses_rgb() {
        assert_eq!(hex_color("#10b981"), Color::Rgb(0x10, 0xb9, 0x81));
        assert_eq!(hex_color("nonsense"), Color::Rgb(0x5B, 0x67, 0xF5));
    }
}
