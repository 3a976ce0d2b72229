pub mod app;
pub mod ui;

use std::io;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::config::Config;
use crate::storage::Store;
use app::{App, InputField, InputMode, ViewMode};
use ui::ui;

/// Runs the interactive UI until the user quits.
pub fn run_tui(store: Box<dyn Store>, config: Config) -> crate::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store, config);
    tracing::info!(tasks = app.tasks.len(), "tui started");

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.input_mode {
            InputMode::Normal => {
                app.status = None;
                match (app.view_mode, key.code) {
                    (_, KeyCode::Char('q')) => return Ok(()),
                    (_, KeyCode::Down | KeyCode::Char('j')) => app.next(),
                    (_, KeyCode::Up | KeyCode::Char('k')) => app.previous(),
                    (_, KeyCode::Char('v')) => app.toggle_view(),
                    (_, KeyCode::Char('d') | KeyCode::Delete) => app.delete_selected(),
                    (_, KeyCode::Char('a')) => app.start_add(),
                    (_, KeyCode::Char('/')) => app.start_search(),
                    (ViewMode::Tasks, KeyCode::Char(' ')) => app.toggle_selected(),
                    (ViewMode::Tasks, KeyCode::Char('x')) => app.toggle_mark(),
                    (ViewMode::Tasks, KeyCode::Char('D')) => app.delete_marked(),
                    (ViewMode::Tasks, KeyCode::Char('e')) => app.start_edit(InputField::Title),
                    (ViewMode::Tasks, KeyCode::Char('t')) => app.start_edit(InputField::Due),
                    (ViewMode::Tasks, KeyCode::Tab) => app.switch_tab(),
                    (ViewMode::Tasks, KeyCode::Char('f')) => app.cycle_category_filter(),
                    (ViewMode::Tasks, KeyCode::Char('F') | KeyCode::Esc) => app.clear_filters(),
                    (ViewMode::Categories, KeyCode::Enter) => app.filter_by_selected_category(),
                    _ => {}
                }
            }
            InputMode::Adding | InputMode::Editing | InputMode::Searching => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => app.push_char(c),
                KeyCode::Backspace => app.pop_char(),
                _ => {}
            },
        }
    }
}
