// TUI Module - full-screen terminal front end
//
// This module owns the terminal: it draws the menu, forms and log
// views and is the only consumer of the UiEvent queue

pub mod app;
pub mod form;
pub mod quit;
pub mod view;

pub use app::App;

use anyhow::Context;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Duration;

/// Input poll period; queued worker events are drawn at this rate
const TICK: Duration = Duration::from_millis(100);

/// Run the UI until the quit sequence completes
pub fn run(mut app: App) -> anyhow::Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).context("failed to initialise terminal")?;

    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.context("terminal event loop failed")
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> io::Result<()> {
    while !app.should_quit() {
        app.drain_events();
        terminal.draw(|f| view::draw(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }
    }
    Ok(())
}
