//! Terminal set-up and teardown around the interactive app.

use std::io;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::session::AppState;
use crate::tui::app::App;

/// Initialise the terminal, run the app until the user quits, then restore
/// the terminal even if the app failed.
///
/// With `user` set the login screen is skipped.
pub fn run_tui(state: &mut AppState, user: Option<String>) -> io::Result<()> {
    if let Some(user) = user {
        state
            .login(&user)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new(state).run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
