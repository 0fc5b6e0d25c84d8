//! Command implementations for the CLI interface.
//!
//! Top-level subcommands start a front end (the line console or the TUI),
//! run a one-off weather lookup, or print completions. The console reads one
//! command per line and parses it with clap just like the outer CLI.

use std::io::{self, BufRead, IsTerminal, Write};

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use clap_complete::{generate, Shell as CompletionShell};
use tokio::runtime::{Handle, Runtime};

use crate::config::WeatherConfig;
use crate::fields::{Priority, SortKey};
use crate::query;
use crate::session::AppState;
use crate::store::{Applied, TaskAction};
use crate::task::{TaskDraft, TaskId};
use crate::tui::run::run_tui;
use crate::util::{due_at_local_noon, parse_due_input, print_table, weather_cell};
use crate::weather::{OpenWeatherClient, WeatherProvider, WeatherState};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive terminal UI.
    Ui {
        /// Skip the login screen and use this name.
        #[arg(long)]
        user: Option<String>,
    },

    /// Read task commands line by line from stdin.
    Shell {
        /// Log in as this name before reading commands.
        #[arg(long)]
        user: Option<String>,
    },

    /// Look up the current weather for a location once.
    Weather {
        /// City name, e.g. "Paris" or "Paris,FR".
        location: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Launch the terminal user interface.
pub fn cmd_ui(state: &mut AppState, user: Option<String>) {
    if let Err(e) = run_tui(state, user) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Run the line console over stdin/stdout.
pub fn cmd_shell(state: &mut AppState, runtime: &Runtime, user: Option<String>) {
    let mut console = Console::new(state, runtime.handle().clone());
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdout = io::stdout();

    if let Some(user) = user {
        if let Err(e) = console.state.login(&user) {
            eprintln!("Login failed: {e}");
            std::process::exit(1);
        }
    }
    if let Err(e) = console.run(stdin.lock(), &mut stdout, interactive) {
        eprintln!("Console error: {e}");
        std::process::exit(1);
    }
}

/// Fetch and print the weather for one location.
pub fn cmd_weather(config: &WeatherConfig, runtime: &Runtime, location: &str) {
    let client = OpenWeatherClient::new(config);
    match runtime.block_on(client.fetch(location)) {
        Ok(snapshot) => println!("{location}: {}", snapshot.summary()),
        Err(e) => {
            eprintln!("Weather lookup for {location} failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: CompletionShell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut io::stdout());
}

/// One console line.
#[derive(Parser)]
#[command(
    name = "tw",
    no_binary_name = true,
    disable_version_flag = true,
    override_usage = "<COMMAND> [ARGS]"
)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Subcommand)]
enum ConsoleCommand {
    /// Start a session. Any non-empty username and password are accepted.
    Login { username: String, password: String },

    /// End the session and forget every task.
    Logout,

    /// Add a new task.
    Add {
        /// What needs doing.
        text: String,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "in Nd", weekday names.
        #[arg(long)]
        due: Option<String>,
        /// Mark as important straight away.
        #[arg(long)]
        important: bool,
        /// Assign to me.
        #[arg(long)]
        assigned: bool,
        /// Outdoor activity at this location (enables weather).
        #[arg(long, value_name = "LOCATION")]
        outdoor: Option<String>,
    },

    /// Toggle a task between active and completed.
    Done { id: u64 },

    /// Toggle the important flag.
    Star { id: u64 },

    /// Delete a task.
    Delete { id: u64 },

    /// Choose the list: all | today | important | completed | assigned.
    Filter { key: String },

    /// Show tasks for the current filter.
    List {
        /// Only tasks whose text contains this (case-insensitive).
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SortKey::Date)]
        sort: SortKey,
    },

    /// Task counts and progress.
    Stats,

    /// Days that have tasks due.
    Calendar,

    /// Refresh weather for outdoor tasks in the current list.
    Weather {
        /// Wait for lookups to finish and print the results.
        #[arg(long)]
        wait: bool,
    },

    /// Remove every task but stay logged in.
    Clear,

    /// Print all tasks as JSON.
    Json,

    /// Leave the console.
    #[command(alias = "exit")]
    Quit,
}

/// Whether the console should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Line-oriented front end over an `AppState`.
pub struct Console<'a> {
    state: &'a mut AppState,
    runtime: Handle,
}

impl<'a> Console<'a> {
    /// `runtime` is used to wait on weather lookups; it must not be the
    /// runtime the calling thread is already inside.
    pub fn new(state: &'a mut AppState, runtime: Handle) -> Self {
        Self { state, runtime }
    }

    /// Execute lines until end of input or `quit`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W, prompt: bool) -> io::Result<()> {
        if prompt {
            write!(out, "tw> ")?;
            out.flush()?;
        }
        for line in input.lines() {
            if self.execute(&line?, out)? == Flow::Quit {
                break;
            }
            if prompt {
                write!(out, "tw> ")?;
                out.flush()?;
            }
        }
        Ok(())
    }

    /// Execute a single line.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        let words = split_words(line);
        if words.is_empty() || words[0].starts_with('#') {
            return Ok(Flow::Continue);
        }
        let command = match ConsoleLine::try_parse_from(&words) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                write!(out, "{}", e.render())?;
                return Ok(Flow::Continue);
            }
        };

        let needs_login = !matches!(command, ConsoleCommand::Login { .. } | ConsoleCommand::Quit);
        if needs_login && !self.state.session.is_authenticated() {
            writeln!(out, "Please log in first: login <username> <password>")?;
            return Ok(Flow::Continue);
        }

        match command {
            ConsoleCommand::Login { username, password } => self.login(&username, &password, out)?,
            ConsoleCommand::Logout => {
                self.state.logout();
                writeln!(out, "Logged out.")?;
            }
            ConsoleCommand::Add { text, priority, due, important, assigned, outdoor } => {
                self.add(text, priority, due, important, assigned, outdoor, out)?
            }
            ConsoleCommand::Done { id } => self.toggle_done(TaskId(id), out)?,
            ConsoleCommand::Star { id } => {
                match self.state.dispatch(TaskAction::ToggleImportant(TaskId(id))) {
                    Ok(Applied::Toggled(Some(true))) => writeln!(out, "Starred {id}")?,
                    Ok(Applied::Toggled(Some(false))) => writeln!(out, "Unstarred {id}")?,
                    _ => writeln!(out, "No task {id}.")?,
                }
            }
            ConsoleCommand::Delete { id } => match self.state.delete_task(TaskId(id)) {
                Some(_) => writeln!(out, "Deleted.")?,
                None => writeln!(out, "No task {id}.")?,
            },
            ConsoleCommand::Filter { key } => match self.state.tasks.set_filter_str(&key) {
                Ok(key) => writeln!(out, "Showing {}.", key.label())?,
                Err(e) => writeln!(out, "Error: {e}")?,
            },
            ConsoleCommand::List { search, sort } => {
                let search = search.unwrap_or_default();
                let visible = self.state.visible(&search, sort);
                // Rendering a list is what asks for weather.
                self.state.refresh_weather(&visible, Utc::now());
                if visible.is_empty() {
                    writeln!(out, "No tasks in {}.", self.state.tasks.filter().label())?;
                } else {
                    print_table(out, &visible, &self.state.weather)?;
                }
            }
            ConsoleCommand::Stats => self.stats(out)?,
            ConsoleCommand::Calendar => {
                let days = query::dates_with_tasks(&self.state.tasks, &Local);
                if days.is_empty() {
                    writeln!(out, "No tasks scheduled.")?;
                }
                for day in days {
                    writeln!(out, "{}", day.format("%a %b %d, %Y"))?;
                }
            }
            ConsoleCommand::Weather { wait } => self.weather(wait, out)?,
            ConsoleCommand::Clear => {
                self.state.dispatch(TaskAction::Clear).ok();
                writeln!(out, "Cleared all tasks.")?;
            }
            ConsoleCommand::Json => {
                let tasks: Vec<_> = self.state.tasks.iter().collect();
                let json = serde_json::to_string_pretty(&tasks).map_err(io::Error::other)?;
                writeln!(out, "{json}")?;
            }
            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn login<W: Write>(&mut self, username: &str, password: &str, out: &mut W) -> io::Result<()> {
        if username.trim().is_empty() || password.is_empty() {
            return writeln!(out, "Please enter both username and password.");
        }
        match self.state.login(username) {
            Ok(()) => writeln!(out, "Welcome, {}!", username.trim()),
            Err(e) => writeln!(out, "Error: {e}"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add<W: Write>(
        &mut self,
        text: String,
        priority: Priority,
        due: Option<String>,
        important: bool,
        assigned: bool,
        outdoor: Option<String>,
        out: &mut W,
    ) -> io::Result<()> {
        let today = Local::now().date_naive();
        let date = match due.as_deref().map(|d| parse_due_input(d, today)) {
            None => Utc::now(),
            Some(Some(day)) => due_at_local_noon(day),
            Some(None) => {
                return writeln!(out, "Unrecognised due date '{}'.", due.unwrap_or_default());
            }
        };

        let mut draft = TaskDraft::new(text)
            .priority(priority)
            .due(date)
            .important(important)
            .assigned_to_me(assigned);
        if let Some(location) = outdoor {
            draft = draft.outdoor(location);
        }

        match self.state.dispatch(TaskAction::Add(draft)) {
            Ok(Applied::Added(id)) => writeln!(out, "Added task {id}"),
            Ok(_) => Ok(()),
            Err(e) => writeln!(out, "Error: {e}"),
        }
    }

    fn toggle_done<W: Write>(&mut self, id: TaskId, out: &mut W) -> io::Result<()> {
        match self.state.dispatch(TaskAction::ToggleCompleted(id)) {
            Ok(Applied::Toggled(Some(true))) => {
                writeln!(out, "Task completed!")?;
                if query::progress(&self.state.tasks).all_done {
                    writeln!(out, "Congratulations! You've completed all your tasks!")?;
                }
                Ok(())
            }
            Ok(Applied::Toggled(Some(false))) => writeln!(out, "Reopened {id}"),
            _ => writeln!(out, "No task {id}."),
        }
    }

    fn stats<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let stats = query::stats(&self.state.tasks);
        let progress = query::progress(&self.state.tasks);
        writeln!(
            out,
            "Total: {}  Active: {}  Completed: {}  Important: {}",
            stats.total, stats.active, stats.completed, stats.important
        )?;
        writeln!(
            out,
            "Progress: {}/{} tasks completed ({}%)",
            progress.completed,
            progress.total,
            progress.rounded_percent()
        )
    }

    fn weather<W: Write>(&mut self, wait: bool, out: &mut W) -> io::Result<()> {
        let visible = self.state.visible("", SortKey::Date);
        let targets = query::outdoor_targets(&visible);
        if targets.is_empty() {
            return writeln!(out, "No outdoor tasks in this list.");
        }
        let handles = self.state.weather.refresh_all(&targets, Utc::now());
        writeln!(out, "Refreshing {} of {} outdoor task(s).", handles.len(), targets.len())?;
        if !wait {
            return Ok(());
        }
        for handle in handles {
            if let Err(e) = self.runtime.block_on(handle) {
                tracing::warn!(error = %e, "weather task did not complete");
            }
        }
        for task in visible.iter().filter(|t| t.weather_location().is_some()) {
            let entry = self.state.weather.entry(task.id).unwrap_or_default();
            match (entry.state(), &entry.data, &entry.error) {
                (WeatherState::Loaded, Some(data), _) => {
                    writeln!(out, "{} {}: {}", task.id, task.text, data.summary())?
                }
                (WeatherState::Failed, _, Some(error)) => {
                    writeln!(out, "{} {}: Weather unavailable ({error})", task.id, task.text)?
                }
                _ => writeln!(out, "{} {}: {}", task.id, task.text, weather_cell(task, &self.state.weather))?,
            }
        }
        Ok(())
    }
}

/// Split a console line into words, honouring double quotes.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                    quoted = true;
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    words.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() || quoted {
        words.push(current);
    }
    words
}
