//! Main application logic for the terminal user interface.
//!
//! `App` owns the screen state (login, task list, add form, help and
//! confirmation dialogs) and drives an `AppState` borrowed from the caller.
//! Weather for outdoor tasks in view is refreshed whenever the list changes
//! and again once a minute; background lookups fill the cache and the next
//! frame picks the results up.

use std::io;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame, Terminal,
};

use crate::fields::{FilterKey, SortKey};
use crate::query;
use crate::session::AppState;
use crate::store::{Applied, TaskAction};
use crate::task::{Task, TaskId};
use crate::tui::{
    colors::{priority_color, temperature_color, BRAND, DARK_PURPLE, DARK_RED, GOLD},
    enums::{LoginField, Screen},
    input::InputField,
    task_form::{
        TaskForm, ASSIGNED_ORDER, DUE_ORDER, IMPORTANT_ORDER, LOCATION_ORDER, OUTDOOR_ORDER,
        PRIORITY_ORDER, TEXT_ORDER,
    },
    utils::centered_rect,
};
use crate::util::{format_due_relative, reading_label, truncate};
use crate::weather::WeatherState;

const WEATHER_TICK: Duration = Duration::from_secs(60);

/// Destructive actions that wait for a y/n answer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pending {
    Delete(TaskId),
    ClearAll,
    Logout,
}

impl Pending {
    fn describe(self) -> String {
        match self {
            Pending::Delete(id) => format!("delete task {id}"),
            Pending::ClearAll => "remove every task".to_string(),
            Pending::Logout => "log out and discard all tasks".to_string(),
        }
    }
}

pub struct App<'a> {
    state: &'a mut AppState,
    screen: Screen,
    task_list_state: TableState,
    visible: Vec<TaskId>,
    search: String,
    search_active: bool,
    sort: SortKey,
    status_message: String,
    username: InputField,
    password: InputField,
    login_field: LoginField,
    task_form: TaskForm,
    pending: Option<Pending>,
    last_weather_refresh: Option<Instant>,
}

impl<'a> App<'a> {
    /// Start on the login screen unless the session is already authenticated.
    pub fn new(state: &'a mut AppState) -> Self {
        let screen = if state.session.is_authenticated() {
            Screen::TaskList
        } else {
            Screen::Login
        };
        let mut app = App {
            state,
            screen,
            task_list_state: TableState::default(),
            visible: Vec::new(),
            search: String::new(),
            search_active: false,
            sort: SortKey::Date,
            status_message: String::new(),
            username: InputField::new(),
            password: InputField::new(),
            login_field: LoginField::Username,
            task_form: TaskForm::new(),
            pending: None,
            last_weather_refresh: None,
        };
        if app.screen == Screen::TaskList {
            app.update_visible();
        }
        app
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.task_list_state
            .selected()
            .and_then(|i| self.visible.get(i).copied())
    }

    /// Recompute the visible list, keep the selection where possible and
    /// ask for weather for whatever is now on screen.
    fn update_visible(&mut self) {
        let old_selected = self.selected_id();
        self.visible = self
            .state
            .visible(&self.search, self.sort)
            .iter()
            .map(|t| t.id)
            .collect();

        let index = old_selected
            .and_then(|id| self.visible.iter().position(|v| *v == id))
            .or_else(|| {
                let last = self.visible.len().checked_sub(1)?;
                Some(self.task_list_state.selected().unwrap_or(0).min(last))
            });
        self.task_list_state.select(index);
        self.refresh_weather();
    }

    fn refresh_weather(&mut self) {
        let tasks: Vec<&Task> = self
            .visible
            .iter()
            .filter_map(|id| self.state.tasks.get(*id))
            .collect();
        let started = self.state.refresh_weather(&tasks, Utc::now()).len();
        if started > 0 {
            tracing::debug!(started, "weather refresh requested");
        }
        self.last_weather_refresh = Some(Instant::now());
    }

    fn tick(&mut self) {
        if self.screen == Screen::Login {
            return;
        }
        let due = self
            .last_weather_refresh
            .map_or(true, |at| at.elapsed() >= WEATHER_TICK);
        if due {
            self.refresh_weather();
        }
    }

    fn set_filter(&mut self, key: FilterKey) {
        if self.state.dispatch(TaskAction::SetFilter(key)).is_ok() {
            self.task_list_state.select(None);
            self.update_visible();
        }
    }

    fn cycle_filter(&mut self, forward: bool) {
        let keys = FilterKey::ALL;
        let current = keys
            .iter()
            .position(|k| *k == self.state.tasks.filter())
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % keys.len()
        } else {
            (current + keys.len() - 1) % keys.len()
        };
        self.set_filter(keys[next]);
    }

    fn submit_login(&mut self) {
        if self.username.value.trim().is_empty() || self.password.value.is_empty() {
            self.set_status_message("Please enter both username and password.");
            return;
        }
        match self.state.login(&self.username.value) {
            Ok(()) => {
                self.password.clear();
                self.screen = Screen::TaskList;
                let user = self.state.session.current_user().unwrap_or_default().to_string();
                self.set_status_message(format!("Welcome, {user}!"));
                self.update_visible();
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn toggle_selected_completed(&mut self) {
        let Some(id) = self.selected_id() else { return };
        match self.state.dispatch(TaskAction::ToggleCompleted(id)) {
            Ok(Applied::Toggled(Some(true))) => {
                if query::progress(&self.state.tasks).all_done {
                    self.set_status_message("Congratulations! You've completed all your tasks!");
                } else {
                    self.set_status_message("Task completed!");
                }
            }
            Ok(Applied::Toggled(Some(false))) => self.set_status_message("Task reopened"),
            _ => {}
        }
        self.update_visible();
    }

    fn toggle_selected_important(&mut self) {
        let Some(id) = self.selected_id() else { return };
        self.state.dispatch(TaskAction::ToggleImportant(id)).ok();
        self.update_visible();
    }

    fn create_task(&mut self) {
        let draft = match self.task_form.to_draft(Local::now().date_naive()) {
            Ok(draft) => draft,
            Err(msg) => return self.set_status_message(msg),
        };
        match self.state.dispatch(TaskAction::Add(draft)) {
            Ok(Applied::Added(id)) => {
                self.task_form = TaskForm::new();
                self.screen = Screen::TaskList;
                self.update_visible();
                if let Some(index) = self.visible.iter().position(|v| *v == id) {
                    self.task_list_state.select(Some(index));
                }
                self.set_status_message(format!("Added task {id}"));
            }
            Ok(_) => {}
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn confirm(&mut self) {
        match self.pending.take() {
            Some(Pending::Delete(id)) => {
                if self.state.delete_task(id).is_some() {
                    self.set_status_message("Task deleted");
                }
            }
            Some(Pending::ClearAll) => {
                self.state.dispatch(TaskAction::Clear).ok();
                self.set_status_message("Cleared all tasks");
            }
            Some(Pending::Logout) => {
                self.state.logout();
                self.search.clear();
                self.login_field = LoginField::Username;
                self.screen = Screen::Login;
                self.set_status_message("Logged out");
                self.visible.clear();
                self.task_list_state.select(None);
                return;
            }
            None => {}
        }
        self.screen = Screen::TaskList;
        self.update_visible();
    }

    /// Handle keyboard input on the login screen.
    fn handle_login_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.login_field = self.login_field.toggle()
            }
            KeyCode::Enter => self.submit_login(),
            KeyCode::Backspace => self.login_input().handle_backspace(),
            KeyCode::Delete => self.login_input().handle_delete(),
            KeyCode::Left => self.login_input().move_cursor_left(),
            KeyCode::Right => self.login_input().move_cursor_right(),
            KeyCode::Char(c) => self.login_input().handle_char(c),
            _ => {}
        }
        false
    }

    fn login_input(&mut self) -> &mut InputField {
        match self.login_field {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    /// Handle keyboard input when in the task list view.
    ///
    /// Returns true if the application should quit.
    fn handle_task_list_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        if self.search_active {
            match key {
                KeyCode::Esc => {
                    self.search_active = false;
                    self.search.clear();
                    self.update_visible();
                }
                KeyCode::Enter => {
                    self.search_active = false;
                    if !self.search.is_empty() {
                        self.set_status_message(format!(
                            "Search applied: '{}' ({} tasks)",
                            self.search,
                            self.visible.len()
                        ));
                    }
                }
                KeyCode::Backspace => {
                    if self.search.pop().is_some() {
                        self.update_visible();
                    }
                }
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.update_visible();
                }
                _ => {}
            }
            return false;
        }

        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.search.is_empty() {
                    return true;
                }
                self.search.clear();
                self.update_visible();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(selected) = self.task_list_state.selected() {
                    if selected > 0 {
                        self.task_list_state.select(Some(selected - 1));
                    }
                } else if !self.visible.is_empty() {
                    self.task_list_state.select(Some(0));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(selected) = self.task_list_state.selected() {
                    if selected + 1 < self.visible.len() {
                        self.task_list_state.select(Some(selected + 1));
                    }
                } else if !self.visible.is_empty() {
                    self.task_list_state.select(Some(0));
                }
            }
            KeyCode::Tab | KeyCode::Right => self.cycle_filter(true),
            KeyCode::BackTab | KeyCode::Left => self.cycle_filter(false),
            KeyCode::Char(c @ '1'..='5') => {
                let index = c as usize - '1' as usize;
                self.set_filter(FilterKey::ALL[index]);
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected_completed(),
            KeyCode::Char('i') => self.toggle_selected_important(),
            KeyCode::Char('a') => {
                self.task_form = TaskForm::new();
                self.screen = Screen::AddTask;
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_id() {
                    self.pending = Some(Pending::Delete(id));
                    self.screen = Screen::Confirm;
                }
            }
            KeyCode::Char('x') => {
                self.pending = Some(Pending::ClearAll);
                self.screen = Screen::Confirm;
            }
            KeyCode::Char('L') => {
                self.pending = Some(Pending::Logout);
                self.screen = Screen::Confirm;
            }
            KeyCode::Char('s') => {
                self.sort = self.sort.next();
                self.set_status_message(format!("Sorted by {}", self.sort));
                self.update_visible();
            }
            KeyCode::Char('/') => {
                self.search_active = true;
            }
            KeyCode::Char('w') => {
                self.refresh_weather();
                self.set_status_message("Weather refresh requested");
            }
            KeyCode::Char('h') | KeyCode::F(1) => self.screen = Screen::Help,
            _ => {}
        }
        false
    }

    fn handle_form_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Esc => {
                self.screen = Screen::TaskList;
            }
            KeyCode::Tab | KeyCode::Down => self.task_form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.task_form.prev_field(),
            KeyCode::Enter => self.create_task(),
            KeyCode::Left => match self.task_form.active_input() {
                Some(input) => input.move_cursor_left(),
                None => self.task_form.adjust(false),
            },
            KeyCode::Right => match self.task_form.active_input() {
                Some(input) => input.move_cursor_right(),
                None => self.task_form.adjust(true),
            },
            KeyCode::Backspace => {
                if let Some(input) = self.task_form.active_input() {
                    input.handle_backspace();
                }
            }
            KeyCode::Delete => {
                if let Some(input) = self.task_form.active_input() {
                    input.handle_delete();
                }
            }
            KeyCode::Char(c) => match self.task_form.active_input() {
                Some(input) => input.handle_char(c),
                None if c == ' ' => self.task_form.adjust(true),
                None => {}
            },
            _ => {}
        }
        false
    }

    fn handle_confirm_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => self.confirm(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.pending = None;
                self.screen = Screen::TaskList;
                self.set_status_message("Cancelled");
            }
            _ => {}
        }
        false
    }

    /// Route a key press to the current screen. Returns true to quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status_message.clear();
        match self.screen {
            Screen::Login => self.handle_login_input(key),
            Screen::TaskList => self.handle_task_list_input(key, modifiers),
            Screen::AddTask => self.handle_form_input(key),
            Screen::Confirm => self.handle_confirm_input(key),
            Screen::Help => {
                self.screen = Screen::TaskList;
                false
            }
        }
    }

    /// Poll for and handle keyboard events based on current application state.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code, key.modifiers));
                }
            }
        }
        Ok(false)
    }

    fn render_login(&mut self, f: &mut Frame, area: Rect) {
        let area = centered_rect(50, 40, area);
        f.render_widget(Clear, area);
        let block = Block::default()
            .title("Sign in")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BRAND));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(inner);

        f.render_widget(
            Paragraph::new("TASKS & WEATHER")
                .style(Style::default().add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center),
            chunks[0],
        );

        let focused = |field: LoginField| {
            if self.login_field == field {
                Style::default().fg(GOLD)
            } else {
                Style::default()
            }
        };
        let username = Paragraph::new(self.username.value.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Username")
                .border_style(focused(LoginField::Username)),
        );
        let masked = "*".repeat(self.password.value.chars().count());
        let password = Paragraph::new(masked).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Password")
                .border_style(focused(LoginField::Password)),
        );
        f.render_widget(username, chunks[1]);
        f.render_widget(password, chunks[2]);
        f.render_widget(
            Paragraph::new("Tab to switch field, Enter to sign in, Esc to quit")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            chunks[3],
        );
    }

    fn weather_cell(&self, task: &Task) -> Cell<'static> {
        if task.weather_location().is_none() {
            return Cell::from("");
        }
        let entry = self.state.weather.entry(task.id).unwrap_or_default();
        match (entry.state(), entry.data) {
            (WeatherState::Loaded, Some(data)) => {
                let color = temperature_color(data.band());
                Cell::from(reading_label(&data))
                    .style(Style::default().fg(color))
            }
            (WeatherState::Loading, _) => {
                Cell::from("loading…").style(Style::default().fg(Color::DarkGray))
            }
            (WeatherState::Failed, _) => {
                Cell::from("Weather unavailable").style(Style::default().fg(Color::LightRed))
            }
            _ => Cell::from("-"),
        }
    }

    /// Render the main task list view with filter tabs, table and progress.
    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let today = Local::now().date_naive();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let user = self.state.session.current_user().unwrap_or("-");
        let header_text = Line::from(vec![
            Span::styled("TASKS & WEATHER", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("Signed in as {user}  Sort: {}", self.sort),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ]);
        f.render_widget(
            Paragraph::new(header_text)
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center),
            chunks[0],
        );

        let filter = self.state.tasks.filter();
        let titles: Vec<Line> = FilterKey::ALL
            .iter()
            .enumerate()
            .map(|(i, k)| Line::from(format!("{} {}", i + 1, k.label())))
            .collect();
        let selected_tab = FilterKey::ALL.iter().position(|k| *k == filter).unwrap_or(0);
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("Lists"))
            .select(selected_tab)
            .highlight_style(Style::default().fg(GOLD).add_modifier(Modifier::BOLD));
        f.render_widget(tabs, chunks[1]);

        let header = Row::new(["", "", "Pri", "Due", "Task", "Location", "Weather"].map(|h| {
            Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))
        }))
        .style(Style::default().bg(BRAND).fg(Color::White))
        .height(1);

        let rows: Vec<Row> = self
            .visible
            .iter()
            .filter_map(|id| self.state.tasks.get(*id))
            .map(|task| {
                let due = format_due_relative(task.date.with_timezone(&Local).date_naive(), today);
                let style = if task.completed {
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default().fg(Color::White)
                };
                Row::new(vec![
                    Cell::from(if task.completed { "[x]" } else { "[ ]" }),
                    Cell::from(if task.important { "★" } else { "" })
                        .style(Style::default().fg(GOLD)),
                    Cell::from(task.priority.to_string())
                        .style(Style::default().fg(priority_color(task.priority))),
                    Cell::from(due),
                    Cell::from(task.text.clone()),
                    Cell::from(truncate(task.location.as_deref().unwrap_or(""), 16)),
                    self.weather_cell(task),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Min(20),
            Constraint::Length(16),
            Constraint::Length(24),
        ];
        let title = if self.search.is_empty() {
            format!("{} ({})", filter.label(), self.visible.len())
        } else {
            format!("{} ({}) matching '{}'", filter.label(), self.visible.len(), self.search)
        };
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, chunks[2], &mut self.task_list_state);

        let progress = query::progress(&self.state.tasks);
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Progress"))
            .gauge_style(Style::default().fg(DARK_PURPLE))
            .percent(progress.rounded_percent().min(100) as u16)
            .label(format!(
                "{}/{} tasks completed ({}%)",
                progress.completed,
                progress.total,
                progress.rounded_percent()
            ));
        f.render_widget(gauge, chunks[3]);
    }

    fn render_task_form(&mut self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 80, area);
        f.render_widget(Clear, area);
        let block = Block::default().title("Add Task").borders(Borders::ALL);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3); 7].into_iter().chain([Constraint::Min(0)]))
            .split(inner);

        let form = &self.task_form;
        let style_for = |order: usize| {
            if form.current_field == order {
                Style::default().fg(GOLD)
            } else {
                Style::default()
            }
        };
        let toggle = |on: bool| if on { "[x]" } else { "[ ]" };

        let fields: [(usize, &str, String); 7] = [
            (TEXT_ORDER, "Task *", form.text.value.clone()),
            (DUE_ORDER, "Due (today, tomorrow, fri, in 3d, YYYY-MM-DD)", form.due.value.clone()),
            (PRIORITY_ORDER, "Priority (/)", format!("< {} >", form.selected_priority())),
            (IMPORTANT_ORDER, "Important (Space)", toggle(form.important).to_string()),
            (ASSIGNED_ORDER, "Assigned to me (Space)", toggle(form.assigned_to_me).to_string()),
            (OUTDOOR_ORDER, "Outdoor activity (Space)", toggle(form.is_outdoor).to_string()),
            (
                LOCATION_ORDER,
                if form.is_outdoor { "Location *" } else { "Location" },
                form.location.value.clone(),
            ),
        ];
        for (i, (order, title, value)) in fields.into_iter().enumerate() {
            let paragraph = Paragraph::new(value).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(style_for(order)),
            );
            f.render_widget(paragraph, chunks[i]);
        }
        f.render_widget(
            Paragraph::new("Tab/Shift+Tab move, Enter save, Esc cancel")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            chunks[7],
        );
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let heading = |s: &'static str| {
            Line::from(Span::styled(s, Style::default().add_modifier(Modifier::BOLD)))
        };
        let help_text = vec![
            heading("Task List:"),
            Line::from("  ↑/↓, k/j      Move selection"),
            Line::from("  Tab/←/→       Switch list (1-5 jump directly)"),
            Line::from("  Enter/Space   Toggle completed"),
            Line::from("  i             Toggle important"),
            Line::from("  a             Add task"),
            Line::from("  d             Delete selected task"),
            Line::from("  s             Cycle sort (date, priority, status, name)"),
            Line::from("  /             Search task text"),
            Line::from("  w             Refresh weather"),
            Line::from("  x             Clear all tasks"),
            Line::from("  L             Log out"),
            Line::from("  h/F1          Show this help"),
            Line::from("  q/Esc/Ctrl+C  Quit"),
            Line::from(""),
            heading("Weather:"),
            Line::from("  Outdoor tasks show current conditions for their location."),
            Line::from("  Readings refresh after 30 minutes; failures retry on the same schedule."),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Help - Press any key to return"),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    /// Render a confirmation dialog for destructive actions.
    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Action")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));

        let area = centered_rect(50, 20, area);
        f.render_widget(Clear, area);

        let action = self.pending.map(Pending::describe).unwrap_or_default();
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Are you sure you want to:",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(action),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    /// Render the status bar at the bottom of the screen.
    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else if self.search_active {
            format!("Search: {} (Esc to clear, Enter to confirm)", self.search)
        } else {
            match self.screen {
                Screen::Login => "Sign in to start".to_string(),
                Screen::TaskList => {
                    let stats = query::stats(&self.state.tasks);
                    format!(
                        "Active: {}  Completed: {}  Important: {} | Press 'h' for help",
                        stats.active, stats.completed, stats.important
                    )
                }
                Screen::AddTask => "Add New Task".to_string(),
                Screen::Help => "Help".to_string(),
                Screen::Confirm => "Confirm Action".to_string(),
            }
        };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(BRAND).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main render function that dispatches to appropriate view renderers.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.screen {
            Screen::Login => self.render_login(f, chunks[0]),
            Screen::TaskList => self.render_task_list(f, chunks[0]),
            Screen::AddTask => {
                self.render_task_list(f, chunks[0]);
                self.render_task_form(f, chunks[0]);
            }
            Screen::Help => self.render_help(f, chunks[0]),
            Screen::Confirm => {
                self.render_task_list(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
        }
        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop: draw, poll input, refresh weather on the minute.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
            self.tick();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeatherConfig;
    use crate::task::TaskDraft;
    use crate::weather::{OpenWeatherClient, WeatherCache};
    use ratatui::backend::TestBackend;
    use rstest::rstest;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    fn app_state() -> AppState {
        let config = WeatherConfig::default();
        let provider = Arc::new(OpenWeatherClient::new(&config));
        AppState::new(WeatherCache::new(provider, &config, Handle::current()))
    }

    fn press(app: &mut App, keys: &str) {
        for c in keys.chars() {
            app.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    fn screen_text(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let mut state = app_state();
        let mut app = App::new(&mut state);
        assert_eq!(app.screen, Screen::Login);

        press(&mut app, "ada");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.screen, Screen::Login);
        assert_eq!(app.status_message, "Please enter both username and password.");

        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        press(&mut app, "pw");
        assert!(screen_text(&mut app).contains("**"));
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.screen, Screen::TaskList);
        assert_eq!(app.state.session.current_user(), Some("ada"));
    }

    #[tokio::test]
    async fn add_form_creates_and_selects_task() {
        let mut state = app_state();
        state.login("ada").unwrap();
        let mut app = App::new(&mut state);

        press(&mut app, "a");
        assert_eq!(app.screen, Screen::AddTask);
        press(&mut app, "Water plants");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(app.screen, Screen::TaskList);
        assert_eq!(app.visible.len(), 1);
        assert_eq!(app.selected_id(), Some(TaskId(1)));
        assert!(screen_text(&mut app).contains("Water plants"));
    }

    #[tokio::test]
    async fn outdoor_form_without_location_is_rejected() {
        let mut state = app_state();
        state.login("ada").unwrap();
        let mut app = App::new(&mut state);

        press(&mut app, "aPicnic");
        for _ in 0..OUTDOOR_ORDER {
            app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        }
        press(&mut app, " ");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(app.screen, Screen::AddTask);
        assert!(app.status_message.contains("invalid task"));
        assert!(app.state.tasks.is_empty());
    }

    #[tokio::test]
    async fn completing_moves_task_between_lists() {
        let mut state = app_state();
        state.login("ada").unwrap();
        state.tasks.add_task(TaskDraft::new("One")).unwrap();
        state.tasks.add_task(TaskDraft::new("Two")).unwrap();
        let mut app = App::new(&mut state);
        assert_eq!(app.visible.len(), 2);

        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.status_message, "Task completed!");
        assert_eq!(app.visible.len(), 1);

        press(&mut app, "4");
        assert_eq!(app.state.tasks.filter(), FilterKey::Completed);
        assert_eq!(app.visible, vec![TaskId(1)]);

        press(&mut app, "1");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.status_message, "Congratulations! You've completed all your tasks!");
        assert!(screen_text(&mut app).contains("2/2 tasks completed (100%)"));
    }

    #[tokio::test]
    async fn search_narrows_and_escape_restores() {
        let mut state = app_state();
        state.login("ada").unwrap();
        state.tasks.add_task(TaskDraft::new("Buy milk")).unwrap();
        state.tasks.add_task(TaskDraft::new("Call mom")).unwrap();
        let mut app = App::new(&mut state);

        press(&mut app, "/MILK");
        assert_eq!(app.visible, vec![TaskId(1)]);
        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.visible.len(), 2);
        assert!(!app.search_active);
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let mut state = app_state();
        state.login("ada").unwrap();
        state.tasks.add_task(TaskDraft::new("Keep")).unwrap();
        let mut app = App::new(&mut state);

        press(&mut app, "d");
        assert_eq!(app.screen, Screen::Confirm);
        assert!(screen_text(&mut app).contains("delete task 1"));
        press(&mut app, "n");
        assert_eq!(app.state.tasks.len(), 1);

        press(&mut app, "dy");
        assert!(app.state.tasks.is_empty());
        assert_eq!(app.screen, Screen::TaskList);
    }

    #[tokio::test]
    async fn logout_returns_to_login_with_empty_store() {
        let mut state = app_state();
        state.login("ada").unwrap();
        state.tasks.add_task(TaskDraft::new("Secret")).unwrap();
        let mut app = App::new(&mut state);

        press(&mut app, "Ly");
        assert_eq!(app.screen, Screen::Login);
        assert!(!app.state.session.is_authenticated());
        assert!(app.state.tasks.is_empty());
    }

    #[tokio::test]
    async fn outdoor_rows_show_weather_state() {
        let mut state = app_state();
        state.login("ada").unwrap();
        state.tasks.add_task(TaskDraft::new("Picnic").outdoor("Paris")).unwrap();
        let mut app = App::new(&mut state);

        // Without an API key the lookup fails straight away.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let entry = app.state.weather.entry(TaskId(1)).unwrap();
        assert_eq!(entry.state(), WeatherState::Failed);
        assert!(screen_text(&mut app).contains("Weather unavailable"));
    }

    #[tokio::test]
    async fn sort_key_cycles_from_the_list() {
        let mut state = app_state();
        state.login("ada").unwrap();
        let mut app = App::new(&mut state);
        press(&mut app, "s");
        assert_eq!(app.sort, SortKey::Priority);
        assert_eq!(app.status_message, "Sorted by priority");
    }
}
