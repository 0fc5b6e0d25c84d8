//! Session identity and the application state container.
//!
//! The login here only tags the session with a display name. No credential is
//! checked and nothing is protected by it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::{SessionError, TaskError};
use crate::fields::SortKey;
use crate::query;
use crate::store::{Applied, TaskAction, TaskStore};
use crate::task::{Task, TaskId};
use crate::weather::WeatherCache;

/// Who is using the app right now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionGate {
    current_user: Option<String>,
    is_authenticated: bool,
}

impl SessionGate {
    pub fn login(&mut self, username: &str) -> Result<(), SessionError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(SessionError::EmptyUsername);
        }
        self.current_user = Some(username.to_string());
        self.is_authenticated = true;
        tracing::info!(user = username, "logged in");
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.current_user.take() {
            tracing::info!(user = %user, "logged out");
        }
        self.is_authenticated = false;
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }
}

/// Everything a front end needs: session, tasks and the weather cache.
///
/// Created once at start-up and handed to the front end by reference.
/// Task deletion evicts the task's weather, and logout empties both stores.
pub struct AppState {
    pub session: SessionGate,
    pub tasks: TaskStore,
    pub weather: WeatherCache,
}

impl AppState {
    pub fn new(weather: WeatherCache) -> Self {
        Self {
            session: SessionGate::default(),
            tasks: TaskStore::new(),
            weather,
        }
    }

    pub fn login(&mut self, username: &str) -> Result<(), SessionError> {
        self.session.login(username)
    }

    /// Clear identity, tasks and cached weather.
    pub fn logout(&mut self) {
        self.session.logout();
        self.tasks.reset();
        self.weather.evict_all();
    }

    /// Apply a task action, keeping the weather cache in step with it.
    pub fn dispatch(&mut self, action: TaskAction) -> Result<Applied, TaskError> {
        let applied = self.tasks.dispatch(action)?;
        match &applied {
            Applied::Deleted(Some(task)) => {
                self.weather.evict(task.id);
            }
            Applied::Cleared => self.weather.evict_all(),
            _ => {}
        }
        Ok(applied)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Option<Task> {
        match self.dispatch(TaskAction::Delete(id)) {
            Ok(Applied::Deleted(task)) => task,
            _ => None,
        }
    }

    /// The list for the store's current filter.
    pub fn visible(&self, search: &str, sort: SortKey) -> Vec<&Task> {
        query::view(&self.tasks, self.tasks.filter(), search, sort)
    }

    /// Keep weather fresh for the outdoor tasks in `tasks`.
    pub fn refresh_weather(&self, tasks: &[&Task], now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        self.weather.refresh_all(&query::outdoor_targets(tasks), now)
    }
}
