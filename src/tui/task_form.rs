//! Add-task form for the terminal user interface.
//!
//! Fields are visited in a fixed order with Tab; text fields take typed
//! characters, selectors and toggles react to Left/Right and Space.

use chrono::{NaiveDate, Utc};

use crate::fields::Priority;
use crate::task::TaskDraft;
use crate::tui::input::InputField;
use crate::util::{due_at_local_noon, parse_due_input};

pub const TEXT_ORDER: usize = 0;
pub const DUE_ORDER: usize = 1;
pub const PRIORITY_ORDER: usize = 2;
pub const IMPORTANT_ORDER: usize = 3;
pub const ASSIGNED_ORDER: usize = 4;
pub const OUTDOOR_ORDER: usize = 5;
pub const LOCATION_ORDER: usize = 6;
const FIELD_COUNT: usize = 7;

pub struct TaskForm {
    pub text: InputField,
    pub due: InputField,
    pub location: InputField,
    pub priority: usize,
    pub priorities: Vec<Priority>,
    pub important: bool,
    pub assigned_to_me: bool,
    pub is_outdoor: bool,
    pub current_field: usize,
}

impl TaskForm {
    pub fn new() -> Self {
        Self {
            text: InputField::new(),
            due: InputField::new(),
            location: InputField::new(),
            priority: 1,
            priorities: vec![Priority::Low, Priority::Medium, Priority::High],
            important: false,
            assigned_to_me: false,
            is_outdoor: false,
            current_field: TEXT_ORDER,
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        // The location only matters for outdoor tasks.
        if self.current_field == LOCATION_ORDER && !self.is_outdoor {
            self.current_field = TEXT_ORDER;
        }
    }

    pub fn prev_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
        if self.current_field == LOCATION_ORDER && !self.is_outdoor {
            self.current_field = OUTDOOR_ORDER;
        }
    }

    /// The text input under focus, if the focused field is free text.
    pub fn active_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            TEXT_ORDER => Some(&mut self.text),
            DUE_ORDER => Some(&mut self.due),
            LOCATION_ORDER => Some(&mut self.location),
            _ => None,
        }
    }

    /// Cycle the selector or flip the toggle under focus.
    pub fn adjust(&mut self, forward: bool) {
        match self.current_field {
            PRIORITY_ORDER => {
                let n = self.priorities.len();
                self.priority = if forward {
                    (self.priority + 1) % n
                } else {
                    (self.priority + n - 1) % n
                };
            }
            IMPORTANT_ORDER => self.important = !self.important,
            ASSIGNED_ORDER => self.assigned_to_me = !self.assigned_to_me,
            OUTDOOR_ORDER => self.is_outdoor = !self.is_outdoor,
            _ => {}
        }
    }

    pub fn selected_priority(&self) -> Priority {
        self.priorities[self.priority]
    }

    /// Build a draft; an empty due field means "now".
    pub fn to_draft(&self, today: NaiveDate) -> Result<TaskDraft, String> {
        let due_text = self.due.value.trim();
        let date = if due_text.is_empty() {
            Utc::now()
        } else {
            let day = parse_due_input(due_text, today)
                .ok_or_else(|| format!("Unrecognised due date '{due_text}'"))?;
            due_at_local_noon(day)
        };

        let mut draft = TaskDraft::new(self.text.value.clone())
            .priority(self.selected_priority())
            .due(date)
            .important(self.important)
            .assigned_to_me(self.assigned_to_me);
        if self.is_outdoor {
            draft = draft.outdoor(self.location.value.clone());
        }
        Ok(draft)
    }
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}
