//! The authoritative in-memory task collection.
//!
//! Tasks are partitioned into `active` and `completed` sequences; a task lives
//! in exactly one of them and its `completed` flag says which. Mutations are
//! expressed as a closed `TaskAction` command consumed by `TaskStore::dispatch`,
//! with a direct method per operation for callers that prefer them.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use crate::error::TaskError;
use crate::fields::FilterKey;
use crate::task::{Task, TaskDraft, TaskId};

/// A mutation of the task store.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    Add(TaskDraft),
    Delete(TaskId),
    ToggleCompleted(TaskId),
    ToggleImportant(TaskId),
    SetFilter(FilterKey),
    /// Drop every task and reset the filter.
    Clear,
    /// Return to the initial state (logout).
    Reset,
}

/// What a dispatched action did.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Added(TaskId),
    /// The removed task, or `None` if the id was unknown.
    Deleted(Option<Task>),
    /// The new flag value, or `None` if the id was unknown.
    Toggled(Option<bool>),
    FilterSet(FilterKey),
    Cleared,
}

/// In-memory task store. Nothing here is persisted.
#[derive(Debug, Default, Serialize)]
pub struct TaskStore {
    active: Vec<Task>,
    completed: Vec<Task>,
    filter: FilterKey,
    loading: bool,
    error: Option<String>,
    #[serde(skip)]
    last_id: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action.
    pub fn dispatch(&mut self, action: TaskAction) -> Result<Applied, TaskError> {
        let applied = match action {
            TaskAction::Add(draft) => Applied::Added(self.add_task(draft)?),
            TaskAction::Delete(id) => Applied::Deleted(self.delete_task(id)),
            TaskAction::ToggleCompleted(id) => Applied::Toggled(self.toggle_completed(id)),
            TaskAction::ToggleImportant(id) => Applied::Toggled(self.toggle_important(id)),
            TaskAction::SetFilter(key) => {
                self.set_filter(key);
                Applied::FilterSet(key)
            }
            TaskAction::Clear => {
                self.clear();
                Applied::Cleared
            }
            TaskAction::Reset => {
                self.reset();
                Applied::Cleared
            }
        };
        debug_assert!(self.is_consistent());
        Ok(applied)
    }

    /// Validate `draft`, assign it an id and append it to the active list.
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<TaskId, TaskError> {
        draft.validate()?;
        let id = self.next_id();
        let task = Task::from_draft(id, draft, Utc::now());
        tracing::debug!(task_id = %id, text = %task.text, "task added");
        self.active.push(task);
        Ok(id)
    }

    /// Remove the task from whichever collection holds it. Unknown ids are ignored.
    pub fn delete_task(&mut self, id: TaskId) -> Option<Task> {
        let removed = take(&mut self.active, id).or_else(|| take(&mut self.completed, id));
        if removed.is_some() {
            tracing::debug!(task_id = %id, "task deleted");
        }
        removed
    }

    /// Flip completion and move the task to the end of the other collection.
    ///
    /// Returns the new `completed` value, or `None` for an unknown id.
    pub fn toggle_completed(&mut self, id: TaskId) -> Option<bool> {
        if let Some(mut task) = take(&mut self.active, id) {
            task.completed = true;
            task.completed_at = Some(Utc::now());
            tracing::debug!(task_id = %id, "task completed");
            self.completed.push(task);
            return Some(true);
        }
        if let Some(mut task) = take(&mut self.completed, id) {
            task.completed = false;
            task.completed_at = None;
            tracing::debug!(task_id = %id, "task reopened");
            self.active.push(task);
            return Some(false);
        }
        None
    }

    /// Flip the important flag wherever the task lives.
    pub fn toggle_important(&mut self, id: TaskId) -> Option<bool> {
        let task = self.get_mut(id)?;
        task.important = !task.important;
        Some(task.important)
    }

    pub fn set_filter(&mut self, key: FilterKey) {
        self.filter = key;
    }

    /// Parse and apply a filter key given as text.
    pub fn set_filter_str(&mut self, key: &str) -> Result<FilterKey, TaskError> {
        let key: FilterKey = key.parse()?;
        self.set_filter(key);
        Ok(key)
    }

    /// Drop all tasks and show everything again.
    pub fn clear(&mut self) {
        self.active.clear();
        self.completed.clear();
        self.filter = FilterKey::All;
    }

    /// Back to the initial state. Ids keep counting up so a reused id can
    /// never pick up a stale weather result.
    pub fn reset(&mut self) {
        self.clear();
        self.loading = false;
        self.error = None;
        tracing::debug!("task store reset");
    }

    pub fn active(&self) -> &[Task] {
        &self.active
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn filter(&self) -> FilterKey {
        self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Every task, active ones first.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.active.iter().chain(self.completed.iter())
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.active
            .iter_mut()
            .chain(self.completed.iter_mut())
            .find(|t| t.id == id)
    }

    /// Check the partition invariant: no id in both lists, no duplicate ids,
    /// and every flag matching its list.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        self.active.iter().all(|t| !t.completed && t.completed_at.is_none())
            && self.completed.iter().all(|t| t.completed && t.completed_at.is_some())
            && self.iter().all(|t| seen.insert(t.id))
    }

    fn next_id(&mut self) -> TaskId {
        self.last_id += 1;
        TaskId(self.last_id)
    }
}

fn take(tasks: &mut Vec<Task>, id: TaskId) -> Option<Task> {
    let idx = tasks.iter().position(|t| t.id == id)?;
    Some(tasks.remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> TaskStore {
        let mut store = TaskStore::new();
        for text in ["Buy milk", "Walk dog", "File taxes"] {
            store.add_task(TaskDraft::new(text)).unwrap();
        }
        store
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id.0).collect()
    }

    #[rstest]
    fn add_appends_incomplete_task_in_order(store: TaskStore) {
        assert_eq!(ids(store.active()), vec![1, 2, 3]);
        assert!(store.completed().is_empty());
        assert!(store.active().iter().all(|t| !t.completed));
    }

    #[rstest]
    fn add_rejects_empty_text() {
        let mut store = TaskStore::new();
        let err = store.add_task(TaskDraft::new("  ")).unwrap_err();
        assert!(matches!(err, TaskError::InvalidTask(_)));
        assert!(store.is_empty());
    }

    #[rstest]
    fn ids_are_never_reused(mut store: TaskStore) {
        store.delete_task(TaskId(3));
        store.reset();
        let id = store.add_task(TaskDraft::new("Again")).unwrap();
        assert_eq!(id, TaskId(4));
    }

    #[rstest]
    fn toggle_completed_moves_task_to_end_of_completed(mut store: TaskStore) {
        assert_eq!(store.toggle_completed(TaskId(1)), Some(true));
        assert_eq!(store.toggle_completed(TaskId(3)), Some(true));
        assert_eq!(ids(store.active()), vec![2]);
        assert_eq!(ids(store.completed()), vec![1, 3]);
        let done = store.get(TaskId(1)).unwrap();
        assert!(done.completed);
        assert!(done.completed_at.is_some());
        assert!(store.is_consistent());
    }

    #[rstest]
    fn toggle_completed_twice_returns_task_to_active(mut store: TaskStore) {
        store.toggle_completed(TaskId(2));
        assert_eq!(store.toggle_completed(TaskId(2)), Some(false));
        assert!(store.completed().is_empty());
        let task = store.get(TaskId(2)).unwrap();
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        // Reopened tasks go to the end of the active list.
        assert_eq!(ids(store.active()), vec![1, 3, 2]);
    }

    #[rstest]
    fn toggles_on_unknown_id_are_no_ops(mut store: TaskStore) {
        assert_eq!(store.toggle_completed(TaskId(99)), None);
        assert_eq!(store.toggle_important(TaskId(99)), None);
        assert_eq!(ids(store.active()), vec![1, 2, 3]);
    }

    #[rstest]
    fn toggle_important_works_in_both_collections(mut store: TaskStore) {
        store.toggle_completed(TaskId(1));
        assert_eq!(store.toggle_important(TaskId(1)), Some(true));
        assert_eq!(store.toggle_important(TaskId(2)), Some(true));
        assert_eq!(store.toggle_important(TaskId(2)), Some(false));
        assert!(store.get(TaskId(1)).unwrap().important);
        assert_eq!(ids(store.completed()), vec![1]);
    }

    #[rstest]
    fn delete_is_idempotent(mut store: TaskStore) {
        store.toggle_completed(TaskId(2));
        assert!(store.delete_task(TaskId(2)).is_some());
        let once = (ids(store.active()), ids(store.completed()));
        assert!(store.delete_task(TaskId(2)).is_none());
        assert_eq!((ids(store.active()), ids(store.completed())), once);
    }

    #[rstest]
    fn set_filter_str_validates(mut store: TaskStore) {
        assert_eq!(store.set_filter_str("important"), Ok(FilterKey::Important));
        assert!(store.set_filter_str("someday").is_err());
        assert_eq!(store.filter(), FilterKey::Important);
    }

    #[rstest]
    fn reset_clears_everything(mut store: TaskStore) {
        store.toggle_completed(TaskId(1));
        store.set_filter(FilterKey::Completed);
        store.dispatch(TaskAction::Reset).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.filter(), FilterKey::All);
        assert!(!store.is_loading());
        assert_eq!(store.error(), None);
    }

    #[rstest]
    fn dispatch_reports_what_happened(mut store: TaskStore) {
        let added = store
            .dispatch(TaskAction::Add(TaskDraft::new("Call mum").priority(Priority::High)))
            .unwrap();
        assert_eq!(added, Applied::Added(TaskId(4)));
        assert_eq!(
            store.dispatch(TaskAction::ToggleCompleted(TaskId(4))).unwrap(),
            Applied::Toggled(Some(true))
        );
        match store.dispatch(TaskAction::Delete(TaskId(4))).unwrap() {
            Applied::Deleted(Some(task)) => assert_eq!(task.text, "Call mum"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(
            store.dispatch(TaskAction::Delete(TaskId(4))).unwrap(),
            Applied::Deleted(None)
        );
    }

    #[rstest]
    fn partition_holds_across_mixed_operations(mut store: TaskStore) {
        let script = [
            TaskAction::ToggleCompleted(TaskId(1)),
            TaskAction::ToggleImportant(TaskId(1)),
            TaskAction::ToggleCompleted(TaskId(3)),
            TaskAction::Delete(TaskId(2)),
            TaskAction::ToggleCompleted(TaskId(1)),
            TaskAction::Add(TaskDraft::new("New")),
            TaskAction::ToggleCompleted(TaskId(4)),
            TaskAction::Delete(TaskId(42)),
        ];
        for action in script {
            store.dispatch(action).unwrap();
            assert!(store.is_consistent());
        }
        assert_eq!(ids(store.active()), vec![1]);
        assert_eq!(ids(store.completed()), vec![3, 4]);
    }
}
