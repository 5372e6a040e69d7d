//! In-memory UI state and its transitions.
//!
//! Mutations are confirmed-then-applied: the task list only changes once the
//! server acknowledges, delivered as a [`UiEvent`] from the spawned client
//! call. There is no optimistic update and therefore no rollback path.

use chrono::NaiveDate;
use tracing::warn;

use crate::tasks::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    List,
    Assistant,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Self::Input => Self::List,
            Self::List => Self::Assistant,
            Self::Assistant => Self::Input,
        }
    }
}

/// Completed client call, applied to the state on the next frame.
#[derive(Debug)]
pub enum UiEvent {
    TasksLoaded(Vec<Task>),
    TaskCreated(Task),
    /// `None` means the server matched no row — treated as a no-op.
    TaskToggled(Option<Task>),
    TaskDeleted(i64),
    Error(String),
}

/// Tasks for the selected date, split by completion. Rebuilt on every render.
pub struct DayView<'a> {
    pub active: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
}

impl DayView<'_> {
    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.completed.is_empty()
    }

    /// Task at a flat index spanning active entries then completed ones.
    pub fn get(&self, idx: usize) -> Option<&Task> {
        if idx < self.active.len() {
            self.active.get(idx).copied()
        } else {
            self.completed.get(idx - self.active.len()).copied()
        }
    }
}

pub struct AppState {
    /// Full task list, newest first — mirrors the server ordering.
    pub tasks: Vec<Task>,
    pub selected_date: NaiveDate,
    /// Pending new-task title.
    pub input: String,
    /// Pending assistant message.
    pub chat_input: String,
    pub focus: Focus,
    /// Flat selection index into the day view (active entries first).
    pub selected: usize,
}

impl AppState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            tasks: Vec::new(),
            selected_date: today,
            input: String::new(),
            chat_input: String::new(),
            focus: Focus::Input,
            selected: 0,
        }
    }

    pub fn selected_date_str(&self) -> String {
        self.selected_date.format("%Y-%m-%d").to_string()
    }

    /// Derive the active/completed split for the selected date.
    pub fn day_view(&self) -> DayView<'_> {
        let date = self.selected_date_str();
        let mut active = Vec::new();
        let mut completed = Vec::new();
        for task in &self.tasks {
            if task.task_date != date {
                continue;
            }
            if task.completed {
                completed.push(task);
            } else {
                active.push(task);
            }
        }
        DayView { active, completed }
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::TasksLoaded(tasks) => {
                self.tasks = tasks;
            }
            UiEvent::TaskCreated(task) => {
                self.tasks.insert(0, task);
                self.input.clear();
            }
            UiEvent::TaskToggled(Some(updated)) => {
                if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == updated.id) {
                    *slot = updated;
                }
            }
            UiEvent::TaskToggled(None) => {}
            UiEvent::TaskDeleted(id) => {
                self.tasks.retain(|t| t.id != id);
            }
            UiEvent::Error(msg) => {
                // Prior state stays untouched on failure.
                warn!(err = %msg, "task operation failed");
            }
        }
        self.clamp_selection();
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        let len = self.day_view().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
        }
    }

    pub fn shift_date(&mut self, days: i64) {
        self.selected_date = self.selected_date + chrono::Duration::days(days);
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.day_view().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}
