//! In-memory task source and calendar.
//!
//! Used by the CLI for file-based planning and by tests.

use chrono::NaiveDateTime;

use super::{CalendarSource, TaskSource};
use crate::error::Result;
use crate::task::Task;
use crate::timeblock::Event;

/// Task list held in memory. Records which tasks were marked scheduled.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskSource {
    tasks: Vec<Task>,
    scheduled: Vec<String>,
}

impl InMemoryTaskSource {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            scheduled: Vec::new(),
        }
    }

    /// Ids passed to `mark_scheduled`, in call order.
    pub fn scheduled_ids(&self) -> &[String] {
        &self.scheduled
    }
}

impl TaskSource for InMemoryTaskSource {
    fn get_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.clone())
    }

    fn mark_scheduled(&mut self, task_id: &str) -> Result<()> {
        self.scheduled.push(task_id.to_string());
        Ok(())
    }
}

/// Calendar held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCalendar {
    events: Vec<Event>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn managed_events(&self) -> Vec<&Event> {
        self.events.iter().filter(|e| e.is_managed()).collect()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl CalendarSource for InMemoryCalendar {
    fn get_events(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Event>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.overlaps(start, end))
            .cloned()
            .collect())
    }

    fn create_event(&mut self, mut event: Event) -> Result<String> {
        if event.id.is_empty() {
            event.id = uuid::Uuid::new_v4().to_string();
        }
        let id = event.id.clone();
        self.events.push(event);
        Ok(id)
    }

    fn remove_managed_events(&mut self) -> Result<()> {
        self.events.retain(|e| !e.is_managed());
        Ok(())
    }
}
