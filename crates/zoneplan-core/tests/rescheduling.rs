//! Scheduler orchestration against in-memory and failing collaborators.

use chrono::{NaiveDate, NaiveDateTime};
use zoneplan_core::error::Result;
use zoneplan_core::{
    CalendarSource, CoreError, EnergyLevel, Event, FixedClock, InMemoryCalendar,
    InMemoryTaskSource, Scheduler, Task, TaskConstraints, TaskOutcome, ZoneType,
};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn deep(id: &str, duration: i64, buffer: i64) -> Task {
    Task::new(
        id,
        id,
        duration,
        at(20, 0, 0),
        TaskConstraints::new(ZoneType::Deep, EnergyLevel::High).with_buffer(buffer),
    )
}

fn scheduler(tasks: Vec<Task>, events: Vec<Event>) -> Scheduler<InMemoryTaskSource, InMemoryCalendar> {
    Scheduler::new(
        InMemoryTaskSource::new(tasks),
        InMemoryCalendar::with_events(events),
    )
    .with_clock(FixedClock(at(4, 7, 30)))
}

fn managed_spans(calendar: &InMemoryCalendar) -> Vec<(String, NaiveDateTime, NaiveDateTime)> {
    calendar
        .managed_events()
        .into_iter()
        .map(|e| (e.id.clone(), e.start, e.end))
        .collect()
}

#[test]
fn test_repeated_scheduling_is_idempotent() {
    let tasks = vec![deep("a", 60, 15), deep("b", 90, 15), deep("c", 45, 15)];
    let mut scheduler = scheduler(
        tasks,
        vec![Event::fixed("lunch", "Lunch", at(4, 11, 0), at(4, 12, 0))],
    );

    let first = scheduler.schedule_tasks(7).unwrap();
    let spans = managed_spans(scheduler.calendar());
    let second = scheduler.schedule_tasks(7).unwrap();

    assert_eq!(first, second);
    assert_eq!(managed_spans(scheduler.calendar()), spans);
    assert_eq!(scheduler.calendar().events().len(), 1 + first.events.len());
}

#[test]
fn test_reschedule_avoids_given_fixed_events() {
    let mut scheduler = scheduler(Vec::new(), Vec::new());
    let fixed = vec![Event::fixed("m", "Meeting", at(4, 9, 0), at(4, 10, 0))];

    let report = scheduler
        .reschedule(&[deep("a", 60, 15)], None, Some(fixed))
        .unwrap();

    assert_eq!(report.events[0].start, at(4, 10, 15));
    assert_eq!(managed_spans(scheduler.calendar()).len(), 1);
}

#[test]
fn test_task_buffer_larger_than_zone_buffer_wins() {
    let mut scheduler = scheduler(Vec::new(), Vec::new());
    let fixed = vec![Event::fixed("m", "Meeting", at(4, 9, 0), at(4, 10, 0))];

    let report = scheduler
        .reschedule(&[deep("a", 60, 30)], None, Some(fixed))
        .unwrap();

    assert_eq!(report.events[0].start, at(4, 10, 30));
    assert_eq!(report.events[0].end, at(4, 11, 30));
}

#[test]
fn test_reschedule_drops_events_of_removed_tasks() {
    let mut scheduler = scheduler(vec![deep("a", 60, 15), deep("b", 60, 15)], Vec::new());
    scheduler.schedule_tasks(7).unwrap();
    assert_eq!(managed_spans(scheduler.calendar()).len(), 2);

    let affected = vec!["a".to_string()];
    let report = scheduler
        .reschedule(&[deep("b", 60, 15)], Some(&affected), None)
        .unwrap();

    assert_eq!(report.scheduled_task_ids(), vec!["b"]);
    let spans = managed_spans(scheduler.calendar());
    assert_eq!(spans, vec![("b".to_string(), at(4, 9, 0), at(4, 10, 0))]);
}

#[test]
fn test_only_placed_tasks_are_marked_scheduled() {
    let light = Task::new(
        "light",
        "Light",
        30,
        at(20, 0, 0),
        TaskConstraints::new(ZoneType::Light, EnergyLevel::Low),
    );
    let mut scheduler = scheduler(vec![deep("a", 60, 15), light], Vec::new());

    let report = scheduler.schedule_tasks(7).unwrap();

    assert!(!report.is_complete());
    assert!(matches!(
        report.outcome_for("light"),
        Some(TaskOutcome::Deferred { .. })
    ));
    assert_eq!(scheduler.task_source().scheduled_ids(), ["a"]);
}

struct OfflineCalendar;

impl CalendarSource for OfflineCalendar {
    fn get_events(&self, _start: NaiveDateTime, _end: NaiveDateTime) -> Result<Vec<Event>> {
        Err(CoreError::collaborator("calendar", "offline"))
    }

    fn create_event(&mut self, _event: Event) -> Result<String> {
        Err(CoreError::collaborator("calendar", "offline"))
    }

    fn remove_managed_events(&mut self) -> Result<()> {
        Err(CoreError::collaborator("calendar", "offline"))
    }
}

#[test]
fn test_calendar_failure_propagates() {
    let mut scheduler = Scheduler::new(InMemoryTaskSource::new(vec![deep("a", 60, 15)]), OfflineCalendar)
        .with_clock(FixedClock(at(4, 7, 30)));

    let err = scheduler.schedule_tasks(7).unwrap_err();
    assert!(matches!(err, CoreError::Source { ref source_name, .. } if source_name == "calendar"));
    assert!(scheduler.task_source().scheduled_ids().is_empty());
}
