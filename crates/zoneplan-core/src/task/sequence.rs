//! Natural task ordering.
//!
//! Tasks keep the order of their project; projects interleave by due date.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::Task;

/// Placement order used by the scheduling strategy: earliest due date first,
/// then project id, then position inside the project.
pub fn scheduling_order(a: &Task, b: &Task) -> Ordering {
    a.due_date
        .cmp(&b.due_date)
        .then_with(|| a.project_id.cmp(&b.project_id))
        .then_with(|| a.sequence_number.cmp(&b.sequence_number))
}

/// Orders tasks respecting project sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceManager;

impl SequenceManager {
    pub fn new() -> Self {
        Self
    }

    /// Group tasks by project, order each group by sequence number and merge
    /// the groups.
    ///
    /// The merge repeatedly takes the head of the project whose head is due
    /// earliest (ties go to the smaller project id), so a project's internal
    /// order is never broken even if a later step is due sooner.
    pub fn order_tasks(&self, tasks: &[Task]) -> Vec<Task> {
        let mut projects: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
        for task in tasks {
            projects.entry(task.project_id.as_str()).or_default().push(task);
        }

        for group in projects.values_mut() {
            group.sort_by_key(|t| t.sequence_number);
        }

        let mut cursors: Vec<(usize, Vec<&Task>)> =
            projects.into_values().map(|group| (0, group)).collect();
        let mut ordered = Vec::with_capacity(tasks.len());

        loop {
            let next = cursors
                .iter()
                .enumerate()
                .filter_map(|(i, (pos, group))| group.get(*pos).map(|task| (i, *task)))
                .min_by(|(_, a), (_, b)| {
                    a.due_date
                        .cmp(&b.due_date)
                        .then_with(|| a.project_id.cmp(&b.project_id))
                });

            match next {
                Some((i, task)) => {
                    ordered.push(task.clone());
                    cursors[i].0 += 1;
                }
                None => break,
            }
        }

        ordered
    }
}
