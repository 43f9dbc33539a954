use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{parse_calendar_date, parse_instant, Task};

/// Tasks sharing one exact `(start_date, end_date)` pair.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cohort {
    pub start_date: String,
    pub end_date: String,
    pub tasks: Vec<Task>,
    pub completed_count: usize,
    pub total_count: usize,
    pub percentage: f64,
}

impl Cohort {
    pub fn rounded_percentage(&self) -> u32 {
        self.percentage.round() as u32
    }

    /// "Tasks for Jan 1, 2024 - Jan 5, 2024"; raw strings are used for dates that do not parse.
    pub fn heading(&self) -> String {
        format!(
            "Tasks for {} - {}",
            display_date(&self.start_date),
            display_date(&self.end_date)
        )
    }
}

fn display_date(raw: &str) -> String {
    parse_calendar_date(raw)
        .map(|date| date.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

pub fn completion_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let completed = completed.min(total);
    completed as f64 / total as f64 * 100.0
}

/// Groups tasks into cohorts ordered by the first appearance of each key
/// after a stable sort by start instant.
///
/// Grouping compares the date strings exactly; `2024-01-01` and
/// `2024-01-01T00:00:00Z` end up in different cohorts. Tasks whose start date
/// does not parse sort after all others, keeping their input order.
pub fn aggregate_cohorts(tasks: &[Task]) -> Vec<Cohort> {
    let mut sorted: Vec<(Option<DateTime<Utc>>, &Task)> = tasks
        .iter()
        .map(|task| (parse_instant(&task.start_date), task))
        .collect();
    sorted.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let mut index_by_key: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<Vec<Task>> = Vec::new();
    for (_, task) in sorted {
        let key = (task.start_date.as_str(), task.end_date.as_str());
        let index = *index_by_key.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[index].push(task.clone());
    }

    groups
        .into_iter()
        .map(|tasks| {
            let completed_count = tasks.iter().filter(|task| task.is_completed).count();
            let total_count = tasks.len();
            Cohort {
                start_date: tasks[0].start_date.clone(),
                end_date: tasks[0].end_date.clone(),
                completed_count,
                total_count,
                percentage: completion_percentage(completed_count, total_count),
                tasks,
            }
        })
        .collect()
}
