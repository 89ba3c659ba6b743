//! Working time statistics over the merged task views.
//!
//! Focus time is what developers booked explicitly. Elapsed time is measured
//! per participant from their own start to the task's finish, or to now for
//! running tasks.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::task::TaskRecord;

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeveloperStats {
    pub developer: String,
    pub tasks: usize,
    pub focus_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkSummary {
    pub generated_at: DateTime<Utc>,
    pub running_tasks: usize,
    pub finished_tasks: usize,
    /// Focus time booked across running and finished tasks
    pub total_focus_minutes: u64,
    /// Sum over finished tasks and participants of `finished - start`
    pub finished_elapsed_minutes: i64,
    /// Sum over running tasks and participants of `now - start`
    pub running_elapsed_minutes: i64,
    /// Earliest start to latest finish, or to now when nothing is finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_span_minutes: Option<i64>,
    pub developers: Vec<DeveloperStats>,
}

pub fn compute(running: &[TaskRecord], finished: &[TaskRecord], now: DateTime<Utc>) -> WorkSummary {
    let all = || running.iter().chain(finished.iter());

    let total_focus_minutes = all().map(TaskRecord::total_work_minutes).sum();

    let finished_elapsed: Duration = finished
        .iter()
        .filter_map(|task| task.finished.map(|end| (task, end)))
        .flat_map(|(task, end)| task.developer_start_times.values().map(move |start| end - *start))
        .fold(Duration::zero(), |acc, elapsed| acc + elapsed.max(Duration::zero()));

    let running_elapsed: Duration = running
        .iter()
        .flat_map(|task| task.developer_start_times.values())
        .fold(Duration::zero(), |acc, start| {
            acc + (now - *start).max(Duration::zero())
        });

    let earliest_start = all()
        .flat_map(|task| task.developer_start_times.values().copied())
        .min();
    let latest_finish = finished.iter().filter_map(|task| task.finished).max();
    let working_span_minutes =
        earliest_start.map(|start| (latest_finish.unwrap_or(now) - start).num_minutes());

    let mut per_developer: BTreeMap<String, DeveloperStats> = BTreeMap::new();
    for task in all() {
        for developer in task.developer_start_times.keys() {
            per_developer
                .entry(developer.clone())
                .or_insert_with(|| empty_stats(developer))
                .tasks += 1;
        }
        for (developer, minutes) in &task.developer_work_times {
            per_developer
                .entry(developer.clone())
                .or_insert_with(|| empty_stats(developer))
                .focus_minutes += u64::from(*minutes);
        }
    }

    WorkSummary {
        generated_at: now,
        running_tasks: running.len(),
        finished_tasks: finished.len(),
        total_focus_minutes,
        finished_elapsed_minutes: finished_elapsed.num_minutes(),
        running_elapsed_minutes: running_elapsed.num_minutes(),
        working_span_minutes,
        developers: per_developer.into_values().collect(),
    }
}

fn empty_stats(developer: &str) -> DeveloperStats {
    DeveloperStats {
        developer: developer.to_string(),
        tasks: 0,
        focus_minutes: 0,
    }
}

/// Render a minute count as `N minutes`, `N hours` or `N days and M hours`.
pub fn human_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    if minutes < MINUTES_PER_HOUR {
        format!("{minutes} minutes")
    } else if minutes < MINUTES_PER_DAY {
        format!("{} hours", minutes / MINUTES_PER_HOUR)
    } else {
        let rest = minutes % MINUTES_PER_DAY;
        format!(
            "{} days and {} hours",
            minutes / MINUTES_PER_DAY,
            rest / MINUTES_PER_HOUR
        )
    }
}

pub fn human_elapsed(elapsed: Duration) -> String {
    human_duration(elapsed.num_minutes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn human_duration_buckets() {
        assert_eq!(human_duration(0), "0 minutes");
        assert_eq!(human_duration(59), "59 minutes");
        assert_eq!(human_duration(60), "1 hours");
        assert_eq!(human_duration(1439), "23 hours");
        assert_eq!(human_duration(1440 + 150), "1 days and 2 hours");
        assert_eq!(human_duration(-5), "0 minutes");
        assert_eq!(human_elapsed(Duration::minutes(90)), "1 hours");
    }

    #[test]
    fn summary_over_running_and_finished() {
        let mut done = TaskRecord::new("Done", None, "alice", at(1, 8));
        done.add_participant("bob", at(1, 10));
        done.add_work_minutes("alice", 60);
        done.add_work_minutes("bob", 30);
        done.finish("alice", at(1, 12));

        let mut open = TaskRecord::new("Open", None, "bob", at(2, 9));
        open.add_work_minutes("bob", 15);

        let summary = compute(&[open], &[done], at(2, 10));
        assert_eq!(summary.running_tasks, 1);
        assert_eq!(summary.finished_tasks, 1);
        assert_eq!(summary.total_focus_minutes, 105);
        // alice 4h + bob 2h
        assert_eq!(summary.finished_elapsed_minutes, 360);
        assert_eq!(summary.running_elapsed_minutes, 60);
        assert_eq!(summary.working_span_minutes, Some(4 * 60));

        let bob = &summary.developers[1];
        assert_eq!(bob.developer, "bob");
        assert_eq!(bob.tasks, 2);
        assert_eq!(bob.focus_minutes, 45);
    }

    #[test]
    fn span_runs_to_now_without_finished_tasks() {
        let open = TaskRecord::new("Open", None, "bob", at(2, 9));
        let summary = compute(&[open], &[], at(2, 11));
        assert_eq!(summary.working_span_minutes, Some(120));

        let empty = compute(&[], &[], at(2, 11));
        assert_eq!(empty.working_span_minutes, None);
        assert!(empty.developers.is_empty());
    }
}
