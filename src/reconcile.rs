//! Merge engine: folds every developer log of one state into a single view.
//!
//! Each field of a [`TaskRecord`] has exactly one merge function below and
//! every contribution goes through [`TaskMerge::absorb`]. All functions are
//! commutative, associative and idempotent over the set of files, except
//! work minutes, which are summed. Summing is safe because a file only
//! contributes its owner's minutes (see [`restrict_to_owner`]).
//!
//! | field                 | function                  |
//! |-----------------------|---------------------------|
//! | developerWorkTimes    | [`sum_minutes`]           |
//! | comments              | [`union_comments`]        |
//! | developerStartTimes   | [`earliest_per_key`]      |
//! | activeDevelopers      | [`union_set`]             |
//! | created               | [`earliest`]              |
//! | finished / finishedBy | [`latest_finish`]         |
//! | name, description, createdBy | [`Pick::offer`]    |

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::log::{read_developer_log, DeveloperLog, ReadOptions};
use crate::storage::{owned_by, Storage};
use crate::task::{TaskComment, TaskRecord, TaskState};

type CommentKey = (i64, String, String);

/// Merge every developer log of `state` found in `storage`.
pub fn merge_state(
    storage: &Storage,
    state: TaskState,
    options: ReadOptions,
) -> Result<BTreeMap<String, TaskRecord>> {
    let files = storage.state_files(state)?;
    tracing::debug!(state = %state, files = files.len(), "merging developer logs");
    let logs = files
        .iter()
        .map(|path| read_developer_log(path, state, options));
    Ok(merge_logs(logs))
}

/// Fold already-read developer logs into one map keyed by normalized id.
pub fn merge_logs<I>(logs: I) -> BTreeMap<String, TaskRecord>
where
    I: IntoIterator<Item = DeveloperLog>,
{
    let mut merged: BTreeMap<String, TaskMerge> = BTreeMap::new();
    for log in logs {
        for (id, record) in log.tasks {
            let contribution = restrict_to_owner(record, log.owner.as_deref());
            merged.entry(id).or_default().absorb(contribution);
        }
    }
    merged
        .into_iter()
        .map(|(id, merge)| (id, merge.finish()))
        .collect()
}

/// Remove finished ids from the running view and fold the owner-authored
/// fields still sitting in collaborators' running logs into the finished
/// record, so ending a task never hides someone else's minutes or comments.
pub fn reconcile_views(
    running: &mut BTreeMap<String, TaskRecord>,
    finished: &mut BTreeMap<String, TaskRecord>,
) {
    for (id, record) in finished.iter_mut() {
        let Some(stale) = running.remove(id) else {
            continue;
        };
        max_minutes(&mut record.developer_work_times, &stale.developer_work_times);
        earliest_per_key(
            &mut record.developer_start_times,
            &stale.developer_start_times,
        );
        let mut comments = comment_index(std::mem::take(&mut record.comments));
        union_comments(&mut comments, stale.comments);
        record.comments = comments.into_values().collect();
    }
}

/// A file is authoritative only for its owner's work minutes. Entries for
/// other developers are dropped before the sum so replicated snapshots can
/// never be counted twice.
pub fn restrict_to_owner(mut record: TaskRecord, owner: Option<&str>) -> TaskRecord {
    if let Some(owner) = owner {
        record
            .developer_work_times
            .retain(|developer, _| owned_by(developer, owner));
    }
    record
}

/// Accumulator for one task id.
#[derive(Debug, Default)]
pub struct TaskMerge {
    name: Pick,
    description: Pick,
    created_by: Pick,
    created: Option<DateTime<Utc>>,
    developer_start_times: BTreeMap<String, DateTime<Utc>>,
    developer_work_times: BTreeMap<String, u32>,
    active_developers: BTreeSet<String>,
    comments: BTreeMap<CommentKey, TaskComment>,
    finish: Option<(DateTime<Utc>, Option<String>)>,
}

impl TaskMerge {
    pub fn absorb(&mut self, source: TaskRecord) {
        let origin = source.created;

        self.name.offer(Some(source.name.as_str()), origin);
        self.description.offer(source.description.as_deref(), origin);
        self.created_by.offer(source.created_by.as_deref(), origin);

        earliest(&mut self.created, source.created);
        earliest_per_key(
            &mut self.developer_start_times,
            &source.developer_start_times,
        );
        sum_minutes(&mut self.developer_work_times, &source.developer_work_times);
        union_set(&mut self.active_developers, &source.active_developers);
        union_comments(&mut self.comments, source.comments);
        latest_finish(&mut self.finish, source.finished, source.finished_by);
    }

    pub fn finish(self) -> TaskRecord {
        let (finished, finished_by) = match self.finish {
            Some((at, by)) => (Some(at), by),
            None => (None, None),
        };
        TaskRecord {
            name: self.name.value.unwrap_or_default(),
            description: self.description.value,
            created: self.created,
            created_by: self.created_by.value,
            developer_start_times: self.developer_start_times,
            developer_work_times: self.developer_work_times,
            active_developers: self.active_developers,
            comments: self.comments.into_values().collect(),
            finished,
            finished_by,
            origin: None,
        }
    }
}

/// Fill-if-empty with a deterministic tie-break.
///
/// Among all non-empty offers the one from the earliest-created contribution
/// wins; contributions without a creation time rank last; equal origins fall
/// back to the lexicographically smaller value. The result depends only on
/// the set of offers, never on file order.
#[derive(Debug, Default, Clone)]
pub struct Pick {
    value: Option<String>,
    origin: Option<DateTime<Utc>>,
}

impl Pick {
    pub fn offer(&mut self, value: Option<&str>, origin: Option<DateTime<Utc>>) {
        let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
            return;
        };
        let replace = match &self.value {
            None => true,
            Some(current) => {
                let candidate = (origin.is_none(), origin, value);
                let held = (self.origin.is_none(), self.origin, current.as_str());
                candidate < held
            }
        };
        if replace {
            self.value = Some(value.to_string());
            self.origin = origin;
        }
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Per developer, add up the minutes each file contributes.
pub fn sum_minutes(target: &mut BTreeMap<String, u32>, source: &BTreeMap<String, u32>) {
    for (developer, minutes) in source {
        let entry = target.entry(developer.clone()).or_insert(0);
        *entry = entry.saturating_add(*minutes);
    }
}

/// Per developer, keep the larger counter. Used across states where both
/// sides are snapshots of the same owner's counter.
pub fn max_minutes(target: &mut BTreeMap<String, u32>, source: &BTreeMap<String, u32>) {
    for (developer, minutes) in source {
        let entry = target.entry(developer.clone()).or_insert(0);
        *entry = (*entry).max(*minutes);
    }
}

/// Per developer, keep the earliest start.
pub fn earliest_per_key(
    target: &mut BTreeMap<String, DateTime<Utc>>,
    source: &BTreeMap<String, DateTime<Utc>>,
) {
    for (developer, started) in source {
        target
            .entry(developer.clone())
            .and_modify(|current| {
                if started < current {
                    *current = *started;
                }
            })
            .or_insert(*started);
    }
}

pub fn union_set(target: &mut BTreeSet<String>, source: &BTreeSet<String>) {
    target.extend(source.iter().cloned());
}

/// Set-union of comments keyed by (second, developer, text). When the same
/// key shows up with different sub-second timestamps the earliest is kept.
/// Iterating the index yields comments in chronological order.
pub fn union_comments(target: &mut BTreeMap<CommentKey, TaskComment>, source: Vec<TaskComment>) {
    for comment in source {
        target
            .entry(comment.dedup_key())
            .and_modify(|current| {
                if comment.created < current.created {
                    *current = comment.clone();
                }
            })
            .or_insert(comment);
    }
}

pub fn earliest(target: &mut Option<DateTime<Utc>>, source: Option<DateTime<Utc>>) {
    *target = match (*target, source) {
        (Some(current), Some(candidate)) => Some(current.min(candidate)),
        (current, candidate) => current.or(candidate),
    };
}

/// Keep the latest finish time together with whoever recorded it. Equal
/// timestamps resolve to the larger developer name.
pub fn latest_finish(
    target: &mut Option<(DateTime<Utc>, Option<String>)>,
    finished: Option<DateTime<Utc>>,
    finished_by: Option<String>,
) {
    let Some(at) = finished else {
        return;
    };
    let candidate = (at, finished_by.filter(|by| !by.trim().is_empty()));
    match target {
        Some(current) if *current >= candidate => {}
        _ => *target = Some(candidate),
    }
}

fn comment_index(comments: Vec<TaskComment>) -> BTreeMap<CommentKey, TaskComment> {
    let mut index = BTreeMap::new();
    union_comments(&mut index, comments);
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, minute, 0).unwrap()
    }

    fn comment(hour: u32, developer: &str, text: &str) -> TaskComment {
        TaskComment {
            created: at(hour, 0),
            developer: developer.to_string(),
            comment: text.to_string(),
        }
    }

    fn log(owner: &str, records: Vec<TaskRecord>) -> DeveloperLog {
        DeveloperLog {
            path: PathBuf::from(format!("running.{owner}.json")),
            owner: Some(owner.to_string()),
            tasks: records.into_iter().map(|r| (r.id(), r)).collect(),
        }
    }

    fn alice_and_bob() -> Vec<DeveloperLog> {
        let mut alice = TaskRecord::new("Foo", Some("from alice".to_string()), "alice", at(10, 0));
        alice.add_work_minutes("alice", 60);
        alice.add_comment(comment(10, "alice", "started"));

        let mut bob = TaskRecord::new("foo", Some("from bob".to_string()), "bob", at(11, 0));
        bob.add_work_minutes("bob", 45);
        bob.add_comment(comment(11, "bob", "continued"));
        bob.add_comment(comment(10, "alice", "started"));

        vec![log("alice", vec![alice]), log("bob", vec![bob])]
    }

    #[test]
    fn merges_two_developers() {
        let merged = merge_logs(alice_and_bob());
        assert_eq!(merged.len(), 1);
        let task = &merged["foo"];
        assert_eq!(task.developer_work_times.get("alice"), Some(&60));
        assert_eq!(task.developer_work_times.get("bob"), Some(&45));
        assert_eq!(task.total_work_minutes(), 105);
        assert_eq!(task.comments.len(), 2);
        assert_eq!(task.created, Some(at(10, 0)));
        assert_eq!(task.developer_start_times.len(), 2);
        assert!(task.is_active("alice") && task.is_active("bob"));
    }

    #[test]
    fn fill_if_empty_fields_follow_earliest_created() {
        let forward = merge_logs(alice_and_bob());
        let mut reversed_logs = alice_and_bob();
        reversed_logs.reverse();
        let reversed = merge_logs(reversed_logs);

        for merged in [&forward, &reversed] {
            let task = &merged["foo"];
            assert_eq!(task.name, "Foo");
            assert_eq!(task.description.as_deref(), Some("from alice"));
            assert_eq!(task.created_by.as_deref(), Some("alice"));
        }
    }

    #[test]
    fn pick_is_order_independent_across_three_offers() {
        let offers = [
            (None, Some(at(10, 0))),
            (Some("b"), Some(at(11, 0))),
            (Some("c"), Some(at(12, 0))),
        ];
        let orders = [[0, 1, 2], [2, 0, 1], [1, 2, 0], [2, 1, 0]];
        for order in orders {
            let mut pick = Pick::default();
            for index in order {
                let (value, origin) = offers[index];
                pick.offer(value, origin);
            }
            assert_eq!(pick.value(), Some("b"));
        }
    }

    #[test]
    fn pick_without_origin_ranks_last() {
        let mut pick = Pick::default();
        pick.offer(Some("anonymous"), None);
        pick.offer(Some("dated"), Some(at(9, 0)));
        assert_eq!(pick.value(), Some("dated"));
    }

    #[test]
    fn foreign_minutes_are_ignored() {
        let mut alice = TaskRecord::new("Foo", None, "alice", at(10, 0));
        alice.add_work_minutes("alice", 30);
        // replicated snapshot of bob's counter from an older writer
        alice.add_work_minutes("bob", 20);
        let mut bob = TaskRecord::new("Foo", None, "bob", at(11, 0));
        bob.add_work_minutes("bob", 20);

        let merged = merge_logs(vec![log("alice", vec![alice]), log("bob", vec![bob])]);
        assert_eq!(merged["foo"].developer_work_times.get("alice"), Some(&30));
        assert_eq!(merged["foo"].developer_work_times.get("bob"), Some(&20));
    }

    #[test]
    fn duplicate_comments_collapse_at_second_precision() {
        let mut first = comment(10, "alice", "same");
        first.created += chrono::Duration::milliseconds(400);
        let mut second = comment(10, "alice", "same");
        second.created += chrono::Duration::milliseconds(100);

        let mut index = BTreeMap::new();
        union_comments(&mut index, vec![first]);
        union_comments(&mut index, vec![second.clone()]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.values().next().unwrap().created, second.created);
    }

    #[test]
    fn latest_finish_keeps_pair_together() {
        let mut finish = None;
        latest_finish(&mut finish, Some(at(12, 0)), Some("alice".to_string()));
        latest_finish(&mut finish, Some(at(13, 0)), Some("bob".to_string()));
        latest_finish(&mut finish, Some(at(11, 0)), Some("carol".to_string()));
        latest_finish(&mut finish, None, Some("dave".to_string()));
        assert_eq!(finish, Some((at(13, 0), Some("bob".to_string()))));
    }

    #[test]
    fn earliest_handles_missing_values() {
        let mut created = None;
        earliest(&mut created, Some(at(12, 0)));
        earliest(&mut created, None);
        earliest(&mut created, Some(at(9, 0)));
        assert_eq!(created, Some(at(9, 0)));
    }

    #[test]
    fn reconcile_moves_finished_out_of_running() {
        let mut alice = TaskRecord::new("Foo", None, "alice", at(10, 0));
        alice.add_participant("bob", at(11, 0));
        alice.add_work_minutes("alice", 30);
        alice.finish("alice", at(12, 0));
        let mut finished = merge_logs(vec![log("alice", vec![alice])]);

        let mut bob = TaskRecord::new("Foo", None, "alice", at(10, 0));
        bob.add_participant("bob", at(11, 0));
        bob.add_work_minutes("bob", 25);
        bob.add_comment(comment(11, "bob", "bob note"));
        let mut running = merge_logs(vec![log("bob", vec![bob])]);

        reconcile_views(&mut running, &mut finished);
        assert!(running.is_empty());
        let task = &finished["foo"];
        assert_eq!(task.developer_work_times.get("alice"), Some(&30));
        assert_eq!(task.developer_work_times.get("bob"), Some(&25));
        assert_eq!(task.comments.len(), 1);
        assert_eq!(task.finished_by.as_deref(), Some("alice"));
    }

    #[test]
    fn remerge_is_idempotent() {
        let once = merge_logs(alice_and_bob());
        let twice = merge_logs(alice_and_bob());
        assert_eq!(once, twice);
    }
}
