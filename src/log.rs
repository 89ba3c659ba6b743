//! Reading a single developer log.
//!
//! The merge uses [`read_log`]: a log that is missing, empty or unparseable
//! reads as an empty map, so one bad file never hides the tasks recorded in
//! everybody else's files. The write path uses [`load_log`], which fails on
//! anything it cannot read back, so a rewrite never drops tasks it did not
//! understand.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::slug_from_file;
use crate::task::{normalize_id, TaskRecord, TaskState};

/// Options threaded through every read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Surface per-file read failures as warnings instead of debug traces
    pub verbose: bool,
}

/// Tasks read from one developer's file.
#[derive(Debug, Clone, Default)]
pub struct DeveloperLog {
    pub path: PathBuf,
    /// Developer slug taken from the file name, when it follows the pattern
    pub owner: Option<String>,
    pub tasks: BTreeMap<String, TaskRecord>,
}

/// Read a developer log into a map keyed by normalized id, skipping it when
/// it cannot be read.
pub fn read_log(path: &Path, options: ReadOptions) -> BTreeMap<String, TaskRecord> {
    match load_log(path) {
        Ok(tasks) => tasks,
        Err(err) => {
            report_skip(path, &err.to_string(), options);
            BTreeMap::new()
        }
    }
}

/// Read a developer log into a map keyed by normalized id.
///
/// Missing and blank files are empty. Read and parse failures are errors.
pub fn load_log(path: &Path) -> Result<BTreeMap<String, TaskRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => {
            return Err(Error::OperationFailed(format!(
                "cannot read task log {}: {err}",
                path.display()
            )))
        }
    };
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let raw: BTreeMap<String, TaskRecord> = serde_json::from_str(&content).map_err(|err| {
        Error::OperationFailed(format!("cannot parse task log {}: {err}", path.display()))
    })?;

    let mut tasks = BTreeMap::new();
    for (key, mut record) in raw {
        let id = normalize_id(&key);
        if id.is_empty() {
            continue;
        }
        if record.name.trim().is_empty() {
            record.name = key.trim().to_string();
        }
        tasks.insert(id, record);
    }
    Ok(tasks)
}

/// Read a developer log and remember which developer owns it.
pub fn read_developer_log(path: &Path, state: TaskState, options: ReadOptions) -> DeveloperLog {
    DeveloperLog {
        path: path.to_path_buf(),
        owner: slug_from_file(path, state),
        tasks: read_log(path, options),
    }
}

fn report_skip(path: &Path, reason: &str, options: ReadOptions) {
    if options.verbose {
        tracing::warn!(path = %path.display(), reason, "skipping unreadable task log");
    } else {
        tracing::debug!(path = %path.display(), reason, "skipping unreadable task log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let tasks = read_log(&temp.path().join("running.alice.json"), ReadOptions::default());
        assert!(tasks.is_empty());
    }

    #[test]
    fn empty_and_corrupt_files_read_empty() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("running.alice.json");
        fs::write(&empty, "   \n").unwrap();
        assert!(read_log(&empty, ReadOptions::default()).is_empty());

        let corrupt = temp.path().join("running.bob.json");
        fs::write(&corrupt, "{ not json").unwrap();
        assert!(read_log(&corrupt, ReadOptions { verbose: true }).is_empty());
    }

    #[test]
    fn strict_load_reports_corrupt_files() {
        let temp = TempDir::new().unwrap();
        assert!(load_log(&temp.path().join("running.alice.json")).unwrap().is_empty());

        let blank = temp.path().join("running.bob.json");
        fs::write(&blank, "").unwrap();
        assert!(load_log(&blank).unwrap().is_empty());

        let negative = temp.path().join("running.carol.json");
        fs::write(
            &negative,
            r#"{ "bar": { "name": "Bar", "developerWorkTimes": { "carol": -1 } } }"#,
        )
        .unwrap();
        assert!(matches!(load_log(&negative), Err(Error::OperationFailed(_))));
        assert!(read_log(&negative, ReadOptions::default()).is_empty());
    }

    #[test]
    fn keys_are_normalized() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("running.alice.json");
        fs::write(&path, r#"{ "  Foo ": { "name": "Foo" }, "": { "name": "" } }"#).unwrap();
        let tasks = read_log(&path, ReadOptions::default());
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks["foo"].name, "Foo");
    }

    #[test]
    fn missing_name_falls_back_to_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("running.alice.json");
        fs::write(&path, r#"{ "Bar": { "description": "d" } }"#).unwrap();
        let tasks = read_log(&path, ReadOptions::default());
        assert_eq!(tasks["bar"].name, "Bar");
        assert_eq!(tasks["bar"].description.as_deref(), Some("d"));
    }

    #[test]
    fn developer_log_knows_its_owner() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("finished.mary_ann.json");
        fs::write(&path, "{}").unwrap();
        let log = read_developer_log(&path, TaskState::Finished, ReadOptions::default());
        assert_eq!(log.owner.as_deref(), Some("mary_ann"));
        assert!(log.tasks.is_empty());
    }
}
