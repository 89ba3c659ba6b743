#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use assert_cmd::Command;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use teamlog::config::{Config, CONFIG_FILE};
use teamlog::ledger::{Clock, TaskLedger};
use teamlog::log::ReadOptions;

/// Clock shared between a test and the ledgers it drives.
#[derive(Clone)]
pub struct TestClock(Rc<Cell<DateTime<Utc>>>);

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.0.set(now);
    }

    pub fn advance(&self, minutes: i64) {
        self.0.set(self.0.get() + Duration::minutes(minutes));
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, minute, 0).unwrap()
}

/// A project directory with `.teamlog.toml` and a shared storage folder.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        Config::named("Test Project").save(&dir.path().join(CONFIG_FILE))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn storage(&self) -> PathBuf {
        self.dir.path().join("timework")
    }

    pub fn ledger(&self, developer: &str, clock: &TestClock) -> TaskLedger {
        TaskLedger::new(
            &self.storage(),
            Box::new(developer.to_string()),
            Box::new(clock.clone()),
            ReadOptions { verbose: true },
        )
        .expect("ledger")
    }

    pub fn write_log(&self, file_name: &str, contents: &str) -> std::io::Result<PathBuf> {
        fs::create_dir_all(self.storage())?;
        let path = self.storage().join(file_name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_log(&self, file_name: &str) -> serde_json::Value {
        let contents = fs::read_to_string(self.storage().join(file_name)).expect("read log");
        serde_json::from_str(&contents).expect("parse log")
    }

    /// `teamlog` command running inside the project with an isolated profile
    /// directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("teamlog").expect("binary");
        cmd.current_dir(self.path())
            .env("TEAMLOG_HOME", self.path().join(".profile"))
            .env_remove("TEAMLOG_DEVELOPER")
            .env_remove("TEAMLOG_PROJECT")
            .env_remove("RUST_LOG");
        cmd
    }
}
