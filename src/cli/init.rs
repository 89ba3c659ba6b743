//! teamlog init command implementation
//!
//! Creates `.teamlog.toml` and the shared storage folder with its README.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};

use crate::config::{Config, Project, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit, OutputMode, Report};
use crate::storage::Storage;

pub struct InitOptions {
    pub name: String,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub max_hours: Option<u32>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub dir: Option<PathBuf>,
    pub output: OutputMode,
}

#[derive(serde::Serialize)]
struct InitReport {
    project: String,
    root: PathBuf,
    storage: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    storage: bool,
    readme: bool,
}

pub fn run(options: InitOptions) -> Result<()> {
    let root = match options.dir.clone() {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    ensure_dir(&root)?;

    let (project, created_config) = ensure_config(&root, &options)?;
    let storage = Storage::new(project.storage_path());
    let created_storage = ensure_dir(storage.root())?;
    let created_readme = ensure_readme(&storage, &project.config)?;

    let report = InitReport {
        project: project.config.name.clone(),
        root: project.root.clone(),
        storage: storage.root().to_path_buf(),
        created: InitCreated {
            config: created_config,
            storage: created_storage,
            readme: created_readme,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    if created_storage {
        created_items.push(format!("{}/", project.config.storage.folder));
    }
    if created_readme {
        created_items.push("README.txt".to_string());
    }

    let header = if created_items.is_empty() {
        "teamlog init: nothing to do".to_string()
    } else {
        format!("teamlog init: initialized {}", project.config.name)
    };

    let mut human = Report::new(header);
    human
        .field("Root", project.root.display().to_string())
        .field("Storage", storage.root().display().to_string());
    if !created_items.is_empty() {
        human.field("Created", created_items.join(", "));
    }
    if !created_config {
        human.warn(format!("{CONFIG_FILE} already exists; left unchanged"));
    }
    human
        .hint("teamlog developer set <name>")
        .hint("teamlog start <task>");

    emit(options.output, "init", &report, &human)
}

fn ensure_config(root: &Path, options: &InitOptions) -> Result<(Project, bool)> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "{CONFIG_FILE} exists but is not a file: {}",
                config_path.display()
            )));
        }
        return Ok((Project::load(&config_path)?, false));
    }

    let mut config = Config::named(&options.name);
    config.description = options
        .description
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    if let Some(folder) = options.folder.as_deref() {
        config.storage.folder = folder.trim().to_string();
    }
    if let Some(hours) = options.max_hours {
        config.max_hours_per_day = hours;
    }
    config.project_start = parse_date("start", options.start.as_deref())?;
    config.project_end = parse_date("end", options.end.as_deref())?;
    config.save(&config_path)?;

    Ok((
        Project {
            root: root.to_path_buf(),
            config,
        },
        true,
    ))
}

fn ensure_readme(storage: &Storage, config: &Config) -> Result<bool> {
    let path = storage.readme_file();
    if path.exists() {
        return Ok(false);
    }
    let content = format!(
        "This folder contains the time tracking files for {}.\n\
         Every developer writes running.<name>.json and finished.<name>.json.\n\
         Created: {}\n",
        config.name,
        Utc::now().to_rfc3339()
    );
    std::fs::write(&path, content)?;
    Ok(true)
}

fn parse_date(label: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|err| Error::InvalidArgument(format!("invalid {label} date '{value}': {err}")))
}

fn ensure_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::OperationFailed(format!(
                "Expected directory at {}",
                path.display()
            )));
        }
        return Ok(false);
    }

    std::fs::create_dir_all(path)?;
    Ok(true)
}
