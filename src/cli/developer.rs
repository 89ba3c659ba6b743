//! teamlog developer command implementation
//!
//! Provides developer identity helpers (set/show).

use std::path::PathBuf;

use crate::developer::{profile_dir, DeveloperProfile, IdentitySource, ResolvedDeveloper};
use crate::error::{Error, Result};
use crate::output::{emit, OutputMode, Report};
use crate::storage::developer_slug;

/// Options for `teamlog developer set`
pub struct SetOptions {
    pub name: String,
    pub email: Option<String>,
    pub hours_per_day: Option<u32>,
    pub output: OutputMode,
}

/// Options for `teamlog developer show`
pub struct ShowOptions {
    pub developer: Option<String>,
    pub output: OutputMode,
}

#[derive(serde::Serialize)]
struct DeveloperSetReport {
    developer: String,
    slug: String,
    path: PathBuf,
    hours_per_day: u32,
}

#[derive(serde::Serialize)]
struct DeveloperShowReport {
    developer: Option<String>,
    slug: Option<String>,
    source: Option<IdentitySource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hours_per_day: Option<u32>,
}

pub fn run_set(options: SetOptions) -> Result<()> {
    let dir = profile_dir()?;

    let mut profile = DeveloperProfile::load(&dir)?.unwrap_or_else(|| DeveloperProfile::new(&options.name));
    profile.name = options.name.trim().to_string();
    if let Some(email) = options.email {
        let email = email.trim().to_string();
        profile.email = if email.is_empty() { None } else { Some(email) };
    }
    if let Some(hours) = options.hours_per_day {
        profile.hours_per_day = hours;
    }
    let path = profile.save(&dir)?;

    let report = DeveloperSetReport {
        developer: profile.name.clone(),
        slug: developer_slug(&profile.name),
        path: path.clone(),
        hours_per_day: profile.hours_per_day,
    };

    let mut human = Report::new(format!("Developer set: {}", profile.name));
    human
        .field("Files", format!("running.{0}.json, finished.{0}.json", report.slug))
        .field("Hours per day", profile.hours_per_day.to_string())
        .field("Profile", path.display().to_string())
        .hint("teamlog list");

    emit(options.output, "developer set", &report, &human)
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let dir = profile_dir().ok();
    let resolved = match ResolvedDeveloper::resolve(options.developer.as_deref(), dir.as_deref()) {
        Ok(resolved) => Some(resolved),
        Err(Error::DeveloperNotConfigured) => None,
        Err(err) => return Err(err),
    };

    let report = match &resolved {
        Some(resolved) => DeveloperShowReport {
            developer: Some(resolved.name.clone()),
            slug: Some(developer_slug(&resolved.name)),
            source: Some(resolved.source),
            email: resolved.profile.as_ref().and_then(|p| p.email.clone()),
            hours_per_day: resolved.profile.as_ref().map(|p| p.hours_per_day),
        },
        None => DeveloperShowReport {
            developer: None,
            slug: None,
            source: None,
            email: None,
            hours_per_day: None,
        },
    };

    let human = match &resolved {
        Some(resolved) => {
            let mut human = Report::new(format!("Developer: {}", resolved.name));
            human.field("Source", format!("{:?}", resolved.source).to_lowercase());
            if let Some(slug) = report.slug.as_deref() {
                human.field("Files", format!("running.{slug}.json, finished.{slug}.json"));
            }
            if let Some(email) = report.email.as_deref() {
                human.field("Email", email);
            }
            if let Some(hours) = report.hours_per_day {
                human.field("Hours per day", hours.to_string());
            }
            human
        }
        None => {
            let mut human = Report::new("Developer: not set");
            human
                .warn("developer not set; mutating commands will fail")
                .hint("teamlog developer set <name>");
            human
        }
    };

    emit(options.output, "developer show", &report, &human)
}
