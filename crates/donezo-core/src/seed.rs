use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::datetime::{Zone, parse_due_input};
use crate::task::{Priority, Project, Tag, Task, TaskId};

/// Startup data handed to the store.
#[derive(Debug, Clone)]
pub struct Seed {
    pub catalog: Catalog,
    pub tasks: Vec<Task>,
}

impl Seed {
    pub fn sample(now: DateTime<Utc>) -> Self {
        Self {
            catalog: sample_catalog(),
            tasks: sample_tasks(now),
        }
    }
}

fn project(id: &str, name: &str, color: &str) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    }
}

fn tag(id: &str, name: &str, color: &str) -> Tag {
    Tag {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    }
}

pub fn sample_catalog() -> Catalog {
    Catalog::new(
        vec![
            project("1", "Personal", "#3B82F6"),
            project("2", "Work", "#10B981"),
            project("3", "Shopping", "#F59E0B"),
            project("4", "Health", "#EF4444"),
        ],
        vec![
            tag("1", "Important", "#EF4444"),
            tag("2", "Quick", "#F59E0B"),
            tag("3", "Long-term", "#3B82F6"),
            tag("4", "Recurring", "#10B981"),
        ],
    )
}

/// The five demo tasks. Due dates are relative to `now`.
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let day = Duration::days(1);
    let sample = |id: &str,
                  title: &str,
                  description: &str,
                  created_at: DateTime<Utc>,
                  due: DateTime<Utc>,
                  priority: Priority,
                  project_id: &str,
                  tag_id: &str| Task {
        id: TaskId::from(id),
        title: title.to_string(),
        description: Some(description.to_string()),
        completed: false,
        created_at,
        due_date: Some(due),
        priority,
        project_id: Some(project_id.to_string()),
        tags: vec![tag_id.to_string()],
    };

    let mut workout = sample(
        "3",
        "Morning workout",
        "30 minutes of cardio and strength training",
        now - day,
        now - day,
        Priority::Medium,
        "4",
        "4",
    );
    workout.completed = true;

    vec![
        sample(
            "1",
            "Complete Donezo project",
            "Finish building the task management app",
            now,
            now + day * 2,
            Priority::High,
            "2",
            "1",
        ),
        sample(
            "2",
            "Go grocery shopping",
            "Buy fruits, vegetables, and milk",
            now,
            now + day,
            Priority::Medium,
            "3",
            "2",
        ),
        workout,
        sample(
            "4",
            "Update resume",
            "Add recent projects and update skills",
            now,
            now + day * 5,
            Priority::Low,
            "1",
            "3",
        ),
        sample(
            "5",
            "Pay bills",
            "Electricity, internet, and water bills",
            now,
            now + day * 2,
            Priority::High,
            "1",
            "1",
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    tasks: Vec<SeedTask>,
}

#[derive(Debug, Deserialize)]
struct SeedTask {
    id: Option<String>,
    title: String,
    description: Option<String>,
    #[serde(default)]
    completed: bool,
    created_at: Option<String>,
    due: Option<String>,
    priority: Option<String>,
    project: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[tracing::instrument(skip(zone, now))]
pub fn load_seed_file(path: &Path, zone: &Zone, now: DateTime<Utc>) -> anyhow::Result<Seed> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let seed = parse_seed(&text, zone, now)
        .with_context(|| format!("invalid seed file {}", path.display()))?;
    info!(
        file = %path.display(),
        projects = seed.catalog.projects.len(),
        tags = seed.catalog.tags.len(),
        tasks = seed.tasks.len(),
        "loaded seed file"
    );
    Ok(seed)
}

pub fn parse_seed(text: &str, zone: &Zone, now: DateTime<Utc>) -> anyhow::Result<Seed> {
    let raw: SeedFile = toml::from_str(text).context("failed to parse seed toml")?;
    let catalog = Catalog::new(raw.projects, raw.tags);

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(raw.tasks.len());
    for (idx, item) in raw.tasks.into_iter().enumerate() {
        let task = seed_task(item, zone, now).with_context(|| format!("seed task #{}", idx + 1))?;
        if !seen.insert(task.id.clone()) {
            return Err(anyhow!("duplicate task id in seed: {}", task.id));
        }
        if let Some(project_id) = task.project_id.as_deref()
            && catalog.lookup_project(project_id).is_none()
        {
            warn!(task = %task.id, project = project_id, "seed task references unknown project");
        }
        tasks.push(task);
    }

    Ok(Seed { catalog, tasks })
}

fn seed_task(item: SeedTask, zone: &Zone, now: DateTime<Utc>) -> anyhow::Result<Task> {
    let title = item.title.trim().to_string();
    if title.is_empty() {
        return Err(anyhow!("task title cannot be empty"));
    }

    let id = match item.id.map(|raw| raw.trim().to_string()) {
        Some(raw) if !raw.is_empty() => TaskId::new(raw),
        _ => {
            let generated = TaskId::generate();
            debug!(id = %generated, "seed task without id; generated one");
            generated
        }
    };

    let created_at = match item.created_at.as_deref() {
        Some(raw) => parse_seed_instant(raw, zone)?.unwrap_or(now),
        None => now,
    };
    let due_date = match item.due.as_deref() {
        Some(raw) => parse_seed_instant(raw, zone)?,
        None => None,
    };
    let priority = match item.priority.as_deref() {
        Some(raw) => raw.parse::<Priority>()?,
        None => Priority::default(),
    };

    Ok(Task {
        id,
        title,
        description: item.description.filter(|desc| !desc.trim().is_empty()),
        completed: item.completed,
        created_at,
        due_date,
        priority,
        project_id: item.project.filter(|p| !p.trim().is_empty()),
        tags: item.tags,
    })
}

/// `YYYY-MM-DD` (start of day in `zone`) or a full RFC 3339 timestamp.
fn parse_seed_instant(raw: &str, zone: &Zone) -> anyhow::Result<Option<DateTime<Utc>>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    Ok(parse_due_input(raw, zone)?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    #[test]
    fn sample_matches_demo_layout() {
        let seed = Seed::sample(now());
        let ids: Vec<&str> = seed.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert!(seed.tasks[2].completed);
        assert_eq!(seed.tasks[2].created_at, now() - Duration::days(1));
        assert_eq!(seed.tasks.iter().filter(|t| t.completed).count(), 1);
        assert_eq!(seed.catalog.first_project_id(), Some("1"));
    }

    #[test]
    fn parses_seed_toml() {
        let zone = Zone::Named(chrono_tz::UTC);
        let text = r##"
            [[projects]]
            id = "home"
            name = "Home"
            color = "#123456"

            [[tags]]
            id = "q"
            name = "Quick"
            color = "#F59E0B"

            [[tasks]]
            id = "a"
            title = "  Water plants "
            due = "2026-10-18"
            priority = "high"
            project = "home"
            tags = ["q"]

            [[tasks]]
            title = "Call mom"
            description = ""
            created_at = "2026-10-01T08:00:00Z"
        "##;

        let seed = parse_seed(text, &zone, now()).expect("seed parses");
        assert_eq!(seed.catalog.projects.len(), 1);
        assert_eq!(seed.tasks.len(), 2);

        let first = &seed.tasks[0];
        assert_eq!(first.title, "Water plants");
        assert_eq!(first.priority, Priority::High);
        assert_eq!(
            first.due_date,
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap())
        );
        assert_eq!(first.created_at, now());

        let second = &seed.tasks[1];
        assert!(!second.id.as_str().is_empty());
        assert_eq!(second.description, None);
        assert_eq!(second.priority, Priority::Medium);
        assert_eq!(
            second.created_at,
            Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_duplicate_ids_and_bad_dates() {
        let zone = Zone::Named(chrono_tz::UTC);
        let dupes = r#"
            [[tasks]]
            id = "1"
            title = "a"
            [[tasks]]
            id = "1"
            title = "b"
        "#;
        let err = parse_seed(dupes, &zone, now()).unwrap_err();
        assert!(err.to_string().contains("duplicate task id"));

        let bad_due = r#"
            [[tasks]]
            title = "a"
            due = "next week"
        "#;
        assert!(parse_seed(bad_due, &zone, now()).is_err());
    }

    #[test]
    fn loads_seed_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("seed.toml");
        fs::write(&path, "[[tasks]]\nid = \"x\"\ntitle = \"From disk\"\n").expect("write seed");

        let seed = load_seed_file(&path, &Zone::Local, now()).expect("load seed");
        assert_eq!(seed.tasks[0].title, "From disk");
        assert!(seed.catalog.projects.is_empty());
    }
}
