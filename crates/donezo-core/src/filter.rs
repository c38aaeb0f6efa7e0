use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use tracing::trace;

use crate::catalog::Catalog;
use crate::datetime::Zone;
use crate::error::TaskError;
use crate::task::Task;

/// The single active sidebar selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
  #[default]
  All,
  Today,
  Upcoming,
  Completed,
  Project(String),
  Tag(String)
}

impl CategoryFilter {
  #[must_use]
  pub fn matches(
    &self,
    task: &Task,
    today: NaiveDate,
    zone: &Zone
  ) -> bool {
    match self {
      | CategoryFilter::All => true,
      | CategoryFilter::Today => {
        task.due_date.is_some_and(|due| {
          zone.date_of(due) == today
        })
      }
      | CategoryFilter::Upcoming => {
        task.due_date.is_some_and(|due| {
          zone.date_of(due) > today
        })
      }
      | CategoryFilter::Completed => {
        task.completed
      }
      | CategoryFilter::Project(id) => {
        task.project_id.as_deref()
          == Some(id.as_str())
      }
      | CategoryFilter::Tag(id) => {
        task.has_tag(id)
      }
    }
  }

  /// Heading shown above the list.
  #[must_use]
  pub fn title(
    &self,
    catalog: &Catalog
  ) -> String {
    match self {
      | CategoryFilter::All => {
        "All Tasks".to_string()
      }
      | CategoryFilter::Today => {
        "Today".to_string()
      }
      | CategoryFilter::Upcoming => {
        "Upcoming".to_string()
      }
      | CategoryFilter::Completed => {
        "Completed".to_string()
      }
      | CategoryFilter::Project(id) => {
        catalog
          .lookup_project(id)
          .map(|project| {
            format!(
              "Project: {}",
              project.name
            )
          })
          .unwrap_or_else(|| {
            "Project Tasks".to_string()
          })
      }
      | CategoryFilter::Tag(id) => {
        catalog
          .lookup_tag(id)
          .map(|tag| {
            format!("Tag: {}", tag.name)
          })
          .unwrap_or_else(|| {
            "Tagged Tasks".to_string()
          })
      }
    }
  }
}

impl fmt::Display for CategoryFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | CategoryFilter::All => {
        f.write_str("all")
      }
      | CategoryFilter::Today => {
        f.write_str("today")
      }
      | CategoryFilter::Upcoming => {
        f.write_str("upcoming")
      }
      | CategoryFilter::Completed => {
        f.write_str("completed")
      }
      | CategoryFilter::Project(id) => {
        write!(f, "project:{id}")
      }
      | CategoryFilter::Tag(id) => {
        write!(f, "tag:{id}")
      }
    }
  }
}

impl FromStr for CategoryFilter {
  type Err = TaskError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let raw = s.trim();
    match raw {
      | "all" => Ok(CategoryFilter::All),
      | "today" => {
        Ok(CategoryFilter::Today)
      }
      | "upcoming" => {
        Ok(CategoryFilter::Upcoming)
      }
      | "completed" => {
        Ok(CategoryFilter::Completed)
      }
      | _ => {
        if let Some(id) =
          raw.strip_prefix("project:")
          && !id.is_empty()
        {
          return Ok(
            CategoryFilter::Project(
              id.to_string()
            )
          );
        }
        if let Some(id) =
          raw.strip_prefix("tag:")
          && !id.is_empty()
        {
          return Ok(CategoryFilter::Tag(
            id.to_string()
          ));
        }
        Err(TaskError::InvalidArgument(
          format!(
            "unrecognized filter '{raw}'"
          )
        ))
      }
    }
  }
}

/// Case-insensitive substring match on
/// title or description. An empty term
/// matches everything.
#[must_use]
pub fn matches_search(
  task: &Task,
  term: &str
) -> bool {
  if term.is_empty() {
    return true;
  }

  let needle = term.to_lowercase();
  if task
    .title
    .to_lowercase()
    .contains(&needle)
  {
    return true;
  }

  task.description.as_deref().is_some_and(
    |desc| {
      desc
        .to_lowercase()
        .contains(&needle)
    }
  )
}

/// Derives the visible list. Survivors
/// keep collection order and the input
/// slice is only read.
#[tracing::instrument(skip(
  tasks, zone
), fields(total = tasks.len()))]
pub fn filter_tasks(
  tasks: &[Task],
  filter: &CategoryFilter,
  search: &str,
  today: NaiveDate,
  zone: &Zone
) -> Vec<Task> {
  let visible: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      matches_search(task, search)
        && filter
          .matches(task, today, zone)
    })
    .cloned()
    .collect();

  trace!(
    visible = visible.len(),
    "filtered tasks"
  );
  visible
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };

  use super::*;
  use crate::seed;
  use crate::task::{
    TaskDraft,
    TaskId
  };

  fn fixture() -> (
    Vec<Task>,
    NaiveDate,
    Zone
  ) {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 16, 15, 0, 0
      )
      .unwrap();
    let zone =
      Zone::Named(chrono_tz::UTC);
    (
      seed::sample_tasks(now),
      zone.date_of(now),
      zone
    )
  }

  fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks
      .iter()
      .map(|t| t.id.as_str())
      .collect()
  }

  #[test]
  fn parses_and_displays_every_shape()
  {
    for raw in [
      "all",
      "today",
      "upcoming",
      "completed",
      "project:3",
      "tag:2"
    ] {
      let parsed: CategoryFilter =
        raw.parse().unwrap();
      assert_eq!(parsed.to_string(), raw);
    }
  }

  #[test]
  fn rejects_malformed_filter_strings()
  {
    for raw in [
      "",
      "everything",
      "project:",
      "tag:",
      "Project:1"
    ] {
      assert!(matches!(
        raw.parse::<CategoryFilter>(),
        Err(TaskError::InvalidArgument(_))
      ));
    }
  }

  #[test]
  fn sample_views_select_expected_ids()
  {
    let (tasks, today, zone) = fixture();

    let all = filter_tasks(
      &tasks,
      &CategoryFilter::All,
      "",
      today,
      &zone
    );
    assert_eq!(
      ids(&all),
      vec!["1", "2", "3", "4", "5"]
    );

    let completed = filter_tasks(
      &tasks,
      &CategoryFilter::Completed,
      "",
      today,
      &zone
    );
    assert_eq!(ids(&completed), vec!["3"]);

    let shopping = filter_tasks(
      &tasks,
      &CategoryFilter::Project(
        "3".to_string()
      ),
      "",
      today,
      &zone
    );
    assert_eq!(ids(&shopping), vec!["2"]);

    let resume = filter_tasks(
      &tasks,
      &CategoryFilter::All,
      "resume",
      today,
      &zone
    );
    assert_eq!(ids(&resume), vec!["4"]);

    let important = filter_tasks(
      &tasks,
      &CategoryFilter::Tag(
        "1".to_string()
      ),
      "",
      today,
      &zone
    );
    assert_eq!(
      ids(&important),
      vec!["1", "5"]
    );
  }

  #[test]
  fn search_is_case_insensitive_and_covers_description()
   {
    let (tasks, today, zone) = fixture();
    let hits = filter_tasks(
      &tasks,
      &CategoryFilter::All,
      "CARDIO",
      today,
      &zone
    );
    assert_eq!(ids(&hits), vec!["3"]);
  }

  #[test]
  fn search_ands_with_category() {
    let (tasks, today, zone) = fixture();
    let hits = filter_tasks(
      &tasks,
      &CategoryFilter::Completed,
      "bills",
      today,
      &zone
    );
    assert!(hits.is_empty());
  }

  #[test]
  fn today_and_upcoming_split_on_calendar_date()
   {
    let now = Utc
      .with_ymd_and_hms(
        2026, 10, 16, 15, 0, 0
      )
      .unwrap();
    let zone =
      Zone::Named(chrono_tz::UTC);
    let today = zone.date_of(now);

    let mut due_tonight =
      TaskDraft::new("tonight");
    due_tonight.due_date =
      Some(now + Duration::hours(8));
    let mut due_tomorrow =
      TaskDraft::new("tomorrow");
    due_tomorrow.due_date =
      Some(now + Duration::hours(10));
    let mut due_earlier =
      TaskDraft::new("this morning");
    due_earlier.due_date =
      Some(now - Duration::hours(14));
    let undated =
      TaskDraft::new("someday");

    let tasks: Vec<Task> = [
      due_tonight,
      due_tomorrow,
      due_earlier,
      undated
    ]
    .into_iter()
    .enumerate()
    .map(|(i, d)| {
      d.into_task(
        TaskId::new(i.to_string()),
        now
      )
    })
    .collect();

    let todays = filter_tasks(
      &tasks,
      &CategoryFilter::Today,
      "",
      today,
      &zone
    );
    assert_eq!(ids(&todays), vec!["0", "2"]);

    let upcoming = filter_tasks(
      &tasks,
      &CategoryFilter::Upcoming,
      "",
      today,
      &zone
    );
    assert_eq!(ids(&upcoming), vec!["1"]);
  }

  #[test]
  fn views_are_consistent_and_repeatable()
   {
    let (tasks, today, zone) = fixture();
    let before = tasks.clone();

    let all = filter_tasks(
      &tasks,
      &CategoryFilter::All,
      "",
      today,
      &zone
    );
    let completed = filter_tasks(
      &tasks,
      &CategoryFilter::Completed,
      "",
      today,
      &zone
    );
    let todays = filter_tasks(
      &tasks,
      &CategoryFilter::Today,
      "",
      today,
      &zone
    );
    let upcoming = filter_tasks(
      &tasks,
      &CategoryFilter::Upcoming,
      "",
      today,
      &zone
    );

    assert!(completed
      .iter()
      .all(|t| all.contains(t)));
    assert!(todays
      .iter()
      .all(|t| !upcoming.contains(t)));
    assert_eq!(
      upcoming,
      filter_tasks(
        &tasks,
        &CategoryFilter::Upcoming,
        "",
        today,
        &zone
      )
    );
    assert_eq!(tasks, before);
  }

  #[test]
  fn titles_fall_back_for_unknown_ids() {
    let catalog = seed::sample_catalog();
    assert_eq!(
      CategoryFilter::Project(
        "2".to_string()
      )
      .title(&catalog),
      "Project: Work"
    );
    assert_eq!(
      CategoryFilter::Project(
        "42".to_string()
      )
      .title(&catalog),
      "Project Tasks"
    );
    assert_eq!(
      CategoryFilter::Tag(
        "42".to_string()
      )
      .title(&catalog),
      "Tagged Tasks"
    );
    assert_eq!(
      CategoryFilter::All.title(&catalog),
      "All Tasks"
    );
  }
}
