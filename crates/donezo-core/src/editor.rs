use tracing::debug;

use crate::catalog::Catalog;
use crate::datetime::{
  Zone,
  format_date_input,
  parse_due_input
};
use crate::error::{
  TaskError,
  TaskResult
};
use crate::store::TaskStore;
use crate::task::{
  Priority,
  Task,
  TaskDraft
};

/// Raw form state for the add/edit
/// dialog.
///
/// Fields hold what the user typed;
/// nothing is interpreted until
/// `validate`/`submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEditor {
  source:          Option<Task>,
  pub title:       String,
  pub description: String,
  pub due_date:    String,
  pub priority:    Priority,
  pub project_id:  String,
  tags:            Vec<String>
}

impl TaskEditor {
  /// Blank form. Preselects the first
  /// project when there is one.
  pub fn create(
    catalog: &Catalog
  ) -> Self {
    Self {
      source:      None,
      title:       String::new(),
      description: String::new(),
      due_date:    String::new(),
      priority:    Priority::Medium,
      project_id:  catalog
        .first_project_id()
        .unwrap_or_default()
        .to_string(),
      tags:        Vec::new()
    }
  }

  pub fn edit(
    task: &Task,
    zone: &Zone
  ) -> Self {
    Self {
      source:      Some(task.clone()),
      title:       task.title.clone(),
      description: task
        .description
        .clone()
        .unwrap_or_default(),
      due_date:    task
        .due_date
        .map(|due| {
          format_date_input(due, zone)
        })
        .unwrap_or_default(),
      priority:    task.priority,
      project_id:  task
        .project_id
        .clone()
        .unwrap_or_default(),
      tags:        task.tags.clone()
    }
  }

  pub fn is_editing(&self) -> bool {
    self.source.is_some()
  }

  pub fn tags(&self) -> &[String] {
    &self.tags
  }

  pub fn is_tag_selected(
    &self,
    tag_id: &str
  ) -> bool {
    self.tags.iter().any(|t| t == tag_id)
  }

  /// Deselects a selected tag, otherwise
  /// appends it. Returns whether the tag
  /// is selected afterwards.
  pub fn toggle_tag(
    &mut self,
    tag_id: &str
  ) -> bool {
    if self.is_tag_selected(tag_id) {
      self.tags.retain(|t| t != tag_id);
      false
    } else {
      self.tags.push(tag_id.to_string());
      true
    }
  }

  /// Turns the form into a draft
  /// without touching any store.
  pub fn validate(
    &self,
    zone: &Zone
  ) -> TaskResult<TaskDraft> {
    let title = self.title.trim();
    if title.is_empty() {
      return Err(TaskError::validation(
        "title",
        "title is required"
      ));
    }

    let due_date =
      parse_due_input(&self.due_date, zone)?;

    let description =
      if self.description.trim().is_empty()
      {
        None
      } else {
        Some(self.description.clone())
      };

    let project_id =
      if self.project_id.trim().is_empty()
      {
        None
      } else {
        Some(
          self.project_id.trim().to_string()
        )
      };

    Ok(TaskDraft {
      title: title.to_string(),
      description,
      completed: self
        .source
        .as_ref()
        .is_some_and(|task| task.completed),
      due_date,
      priority: self.priority,
      project_id,
      tags: self.tags.clone()
    })
  }

  /// Validates, then adds a new task or
  /// updates the source task. The
  /// source's id and created_at are
  /// carried over untouched.
  #[tracing::instrument(skip(
    self, store
  ), fields(editing = self.is_editing()))]
  pub fn submit(
    &self,
    store: &mut TaskStore
  ) -> TaskResult<Task> {
    let draft =
      self.validate(store.zone())?;

    match &self.source {
      | None => store.add(draft),
      | Some(source) => {
        debug!(id = %source.id, "submitting edit");
        let task = draft.into_task(
          source.id.clone(),
          source.created_at
        );
        store.update(task)
      }
    }
  }
}
