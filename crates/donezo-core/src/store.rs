use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::datetime::{Clock, Zone};
use crate::error::{TaskError, TaskResult};
use crate::filter::{CategoryFilter, filter_tasks};
use crate::seed::Seed;
use crate::task::{Project, Tag, Task, TaskDraft, TaskId};

pub type ListenerId = u64;

/// What subscribers see after every recompute.
#[derive(Debug, Clone, Copy)]
pub struct ViewUpdate<'a> {
    pub revision: u64,
    /// `None` when the last selection was a filter string that did not parse.
    pub filter: Option<&'a CategoryFilter>,
    pub search: &'a str,
    pub visible: &'a [Task],
}

type Listener = Box<dyn FnMut(&ViewUpdate<'_>)>;

/// Owns the task collection and keeps the filtered view in step with it.
///
/// Every method that changes the tasks, the filter or the search term
/// recomputes the view and notifies subscribers before returning.
pub struct TaskStore {
    tasks: Vec<Task>,
    catalog: Catalog,
    filter: Option<CategoryFilter>,
    search: String,
    visible: Vec<Task>,
    revision: u64,
    zone: Zone,
    clock: Clock,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: ListenerId,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("filter", &self.filter)
            .field("search", &self.search)
            .field("visible", &self.visible.len())
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl TaskStore {
    #[tracing::instrument(skip(seed, zone, clock), fields(tasks = seed.tasks.len()))]
    pub fn new(seed: Seed, zone: Zone, clock: Clock) -> TaskResult<Self> {
        let mut seen = HashSet::new();
        for task in &seed.tasks {
            if !seen.insert(&task.id) {
                return Err(TaskError::InvalidArgument(format!(
                    "duplicate task id in initial data: {}",
                    task.id
                )));
            }
        }

        let mut store = Self {
            tasks: seed.tasks,
            catalog: seed.catalog,
            filter: Some(CategoryFilter::All),
            search: String::new(),
            visible: Vec::new(),
            revision: 0,
            zone,
            clock,
            listeners: Vec::new(),
            next_listener: 0,
        };
        store.refresh();
        info!(
            tasks = store.tasks.len(),
            projects = store.catalog.projects.len(),
            tags = store.catalog.tags.len(),
            "opened task store"
        );
        Ok(store)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn projects(&self) -> &[Project] {
        &self.catalog.projects
    }

    pub fn tags(&self) -> &[Tag] {
        &self.catalog.tags
    }

    /// The derived list for the current filter and search term.
    pub fn visible(&self) -> &[Task] {
        &self.visible
    }

    pub fn filter(&self) -> Option<&CategoryFilter> {
        self.filter.as_ref()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn today(&self) -> NaiveDate {
        self.zone.date_of(self.clock.now())
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    pub fn lookup_project(&self, id: &str) -> Option<&Project> {
        self.catalog.lookup_project(id)
    }

    pub fn lookup_tag(&self, id: &str) -> Option<&Tag> {
        self.catalog.lookup_tag(id)
    }

    #[tracing::instrument(skip(self, draft), fields(title_len = draft.title.len()))]
    pub fn add(&mut self, draft: TaskDraft) -> TaskResult<Task> {
        ensure_title(&draft.title)?;

        let mut id = TaskId::generate();
        while self.get(&id).is_some() {
            warn!(id = %id, "generated task id collided; rolling again");
            id = TaskId::generate();
        }

        let task = draft.into_task(id, self.clock.now());
        info!(id = %task.id, "added task");
        self.tasks.push(task.clone());
        self.refresh();
        Ok(task)
    }

    /// Replaces the stored task with the same id, keeping its position.
    ///
    /// An unknown id is `NotFound` and never inserts. The stored
    /// `created_at` always survives.
    #[tracing::instrument(skip(self, task), fields(id = %task.id))]
    pub fn update(&mut self, mut task: Task) -> TaskResult<Task> {
        ensure_title(&task.title)?;

        let slot = self
            .tasks
            .iter_mut()
            .find(|stored| stored.id == task.id)
            .ok_or_else(|| TaskError::NotFound(task.id.clone()))?;

        if slot.created_at != task.created_at {
            debug!(
                stored = %slot.created_at,
                given = %task.created_at,
                "ignoring created_at change on update"
            );
            task.created_at = slot.created_at;
        }

        *slot = task.clone();
        info!("updated task");
        self.refresh();
        Ok(task)
    }

    /// Returns whether anything was removed. Absent ids are a no-op.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| &task.id != id);
        let removed = self.tasks.len() != before;
        if removed {
            info!("deleted task");
            self.refresh();
        } else {
            debug!("delete of unknown task ignored");
        }
        removed
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_completion(&mut self, id: &TaskId) -> TaskResult<Task> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| &task.id == id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        task.completed = !task.completed;
        let toggled = task.clone();

        info!(completed = toggled.completed, "toggled task completion");
        self.refresh();
        Ok(toggled)
    }

    pub fn set_filter(&mut self, filter: CategoryFilter) {
        debug!(filter = %filter, "filter selected");
        self.filter = Some(filter);
        self.refresh();
    }

    /// Boundary for string selections such as `project:2`.
    ///
    /// A string that does not parse selects nothing: the view becomes empty
    /// and the error is handed back for the caller to report.
    pub fn set_filter_str(&mut self, raw: &str) -> TaskResult<()> {
        match raw.parse::<CategoryFilter>() {
            Ok(filter) => {
                self.set_filter(filter);
                Ok(())
            }
            Err(err) => {
                warn!(filter = raw, error = %err, "unrecognized filter; showing nothing");
                self.filter = None;
                self.refresh();
                Err(err)
            }
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        debug!(search = %self.search, "search term changed");
        self.refresh();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ViewUpdate<'_>) + 'static) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Rebuilds the view from scratch and notifies subscribers.
    ///
    /// Mutators call this themselves; callers only need it when "today"
    /// may have moved.
    pub fn refresh(&mut self) {
        self.visible = match &self.filter {
            Some(filter) => filter_tasks(&self.tasks, filter, &self.search, self.today(), &self.zone),
            None => Vec::new(),
        };
        self.revision += 1;
        debug!(
            revision = self.revision,
            visible = self.visible.len(),
            total = self.tasks.len(),
            "recomputed view"
        );

        let update = ViewUpdate {
            revision: self.revision,
            filter: self.filter.as_ref(),
            search: &self.search,
            visible: &self.visible,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&update);
        }
    }
}

fn ensure_title(title: &str) -> TaskResult<()> {
    if title.trim().is_empty() {
        return Err(TaskError::InvalidArgument(
            "task title cannot be empty".to_string(),
        ));
    }
    Ok(())
}
