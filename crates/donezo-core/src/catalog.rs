use serde::{Deserialize, Serialize};

use crate::filter::CategoryFilter;
use crate::task::{Project, Tag, Task};

/// Read-only project and tag reference lists.
///
/// Task references are not checked against the catalog; a dangling id just
/// fails lookup and renders no badge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A coloured label rendered next to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub color: String,
}

impl Catalog {
    pub fn new(projects: Vec<Project>, tags: Vec<Tag>) -> Self {
        Self { projects, tags }
    }

    pub fn lookup_project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn lookup_tag(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == id)
    }

    pub fn first_project_id(&self) -> Option<&str> {
        self.projects.first().map(|project| project.id.as_str())
    }

    /// Every selectable filter, in sidebar order.
    pub fn sidebar_filters(&self) -> Vec<CategoryFilter> {
        let mut out = vec![
            CategoryFilter::All,
            CategoryFilter::Today,
            CategoryFilter::Upcoming,
            CategoryFilter::Completed,
        ];
        out.extend(
            self.projects
                .iter()
                .map(|project| CategoryFilter::Project(project.id.clone())),
        );
        out.extend(self.tags.iter().map(|tag| CategoryFilter::Tag(tag.id.clone())));
        out
    }

    /// Badge for the task's project, if the id resolves.
    pub fn project_badge(&self, task: &Task) -> Option<Badge> {
        task.project_id
            .as_deref()
            .and_then(|id| self.lookup_project(id))
            .map(|project| Badge {
                text: project.name.clone(),
                color: project.color.clone(),
            })
    }

    /// Tag badges in task order. Ids that do not resolve are skipped.
    pub fn tag_badges(&self, task: &Task) -> Vec<Badge> {
        task.tags
            .iter()
            .filter_map(|id| self.lookup_tag(id))
            .map(|tag| Badge {
                text: tag.name.clone(),
                color: tag.color.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::seed;
    use crate::task::{TaskDraft, TaskId};

    #[test]
    fn lookups_return_none_for_unknown_ids() {
        let catalog = seed::sample_catalog();
        assert_eq!(
            catalog.lookup_project("3").map(|p| p.name.as_str()),
            Some("Shopping")
        );
        assert_eq!(catalog.lookup_tag("4").map(|t| t.name.as_str()), Some("Recurring"));
        assert!(catalog.lookup_project("99").is_none());
        assert!(catalog.lookup_tag("").is_none());
    }

    #[test]
    fn sidebar_lists_fixed_views_then_projects_then_tags() {
        let catalog = seed::sample_catalog();
        let filters = catalog.sidebar_filters();
        assert_eq!(filters.len(), 4 + 4 + 4);
        assert_eq!(filters[0], CategoryFilter::All);
        assert_eq!(filters[4], CategoryFilter::Project("1".to_string()));
        assert_eq!(filters[11], CategoryFilter::Tag("4".to_string()));
    }

    #[test]
    fn badges_skip_dangling_references() {
        let catalog = seed::sample_catalog();
        let mut draft = TaskDraft::new("x");
        draft.project_id = Some("2".to_string());
        draft.tags = vec!["9".to_string(), "1".to_string()];
        let task = draft.into_task(TaskId::from("t"), Utc::now());

        let project = catalog.project_badge(&task).expect("project badge");
        assert_eq!(project.text, "Work");
        assert_eq!(project.color, "#10B981");

        let tags = catalog.tag_badges(&task);
        let names: Vec<&str> = tags.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(names, vec!["Important"]);

        let mut orphan = task.clone();
        orphan.project_id = Some("42".to_string());
        assert!(catalog.project_badge(&orphan).is_none());
    }

    #[test]
    fn empty_catalog_has_no_first_project() {
        assert!(Catalog::default().first_project_id().is_none());
    }
}
