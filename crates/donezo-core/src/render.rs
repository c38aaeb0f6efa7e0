use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::datetime::{DueState, Zone, due_state, format_date_input, format_due_label};
use crate::filter::CategoryFilter;
use crate::task::{Priority, Project, Tag, Task};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
    pub fn write_task_list<W: Write>(
        &self,
        out: &mut W,
        heading: &str,
        tasks: &[Task],
        catalog: &Catalog,
        today: NaiveDate,
        zone: &Zone,
    ) -> anyhow::Result<()> {
        writeln!(out, "{heading}")?;
        if tasks.is_empty() {
            writeln!(out, "No tasks found")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Due".to_string(),
            "Pri".to_string(),
            "Project".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let done = if task.completed { "x" } else { "" }.to_string();

            let due = match task.due_date {
                Some(due) => {
                    let label = format_due_label(due, zone);
                    match due_state(due, today, zone) {
                        DueState::Overdue => self.paint(&label, "31"),
                        DueState::Today => self.paint(&label, "33"),
                        DueState::Future => label,
                    }
                }
                None => String::new(),
            };

            let priority = self.paint(task.priority.as_str(), priority_code(task.priority));

            let project = catalog
                .project_badge(task)
                .map(|badge| self.paint_badge(&badge.text, &badge.color))
                .unwrap_or_default();

            let tags = catalog
                .tag_badges(task)
                .iter()
                .map(|badge| self.paint_badge(&format!("+{}", badge.text), &badge.color))
                .collect::<Vec<_>>()
                .join(" ");

            let title = if task.completed {
                self.paint(&task.title, "2")
            } else {
                task.title.clone()
            };

            rows.push(vec![
                self.paint(task.id.as_str(), "33"),
                done,
                due,
                priority,
                project,
                title,
                tags,
            ]);
        }

        write_table(out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(id = %task.id))]
    pub fn write_task_info<W: Write>(
        &self,
        out: &mut W,
        task: &Task,
        catalog: &Catalog,
        zone: &Zone,
    ) -> anyhow::Result<()> {
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        if let Some(description) = task.description.as_deref() {
            writeln!(out, "description {description}")?;
        }
        writeln!(
            out,
            "status      {}",
            if task.completed { "completed" } else { "open" }
        )?;
        writeln!(
            out,
            "priority    {} ({})",
            task.priority,
            task.priority.color()
        )?;
        if let Some(project_id) = task.project_id.as_deref() {
            let name = catalog
                .lookup_project(project_id)
                .map(|project| project.name.clone())
                .unwrap_or_else(|| format!("{project_id} (unknown)"));
            writeln!(out, "project     {name}")?;
        }
        if !task.tags.is_empty() {
            let names = task
                .tags
                .iter()
                .map(|id| {
                    catalog
                        .lookup_tag(id)
                        .map(|tag| tag.name.clone())
                        .unwrap_or_else(|| format!("{id} (unknown)"))
                })
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "tags        {names}")?;
        }
        writeln!(
            out,
            "created     {}",
            task.created_at.format("%Y-%m-%d %H:%M UTC")
        )?;
        if let Some(due) = task.due_date {
            writeln!(out, "due         {}", format_date_input(due, zone))?;
        }

        Ok(())
    }

    pub fn write_projects<W: Write>(&self, out: &mut W, projects: &[Project]) -> anyhow::Result<()> {
        let rows = projects
            .iter()
            .map(|project| self.reference_row(&project.id, &project.name, &project.color))
            .collect();
        write_table(out, reference_headers(), rows)
    }

    pub fn write_tags<W: Write>(&self, out: &mut W, tags: &[Tag]) -> anyhow::Result<()> {
        let rows = tags
            .iter()
            .map(|tag| self.reference_row(&tag.id, &tag.name, &tag.color))
            .collect();
        write_table(out, reference_headers(), rows)
    }

    fn reference_row(&self, id: &str, name: &str, color: &str) -> Vec<String> {
        vec![id.to_string(), self.paint_badge(name, color), color.to_string()]
    }

    /// Sidebar entries with the active one marked.
    pub fn write_filters<W: Write>(
        &self,
        out: &mut W,
        catalog: &Catalog,
        active: Option<&CategoryFilter>,
    ) -> anyhow::Result<()> {
        for filter in catalog.sidebar_filters() {
            let marker = if active == Some(&filter) { "*" } else { " " };
            writeln!(out, "{marker} {:<12} {}", filter.to_string(), filter.title(catalog))?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    /// Foreground in the badge's `#RRGGBB` colour; unparseable colours
    /// render plain.
    fn paint_badge(&self, text: &str, hex: &str) -> String {
        match hex_rgb(hex) {
            Some((r, g, b)) => self.paint(text, &format!("38;2;{r};{g};{b}")),
            None => text.to_string(),
        }
    }
}

fn reference_headers() -> Vec<String> {
    vec!["ID".to_string(), "Name".to_string(), "Color".to_string()]
}

fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn priority_code(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "32",
        Priority::Medium => "33",
        Priority::High => "31",
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
