use std::io::{BufRead, Write};

use anyhow::anyhow;
use tracing::{debug, info, instrument, warn};

use crate::catalog::Catalog;
use crate::editor::TaskEditor;
use crate::error::TaskError;
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::task::{Priority, TaskId};

/// Whether the session should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "list", "filter", "search", "add", "edit", "done", "delete", "show", "projects", "tags",
        "filters", "export", "help", "quit", "exit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Splits a command line on whitespace. Double quotes group words and are
/// dropped, so `desc:"two words"` is one token.
pub fn split_command_line(line: &str) -> anyhow::Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(anyhow!("unterminated quote in: {line}"));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Reads commands until `quit` or end of input. Command errors are printed
/// and the session carries on.
#[instrument(skip(store, renderer, input, out))]
pub fn run_session<R: BufRead, W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    mut input: R,
    out: &mut W,
    prompt: bool,
) -> anyhow::Result<()> {
    info!("session started");

    let mut buf = Vec::new();
    loop {
        if prompt {
            write!(out, "donezo> ")?;
            out.flush()?;
        }

        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim_end_matches(['\n', '\r']),
            Err(err) => {
                warn!(error = %err, "skipping input line that is not UTF-8");
                writeln!(out, "error: input line is not valid UTF-8: {err}")?;
                continue;
            }
        };

        let tokens = match split_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                writeln!(out, "error: {err:#}")?;
                continue;
            }
        };
        if tokens.is_empty() {
            continue;
        }

        match dispatch(store, renderer, out, &tokens) {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Continue) => {}
            Err(err) => {
                warn!(command = %tokens[0], error = %err, "command failed");
                writeln!(out, "error: {err:#}")?;
            }
        }
    }

    info!("session finished");
    Ok(())
}

#[instrument(skip(store, renderer, out))]
pub fn dispatch<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
    tokens: &[String],
) -> anyhow::Result<Outcome> {
    let Some((head, args)) = tokens.split_first() else {
        return Ok(Outcome::Continue);
    };

    let known = known_command_names();
    let command = expand_command_abbrev(head, &known)
        .ok_or_else(|| anyhow!("unknown or ambiguous command: {head}"))?;
    debug!(command, ?args, "dispatching command");

    match command {
        "list" => cmd_list(store, renderer, out)?,
        "filter" => cmd_filter(store, renderer, out, args)?,
        "search" => cmd_search(store, renderer, out, args)?,
        "add" => cmd_add(store, out, args)?,
        "edit" => cmd_edit(store, out, args)?,
        "done" => cmd_done(store, out, args)?,
        "delete" => cmd_delete(store, out, args)?,
        "show" => cmd_show(store, renderer, out, args)?,
        "projects" => renderer.write_projects(out, store.projects())?,
        "tags" => renderer.write_tags(out, store.tags())?,
        "filters" => renderer.write_filters(out, store.catalog(), store.filter())?,
        "export" => cmd_export(store, out)?,
        "help" => cmd_help(out)?,
        "quit" | "exit" => return Ok(Outcome::Quit),
        other => return Err(anyhow!("unknown command: {other}")),
    }

    Ok(Outcome::Continue)
}

fn cmd_list<W: Write>(store: &TaskStore, renderer: &Renderer, out: &mut W) -> anyhow::Result<()> {
    let mut heading = store
        .filter()
        .map(|filter| filter.title(store.catalog()))
        .unwrap_or_else(|| "Tasks".to_string());
    if !store.search().is_empty() {
        heading.push_str(&format!(" matching \"{}\"", store.search()));
    }
    renderer.write_task_list(
        out,
        &heading,
        store.visible(),
        store.catalog(),
        store.today(),
        store.zone(),
    )
}

fn cmd_filter<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()> {
    let Some(raw) = args.first() else {
        return renderer.write_filters(out, store.catalog(), store.filter());
    };
    store.set_filter_str(raw)?;
    cmd_list(store, renderer, out)
}

fn cmd_search<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()> {
    store.set_search(args.join(" "));
    cmd_list(store, renderer, out)
}

#[instrument(skip(store, out, args))]
fn cmd_add<W: Write>(store: &mut TaskStore, out: &mut W, args: &[String]) -> anyhow::Result<()> {
    let mut form = TaskEditor::create(store.catalog());
    let (words, mods) = parse_words_and_mods(args, store.catalog())?;
    form.title = words.join(" ");
    apply_mods(&mut form, &mods, store.catalog());

    let task = form.submit(store)?;
    writeln!(out, "Added task {}.", task.id)?;
    Ok(())
}

#[instrument(skip(store, out, args))]
fn cmd_edit<W: Write>(store: &mut TaskStore, out: &mut W, args: &[String]) -> anyhow::Result<()> {
    let (id, rest) = split_id(args)?;
    let source = store
        .get(&id)
        .ok_or_else(|| TaskError::NotFound(id.clone()))?;
    let mut form = TaskEditor::edit(source, store.zone());

    let (words, mods) = parse_words_and_mods(rest, store.catalog())?;
    if !words.is_empty() {
        form.title = words.join(" ");
    }
    apply_mods(&mut form, &mods, store.catalog());

    let task = form.submit(store)?;
    writeln!(out, "Updated task {}.", task.id)?;
    Ok(())
}

fn cmd_done<W: Write>(store: &mut TaskStore, out: &mut W, args: &[String]) -> anyhow::Result<()> {
    let (id, _) = split_id(args)?;
    let task = store.toggle_completion(&id)?;
    let state = if task.completed { "completed" } else { "open" };
    writeln!(out, "Task {} marked {state}.", task.id)?;
    Ok(())
}

fn cmd_delete<W: Write>(store: &mut TaskStore, out: &mut W, args: &[String]) -> anyhow::Result<()> {
    let (id, _) = split_id(args)?;
    if store.delete(&id) {
        writeln!(out, "Deleted task {id}.")?;
    } else {
        writeln!(out, "No task {id}; nothing deleted.")?;
    }
    Ok(())
}

fn cmd_show<W: Write>(
    store: &TaskStore,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()> {
    let (id, _) = split_id(args)?;
    let task = store
        .get(&id)
        .ok_or_else(|| TaskError::NotFound(id.clone()))?;
    renderer.write_task_info(out, task, store.catalog(), store.zone())
}

fn cmd_export<W: Write>(store: &TaskStore, out: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, store.visible())?;
    writeln!(out)?;
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands:\n  \
         list                         show the current view\n  \
         filter [all|today|upcoming|completed|project:<id>|tag:<id>]\n  \
         search [text..]              empty text clears the search\n  \
         add <title..> [mods]         mods: due:YYYY-MM-DD priority:<p> project:<id>\n  \
         edit <id> [title..] [mods]         +tag -tag desc:\"text\"\n  \
         done <id>                    toggle completion\n  \
         delete <id>\n  \
         show <id>\n  \
         projects | tags | filters | export | help | quit"
    )?;
    Ok(())
}

fn split_id(args: &[String]) -> anyhow::Result<(TaskId, &[String])> {
    let (id, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("missing task id"))?;
    Ok((TaskId::new(id.as_str()), rest))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mod {
    Due(String),
    Priority(Priority),
    Project(String),
    Description(String),
    TagOn(String),
    TagOff(String),
}

fn parse_words_and_mods(
    args: &[String],
    catalog: &Catalog,
) -> anyhow::Result<(Vec<String>, Vec<Mod>)> {
    let mut words = Vec::new();
    let mut mods = Vec::new();
    for tok in args {
        match parse_one_mod(tok, catalog)? {
            Some(m) => mods.push(m),
            None => words.push(tok.clone()),
        }
    }
    Ok((words, mods))
}

/// `-word` only deselects when `word` names a known tag; otherwise it stays
/// part of the title, so `add Set thermostat to -5` keeps the `-5`.
fn parse_one_mod(tok: &str, catalog: &Catalog) -> anyhow::Result<Option<Mod>> {
    if let Some(value) = tok.strip_prefix("due:") {
        return Ok(Some(Mod::Due(value.to_string())));
    }
    if let Some(value) = tok.strip_prefix("priority:").or_else(|| tok.strip_prefix("pri:")) {
        return Ok(Some(Mod::Priority(value.parse()?)));
    }
    if let Some(value) = tok.strip_prefix("project:") {
        return Ok(Some(Mod::Project(value.to_string())));
    }
    if let Some(value) = tok.strip_prefix("desc:") {
        return Ok(Some(Mod::Description(value.to_string())));
    }
    if let Some(tag) = tok.strip_prefix('+')
        && !tag.is_empty()
    {
        return Ok(Some(Mod::TagOn(tag.to_string())));
    }
    if let Some(tag) = tok.strip_prefix('-')
        && let Some(id) = find_tag(catalog, tag)
    {
        return Ok(Some(Mod::TagOff(id)));
    }
    Ok(None)
}

fn apply_mods(form: &mut TaskEditor, mods: &[Mod], catalog: &Catalog) {
    for m in mods {
        match m {
            Mod::Due(value) => form.due_date = value.clone(),
            Mod::Priority(priority) => form.priority = *priority,
            Mod::Project(value) => form.project_id = resolve_project(catalog, value),
            Mod::Description(value) => form.description = value.clone(),
            Mod::TagOn(value) => {
                let id = resolve_tag(catalog, value);
                if !form.is_tag_selected(&id) {
                    form.toggle_tag(&id);
                }
            }
            Mod::TagOff(id) => {
                if form.is_tag_selected(id) {
                    form.toggle_tag(id);
                }
            }
        }
    }
}

/// Id match first, then case-insensitive name; otherwise the raw value is
/// kept as a dangling reference.
fn resolve_project(catalog: &Catalog, value: &str) -> String {
    if value.is_empty() || catalog.lookup_project(value).is_some() {
        return value.to_string();
    }
    catalog
        .projects
        .iter()
        .find(|project| project.name.eq_ignore_ascii_case(value))
        .map(|project| project.id.clone())
        .unwrap_or_else(|| {
            debug!(project = value, "project not in catalog; keeping raw id");
            value.to_string()
        })
}

fn resolve_tag(catalog: &Catalog, value: &str) -> String {
    find_tag(catalog, value).unwrap_or_else(|| {
        debug!(tag = value, "tag not in catalog; keeping raw id");
        value.to_string()
    })
}

fn find_tag(catalog: &Catalog, value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    if catalog.lookup_tag(value).is_some() {
        return Some(value.to_string());
    }
    catalog
        .tags
        .iter()
        .find(|tag| tag.name.eq_ignore_ascii_case(value))
        .map(|tag| tag.id.clone())
}
