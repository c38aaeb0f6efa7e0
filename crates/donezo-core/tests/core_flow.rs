use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use donezo_core::TaskError;
use donezo_core::commands::{self, Outcome};
use donezo_core::datetime::{Clock, Zone};
use donezo_core::editor::TaskEditor;
use donezo_core::filter::CategoryFilter;
use donezo_core::render::Renderer;
use donezo_core::seed::Seed;
use donezo_core::store::TaskStore;
use donezo_core::task::{Priority, TaskDraft, TaskId};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap()
}

fn sample_store() -> TaskStore {
    TaskStore::new(
        Seed::sample(now()),
        Zone::Named(chrono_tz::UTC),
        Clock::Fixed(now()),
    )
    .expect("sample store")
}

fn visible_ids(store: &TaskStore) -> Vec<String> {
    store
        .visible()
        .iter()
        .map(|task| task.id.to_string())
        .collect()
}

#[test]
fn sample_data_scenarios() {
    let mut store = sample_store();
    assert_eq!(visible_ids(&store), vec!["1", "2", "3", "4", "5"]);

    store.set_filter(CategoryFilter::Completed);
    assert_eq!(visible_ids(&store), vec!["3"]);

    store.set_filter_str("project:3").expect("project filter");
    assert_eq!(visible_ids(&store), vec!["2"]);

    store.set_filter(CategoryFilter::All);
    store.set_search("resume");
    assert_eq!(visible_ids(&store), vec!["4"]);
}

#[test]
fn add_then_toggle_keeps_everything_else() {
    let mut store = sample_store();
    let added = store
        .add(TaskDraft::new("X").with_priority(Priority::Low))
        .expect("add");
    assert!(!added.completed);
    assert_eq!(added.created_at, now());

    let toggled = store.toggle_completion(&added.id).expect("toggle");
    assert!(toggled.completed);
    assert_eq!(toggled.title, "X");
    assert_eq!(toggled.priority, Priority::Low);
    assert_eq!(toggled.created_at, added.created_at);
    assert_eq!(toggled.id, added.id);
}

#[test]
fn update_of_unknown_id_changes_nothing() {
    let mut store = sample_store();
    let before = store.tasks().to_vec();

    let mut ghost = before[0].clone();
    ghost.id = TaskId::from("does-not-exist");
    ghost.title = "Ghost".to_string();

    let err = store.update(ghost).expect_err("unknown id");
    assert_eq!(err, TaskError::NotFound(TaskId::from("does-not-exist")));
    assert_eq!(store.tasks(), before.as_slice());
}

#[test]
fn editor_rejects_blank_title_without_touching_store() {
    let mut store = sample_store();
    let revision = store.revision();

    let mut editor = TaskEditor::create(store.catalog());
    editor.title = "   ".to_string();

    let err = editor.submit(&mut store).expect_err("blank title");
    assert!(matches!(err, TaskError::Validation { field: "title", .. }));
    assert_eq!(store.tasks().len(), 5);
    assert_eq!(store.revision(), revision);
}

#[test]
fn editor_round_trip_through_the_store() {
    let mut store = sample_store();

    let mut editor = TaskEditor::create(store.catalog());
    editor.title = "  Call the dentist ".to_string();
    editor.due_date = "2026-10-16".to_string();
    editor.toggle_tag("2");
    let created = editor.submit(&mut store).expect("create");
    assert_eq!(created.title, "Call the dentist");
    assert_eq!(created.project_id.as_deref(), Some("1"));

    store.set_filter(CategoryFilter::Today);
    assert_eq!(visible_ids(&store), vec![created.id.to_string()]);

    let mut editor = TaskEditor::edit(&created, store.zone());
    editor.due_date = String::new();
    let edited = editor.submit(&mut store).expect("edit");
    assert_eq!(edited.id, created.id);
    assert_eq!(edited.created_at, created.created_at);
    assert!(edited.due_date.is_none());
    assert!(store.visible().is_empty());
}

#[test]
fn ids_stay_unique_across_mutations() {
    let mut store = sample_store();
    for idx in 0..20 {
        let task = store.add(TaskDraft::new(format!("task {idx}"))).expect("add");
        if idx % 3 == 0 {
            let mut renamed = task.clone();
            renamed.title = format!("renamed {idx}");
            store.update(renamed).expect("update");
        }
        if idx % 4 == 0 {
            assert!(store.delete(&task.id));
        }
    }
    assert!(!store.delete(&TaskId::from("missing")));

    let ids: HashSet<&TaskId> = store.tasks().iter().map(|task| &task.id).collect();
    assert_eq!(ids.len(), store.tasks().len());
}

#[test]
fn empty_search_is_the_same_as_no_search() {
    let mut store = sample_store();
    store.set_filter(CategoryFilter::Upcoming);
    let unsearched = visible_ids(&store);

    store.set_search("");
    assert_eq!(visible_ids(&store), unsearched);
}

#[test]
fn malformed_filter_shows_nothing() {
    let mut store = sample_store();
    let err = store.set_filter_str("priority:high").expect_err("bad filter");
    assert!(matches!(err, TaskError::InvalidArgument(_)));
    assert!(store.filter().is_none());
    assert!(store.visible().is_empty());
    assert_eq!(store.tasks().len(), 5);
}

#[test]
fn scripted_session_drives_the_store() {
    let mut store = sample_store();
    let script = "add Water the plants priority:high +Quick\n\
                  filter tag:2\n\
                  done 2\n\
                  quit\n\
                  list\n";
    let mut out = Vec::new();
    commands::run_session(
        &mut store,
        &Renderer::plain(),
        script.as_bytes(),
        &mut out,
        false,
    )
    .expect("session");

    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("Tag: Quick"));
    assert_eq!(store.tasks().len(), 6);
    assert!(store.get(&TaskId::from("2")).expect("task 2").completed);

    let added = store.tasks().last().expect("added task");
    assert_eq!(added.title, "Water the plants");
    assert_eq!(added.priority, Priority::High);
    assert_eq!(added.tags, vec!["2".to_string()]);
}

#[test]
fn single_command_reports_errors() {
    let mut store = sample_store();
    let mut out = Vec::new();
    let err = commands::dispatch(
        &mut store,
        &Renderer::plain(),
        &mut out,
        &["done".to_string(), "nope".to_string()],
    )
    .expect_err("unknown id");
    assert!(format!("{err:#}").contains("nope"));

    let outcome = commands::dispatch(
        &mut store,
        &Renderer::plain(),
        &mut out,
        &["quit".to_string()],
    )
    .expect("quit");
    assert_eq!(outcome, Outcome::Quit);
}
