mod common;

use common::FakeBackend;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;
use taskdeck::app::{App, DeleteTarget, InputMode};
use taskdeck::models::TaskStatus;
use taskdeck::query::{CategoryFilter, SortOrder, StatusTab};
use taskdeck::validation::Field;

fn press(app: &mut App, code: KeyCode) -> bool {
    app.handle_input(KeyEvent::new(code, KeyModifiers::NONE))
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

// Gives spawned requests time to finish and folds their results in.
async fn settle(app: &mut App) {
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        app.sync();
    }
}

async fn loaded_app(backend: &std::sync::Arc<FakeBackend>) -> App {
    let mut app = App::new(backend.store());
    app.refresh();
    settle(&mut app).await;
    app
}

#[tokio::test]
async fn test_initial_load_fills_list() {
    let backend = FakeBackend::new();
    backend.seed_task("First", "low", TaskStatus::Pending);
    backend.seed_task("Second", "high", TaskStatus::Completed);
    backend.seed_category("Work");

    let app = loaded_app(&backend).await;

    assert_eq!(app.visible_tasks().len(), 2);
    assert_eq!(app.categories.len(), 1);
    assert_eq!(app.state.selected(), Some(0));
    assert!(!app.loading);
}

#[tokio::test]
async fn test_tab_search_and_quit_keys() {
    let backend = FakeBackend::new();
    backend.seed_task("Buy milk", "low", TaskStatus::Pending);
    backend.seed_task("Walk dog", "high", TaskStatus::Completed);
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Tab);
    assert_eq!(app.filters.tab(), StatusTab::Active);
    assert_eq!(app.visible_tasks()[0].title, "Buy milk");

    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    assert_eq!(app.filters.tab(), StatusTab::All);

    press(&mut app, KeyCode::Char('/'));
    assert_eq!(app.input_mode, InputMode::Search);
    type_text(&mut app, "DOG");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.visible_tasks().len(), 1);
    assert_eq!(app.visible_tasks()[0].title, "Walk dog");

    assert!(press(&mut app, KeyCode::Char('q')));
}

#[tokio::test]
async fn test_add_task_through_form() {
    let backend = FakeBackend::new();
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Char('a'));
    assert_eq!(app.input_mode, InputMode::Editing);
    press(&mut app, KeyCode::Char('i'));
    type_text(&mut app, "Pay rent !high");
    press(&mut app, KeyCode::Esc);
    press(&mut app, KeyCode::Enter);
    settle(&mut app).await;

    assert!(app.form.is_none());
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.status.as_deref(), Some("Task created"));
    let tasks = backend.tasks.lock().unwrap().clone();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Pay rent");
    assert_eq!(tasks[0].priority, "high");
    assert_eq!(app.visible_tasks().len(), 1);
}

#[tokio::test]
async fn test_invalid_form_shows_field_errors() {
    let backend = FakeBackend::new();
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Char('a'));
    press(&mut app, KeyCode::Enter);

    let form = app.form.as_ref().expect("form stays open");
    assert_eq!(form.errors.get(Field::Title), Some("Title is required"));
    assert_eq!(form.errors.get(Field::Priority), Some("Priority is required"));
    assert!(form.submitting.is_none());
    assert!(backend.tasks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_editing_priority_keeps_title() {
    let backend = FakeBackend::new();
    backend.seed_task("Read Yahoo!News and fix !important bug", "low", TaskStatus::Pending);
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Char('e'));
    assert_eq!(app.input_mode, InputMode::Editing);
    // Title -> Description -> Category -> Priority
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Right);
    press(&mut app, KeyCode::Enter);
    settle(&mut app).await;

    assert_eq!(app.status.as_deref(), Some("Task updated"));
    let tasks = backend.tasks.lock().unwrap().clone();
    assert_eq!(tasks[0].title, "Read Yahoo!News and fix !important bug");
    assert_eq!(tasks[0].priority, "medium");
}

#[tokio::test]
async fn test_priority_choice_in_form() {
    let backend = FakeBackend::new();
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Char('a'));
    press(&mut app, KeyCode::Char('i'));
    type_text(&mut app, "Stretch");
    press(&mut app, KeyCode::Esc);
    // Title -> Description -> Category -> Priority
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Right);
    press(&mut app, KeyCode::Right);
    press(&mut app, KeyCode::Enter);
    settle(&mut app).await;

    let tasks = backend.tasks.lock().unwrap().clone();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].priority, "medium");
}

#[tokio::test]
async fn test_toggle_and_delete_selected() {
    let backend = FakeBackend::new();
    let task = backend.seed_task("Laundry", "low", TaskStatus::Pending);
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Char('x'));
    settle(&mut app).await;
    assert_eq!(backend.tasks.lock().unwrap()[0].status, TaskStatus::Completed);
    assert!(app.visible_tasks()[0].is_completed());

    press(&mut app, KeyCode::Char('d'));
    assert_eq!(app.input_mode, InputMode::ConfirmDelete);
    assert_eq!(
        app.pending_delete,
        Some(DeleteTarget::Task {
            id: task.id.clone().unwrap(),
            title: "Laundry".to_string()
        })
    );
    press(&mut app, KeyCode::Char('n'));
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(backend.tasks.lock().unwrap().len(), 1);

    press(&mut app, KeyCode::Char('d'));
    press(&mut app, KeyCode::Char('y'));
    settle(&mut app).await;
    assert!(backend.tasks.lock().unwrap().is_empty());
    assert!(app.visible_tasks().is_empty());
    assert_eq!(app.state.selected(), None);
}

#[tokio::test]
async fn test_filter_modal_and_clear() {
    let backend = FakeBackend::new();
    let work = backend.seed_category("Work");
    backend.seed_task("Untagged", "low", TaskStatus::Pending);
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Char('f'));
    assert_eq!(app.input_mode, InputMode::Filter);
    press(&mut app, KeyCode::Right);
    assert_eq!(
        app.filters.category(),
        &CategoryFilter::Only(work.id.clone().unwrap())
    );
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Left);
    assert_eq!(app.filters.sort(), SortOrder::Alphabetical);
    press(&mut app, KeyCode::Esc);

    assert!(app.filters.has_active_filters());
    assert!(app.visible_tasks().is_empty());

    press(&mut app, KeyCode::Char('c'));
    assert!(!app.filters.has_active_filters());
    assert_eq!(app.visible_tasks().len(), 1);
}

#[tokio::test]
async fn test_closing_form_does_not_cancel_request() {
    let backend = FakeBackend::new();
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Char('a'));
    press(&mut app, KeyCode::Char('i'));
    type_text(&mut app, "Quick one !low");
    press(&mut app, KeyCode::Esc);
    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Esc);
    assert!(app.form.is_none());

    settle(&mut app).await;
    assert_eq!(backend.tasks.lock().unwrap().len(), 1);
    assert_eq!(app.visible_tasks().len(), 1);
}

#[tokio::test]
async fn test_category_manager_adds_category() {
    let backend = FakeBackend::new();
    let mut app = loaded_app(&backend).await;

    press(&mut app, KeyCode::Char('g'));
    assert_eq!(app.input_mode, InputMode::Categories);
    press(&mut app, KeyCode::Char('a'));
    press(&mut app, KeyCode::Char('i'));
    type_text(&mut app, "Errands");
    press(&mut app, KeyCode::Esc);
    press(&mut app, KeyCode::Tab);
    press(&mut app, KeyCode::Char('i'));
    type_text(&mut app, "#ff0000");
    press(&mut app, KeyCode::Esc);
    press(&mut app, KeyCode::Enter);
    settle(&mut app).await;

    assert_eq!(app.input_mode, InputMode::Categories);
    assert_eq!(app.categories.len(), 1);
    assert_eq!(app.categories[0].name, "Errands");
    assert_eq!(app.categories[0].color.as_deref(), Some("#ff0000"));
}

#[tokio::test]
async fn test_backend_failure_is_reported() {
    let backend = FakeBackend::new();
    backend.set_failing(true);
    let app = loaded_app(&backend).await;

    assert!(app.tasks.is_none());
    assert!(app.load_error.as_deref().unwrap_or("").contains("backend unavailable"));
    assert!(app.visible_tasks().is_empty());
}
