use crate::cache::QueryState;
use crate::error::GatewayError;
use crate::filters::{step, FilterState};
use crate::models::{Category, Priority, Task};
use crate::query::visible_tasks;
use crate::store::Store;
use crate::validation::{
    validate_category, validate_task, CategoryForm, Field, TaskForm, ValidationErrors,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::widgets::ListState;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Filter,
    Editing,
    Insert,
    ConfirmDelete,
    Categories,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterField {
    Category,
    Priority,
    Sort,
}

impl FilterField {
    pub const ALL: [FilterField; 3] = [FilterField::Category, FilterField::Priority, FilterField::Sort];
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormKind {
    AddTask,
    EditTask(Task),
    AddCategory,
    EditCategory(String),
}

const TASK_FIELDS: [Field; 5] = [
    Field::Title,
    Field::Description,
    Field::Category,
    Field::Priority,
    Field::DueDate,
];
const CATEGORY_FIELDS: [Field; 2] = [Field::Name, Field::Color];

/// An open add/edit popup.
#[derive(Clone, Debug)]
pub struct FormState {
    pub kind: FormKind,
    pub task: TaskForm,
    pub category: CategoryForm,
    pub active: Field,
    pub errors: ValidationErrors,
    pub submitting: Option<u64>,
}

impl FormState {
    fn new(kind: FormKind) -> Self {
        let task = match &kind {
            FormKind::EditTask(task) => TaskForm::from_task(task),
            _ => TaskForm::new(),
        };
        let active = if kind.is_category() {
            Field::Name
        } else {
            Field::Title
        };
        FormState {
            kind,
            task,
            category: CategoryForm::default(),
            active,
            errors: ValidationErrors::default(),
            submitting: None,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.kind {
            FormKind::AddTask => "Add New Task",
            FormKind::EditTask(_) => "Edit Task",
            FormKind::AddCategory => "Add Category",
            FormKind::EditCategory(_) => "Edit Category",
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        if self.kind.is_category() {
            &CATEGORY_FIELDS
        } else {
            &TASK_FIELDS
        }
    }

    pub fn is_text(field: Field) -> bool {
        !matches!(field, Field::Category | Field::Priority)
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.active {
            Field::Title => Some(&mut self.task.title),
            Field::Description => Some(&mut self.task.description),
            Field::DueDate => Some(&mut self.task.due_date),
            Field::Name => Some(&mut self.category.name),
            Field::Color => Some(&mut self.category.color),
            Field::Category | Field::Priority => None,
        }
    }

    fn move_field(&mut self, forward: bool) {
        let fields = self.fields();
        let current = fields.iter().position(|f| *f == self.active).unwrap_or(0);
        self.active = fields[step(current, fields.len(), forward)];
    }

    fn cycle_choice(&mut self, categories: &[Category], forward: bool) {
        match self.active {
            Field::Priority => {
                let mut options = vec![None];
                options.extend(Priority::ALL.iter().copied().map(Some));
                let current = options
                    .iter()
                    .position(|o| *o == self.task.priority)
                    .unwrap_or(0);
                self.task.priority = options[step(current, options.len(), forward)];
            }
            Field::Category => {
                let mut options = vec![None];
                options.extend(categories.iter().filter_map(|c| c.id.clone()).map(Some));
                let current = options
                    .iter()
                    .position(|o| *o == self.task.category_id)
                    .unwrap_or(0);
                self.task.category_id = options[step(current, options.len(), forward)].clone();
            }
            _ => {}
        }
    }
}

impl FormKind {
    pub fn is_category(&self) -> bool {
        matches!(self, FormKind::AddCategory | FormKind::EditCategory(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeleteTarget {
    Task { id: String, title: String },
    Category { id: String, name: String },
}

#[derive(Debug)]
pub enum AppEvent {
    Mutation {
        submission: Option<u64>,
        outcome: Result<&'static str, String>,
    },
}

pub struct App {
    store: Store,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    tasks_rx: watch::Receiver<QueryState<Task>>,
    categories_rx: watch::Receiver<QueryState<Category>>,
    pub tasks: Option<Arc<Vec<Task>>>,
    pub categories: Arc<Vec<Category>>,
    pub loading: bool,
    pub load_error: Option<String>,
    pub filters: FilterState,
    pub state: ListState,
    pub input_mode: InputMode,
    pub filter_field: FilterField,
    pub form: Option<FormState>,
    pub category_state: ListState,
    pub pending_delete: Option<DeleteTarget>,
    pub status: Option<String>,
    next_submission: u64,
}

impl App {
    pub fn new(store: Store) -> App {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let tasks_rx = store.cache().tasks.subscribe();
        let categories_rx = store.cache().categories.subscribe();
        App {
            store,
            events_tx,
            events_rx,
            tasks_rx,
            categories_rx,
            tasks: None,
            categories: Arc::new(Vec::new()),
            loading: false,
            load_error: None,
            filters: FilterState::new(),
            state: ListState::default(),
            input_mode: InputMode::Normal,
            filter_field: FilterField::Category,
            form: None,
            category_state: ListState::default(),
            pending_delete: None,
            status: None,
            next_submission: 0,
        }
    }

    /// Loads tasks and categories in the background.
    pub fn refresh(&self) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.refresh_all().await {
                warn!(error = %err, "refresh failed");
            }
        });
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        visible_tasks(self.tasks.as_deref().map(Vec::as_slice), self.filters.params())
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let selected = self.state.selected()?;
        self.visible_tasks().get(selected).copied()
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.categories.get(self.category_state.selected()?)
    }

    pub fn category(&self, id: Option<&str>) -> Option<&Category> {
        let id = id?;
        self.categories.iter().find(|c| c.id.as_deref() == Some(id))
    }

    /// Pulls in cache updates and finished mutations. Called once per frame.
    pub fn sync(&mut self) {
        if self.tasks_rx.has_changed().unwrap_or(false) {
            let state = self.tasks_rx.borrow_and_update();
            if let Some(data) = state.data() {
                self.tasks = Some(Arc::clone(data));
            }
            self.loading = state.is_loading();
            self.load_error = state.error().map(str::to_string);
        }
        if self.categories_rx.has_changed().unwrap_or(false) {
            let state = self.categories_rx.borrow_and_update();
            if let Some(data) = state.data() {
                self.categories = Arc::clone(data);
            }
        }

        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }

        self.clamp_selection();
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Mutation {
                submission,
                outcome,
            } => {
                let owns_form = submission.is_some()
                    && self.form.as_ref().and_then(|f| f.submitting) == submission;
                match outcome {
                    Ok(message) => {
                        self.status = Some(message.to_string());
                        if owns_form {
                            self.close_form();
                        }
                    }
                    Err(error) => {
                        self.status = Some(format!("Error: {}", error));
                        if owns_form {
                            if let Some(form) = self.form.as_mut() {
                                form.submitting = None;
                            }
                        }
                    }
                }
            }
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tasks().len();
        clamp(&mut self.state, len);
        let len = self.categories.len();
        clamp(&mut self.category_state, len);
    }

    pub fn next(&mut self) {
        let len = self.visible_tasks().len();
        move_selection(&mut self.state, len, true);
    }

    pub fn previous(&mut self) {
        let len = self.visible_tasks().len();
        move_selection(&mut self.state, len, false);
    }

    fn spawn_mutation<F, Fut>(&self, submission: Option<u64>, success: &'static str, run: F)
    where
        F: FnOnce(Store) -> Fut,
        Fut: Future<Output = Result<(), GatewayError>> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let fut = run(self.store.clone());
        tokio::spawn(async move {
            let outcome = fut.await.map(|_| success).map_err(|e| e.to_string());
            // The receiver only goes away when the app quits.
            let _ = tx.send(AppEvent::Mutation {
                submission,
                outcome,
            });
        });
    }

    fn open_form(&mut self, kind: FormKind) {
        self.form = Some(FormState::new(kind));
        self.input_mode = InputMode::Editing;
    }

    fn close_form(&mut self) {
        if let Some(form) = self.form.take() {
            self.input_mode = if form.kind.is_category() {
                InputMode::Categories
            } else {
                InputMode::Normal
            };
        }
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if form.submitting.is_some() {
            return;
        }

        let submission = self.next_submission;
        let kind = form.kind.clone();
        let result = if kind.is_category() {
            validate_category(&form.category).map(|draft| (None, Some(draft)))
        } else {
            validate_task(&form.task).map(|draft| (Some(draft), None))
        };

        let (task_draft, category_draft) = match result {
            Ok(drafts) => drafts,
            Err(errors) => {
                form.errors = errors;
                return;
            }
        };
        form.errors = ValidationErrors::default();
        form.submitting = Some(submission);
        self.next_submission += 1;

        match (kind, task_draft, category_draft) {
            (FormKind::AddTask, Some(draft), _) => {
                self.spawn_mutation(Some(submission), "Task created", move |store| async move {
                    store.create_task(draft).await.map(|_| ())
                });
            }
            (FormKind::EditTask(task), Some(draft), _) => {
                self.spawn_mutation(Some(submission), "Task updated", move |store| async move {
                    store.update_task(&task, draft).await.map(|_| ())
                });
            }
            (FormKind::AddCategory, _, Some(draft)) => {
                self.spawn_mutation(Some(submission), "Category created", move |store| async move {
                    store.create_category(draft).await.map(|_| ())
                });
            }
            (FormKind::EditCategory(id), _, Some(draft)) => {
                self.spawn_mutation(Some(submission), "Category updated", move |store| async move {
                    store.update_category(&id, draft).await.map(|_| ())
                });
            }
            _ => {}
        }
    }

    fn toggle_selected(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            return;
        };
        let message = if task.is_completed() {
            "Task reopened"
        } else {
            "Task completed"
        };
        self.spawn_mutation(None, message, move |store| async move {
            store.toggle_complete(&task).await.map(|_| ())
        });
    }

    fn confirm_delete(&mut self) {
        match self.pending_delete.take() {
            Some(DeleteTarget::Task { id, .. }) => {
                self.spawn_mutation(None, "Task deleted", move |store| async move {
                    store.delete_task(&id).await
                });
                self.input_mode = InputMode::Normal;
            }
            Some(DeleteTarget::Category { id, .. }) => {
                self.spawn_mutation(None, "Category deleted", move |store| async move {
                    store.delete_category(&id).await
                });
                self.input_mode = InputMode::Categories;
            }
            None => self.input_mode = InputMode::Normal,
        }
    }

    fn cancel_delete(&mut self) {
        self.input_mode = match self.pending_delete.take() {
            Some(DeleteTarget::Category { .. }) => InputMode::Categories,
            _ => InputMode::Normal,
        };
    }

    /// Handles one key press. Returns `true` when the app should quit.
    pub fn handle_input(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }

        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Tab => {
                    self.filters.next_tab();
                    self.state.select(Some(0));
                }
                KeyCode::Char('/') => self.input_mode = InputMode::Search,
                KeyCode::Char('f') => {
                    self.filter_field = FilterField::Category;
                    self.input_mode = InputMode::Filter;
                }
                KeyCode::Char('c') => self.filters.clear_filters(),
                KeyCode::Char('a') => self.open_form(FormKind::AddTask),
                KeyCode::Char('e') => {
                    if let Some(task) = self.selected_task().cloned() {
                        self.open_form(FormKind::EditTask(task));
                    }
                }
                KeyCode::Char('x') | KeyCode::Char(' ') => self.toggle_selected(),
                KeyCode::Char('d') => {
                    let target = self.selected_task().and_then(|task| {
                        task.id.clone().map(|id| DeleteTarget::Task {
                            id,
                            title: task.title.clone(),
                        })
                    });
                    if target.is_some() {
                        self.pending_delete = target;
                        self.input_mode = InputMode::ConfirmDelete;
                    }
                }
                KeyCode::Char('g') => {
                    self.input_mode = InputMode::Categories;
                    if self.category_state.selected().is_none() && !self.categories.is_empty() {
                        self.category_state.select(Some(0));
                    }
                }
                KeyCode::Char('r') => {
                    self.status = Some("Refreshing...".to_string());
                    self.refresh();
                }
                _ => {}
            },

            InputMode::Search => match key.code {
                KeyCode::Char(c) => self.filters.push_search(c),
                KeyCode::Backspace => self.filters.pop_search(),
                KeyCode::Enter => self.input_mode = InputMode::Normal,
                KeyCode::Esc => {
                    self.filters.set_search("");
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },

            InputMode::Filter => {
                let position = FilterField::ALL
                    .iter()
                    .position(|f| *f == self.filter_field)
                    .unwrap_or(0);
                match key.code {
                    KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => {
                        self.filter_field =
                            FilterField::ALL[step(position, FilterField::ALL.len(), true)];
                    }
                    KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => {
                        self.filter_field =
                            FilterField::ALL[step(position, FilterField::ALL.len(), false)];
                    }
                    KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
                        let forward = matches!(key.code, KeyCode::Right | KeyCode::Char('l'));
                        match self.filter_field {
                            FilterField::Category => {
                                let categories = Arc::clone(&self.categories);
                                self.filters.cycle_category(&categories, forward);
                            }
                            FilterField::Priority => self.filters.cycle_priority(forward),
                            FilterField::Sort => self.filters.cycle_sort(forward),
                        }
                    }
                    KeyCode::Char('c') => self.filters.clear_filters(),
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('f') => {
                        self.input_mode = InputMode::Normal;
                    }
                    _ => {}
                }
            }

            InputMode::Editing => {
                let categories = Arc::clone(&self.categories);
                let Some(form) = self.form.as_mut() else {
                    self.input_mode = InputMode::Normal;
                    return false;
                };
                match key.code {
                    KeyCode::Char('i') => {
                        if FormState::is_text(form.active) {
                            self.input_mode = InputMode::Insert;
                        }
                    }
                    KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => form.move_field(true),
                    KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => form.move_field(false),
                    KeyCode::Left | KeyCode::Char('h') => form.cycle_choice(&categories, false),
                    KeyCode::Right | KeyCode::Char('l') => form.cycle_choice(&categories, true),
                    KeyCode::Enter => self.submit_form(),
                    // Leaves any in-flight request running.
                    KeyCode::Esc => self.close_form(),
                    _ => {}
                }
            }

            InputMode::Insert => {
                let Some(form) = self.form.as_mut() else {
                    self.input_mode = InputMode::Normal;
                    return false;
                };
                match key.code {
                    KeyCode::Char(c) => {
                        if let Some(text) = form.text_mut() {
                            text.push(c);
                        }
                    }
                    KeyCode::Backspace => {
                        if let Some(text) = form.text_mut() {
                            text.pop();
                        }
                    }
                    KeyCode::Esc | KeyCode::Enter => {
                        self.input_mode = InputMode::Editing;
                    }
                    _ => {}
                }
            }

            InputMode::ConfirmDelete => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Esc => self.cancel_delete(),
                _ => {}
            },

            InputMode::Categories => match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    let len = self.categories.len();
                    move_selection(&mut self.category_state, len, true);
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    let len = self.categories.len();
                    move_selection(&mut self.category_state, len, false);
                }
                KeyCode::Char('a') => self.open_form(FormKind::AddCategory),
                KeyCode::Char('e') => {
                    if let Some(category) = self.selected_category().cloned() {
                        if let Some(id) = category.id.clone() {
                            self.open_form(FormKind::EditCategory(id));
                            if let Some(form) = self.form.as_mut() {
                                form.category = CategoryForm::from_category(&category);
                            }
                        }
                    }
                }
                KeyCode::Char('d') => {
                    let target = self.selected_category().and_then(|category| {
                        category.id.clone().map(|id| DeleteTarget::Category {
                            id,
                            name: category.name.clone(),
                        })
                    });
                    if target.is_some() {
                        self.pending_delete = target;
                        self.input_mode = InputMode::ConfirmDelete;
                    }
                }
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('g') => {
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },
        }
        false
    }
}

fn move_selection(state: &mut ListState, len: usize, forward: bool) {
    if len == 0 {
        state.select(None);
        return;
    }
    let i = match state.selected() {
        Some(i) => step(i.min(len - 1), len, forward),
        None => 0,
    };
    state.select(Some(i));
}

fn clamp(state: &mut ListState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        None => state.select(Some(0)),
        _ => {}
    }
}
