//! Form state for the task and category popups, and the checks that run before
//! anything is sent to the backend.

use crate::models::{parse_timestamp, Category, Priority, Task, TaskStatus};
use crate::parser::{parse_task_input, ParsedTask};
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Title,
    Description,
    Category,
    Priority,
    DueDate,
    Name,
    Color,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Title => "Title",
            Field::Description => "Description",
            Field::Category => "Category",
            Field::Priority => "Priority",
            Field::DueDate => "Due date",
            Field::Name => "Name",
            Field::Color => "Color",
        })
    }
}

/// Field → message map produced by a failed validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn add(&mut self, field: Field, message: &str) {
        self.0.entry(field).or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub category_id: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: String,
    /// Whether `!priority` / `@date` tokens in the title are read. Off for
    /// edits so existing titles are saved as typed.
    pub quick_add: bool,
}

impl TaskForm {
    /// Empty form for a new task, due today.
    pub fn new() -> Self {
        TaskForm {
            title: String::new(),
            description: String::new(),
            category_id: None,
            priority: None,
            due_date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            quick_add: true,
        }
    }

    pub fn from_task(task: &Task) -> Self {
        let due_date = task
            .due_date
            .as_deref()
            .and_then(parse_timestamp)
            .map(|dt| dt.date().format("%Y-%m-%d").to_string())
            .or_else(|| task.due_date.clone())
            .unwrap_or_default();

        TaskForm {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            category_id: task.category_id.clone(),
            priority: task.priority.parse().ok(),
            due_date,
            quick_add: false,
        }
    }
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}

/// A task form that passed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category_id: Option<String>,
    pub priority: Priority,
    pub due_date: NaiveDate,
}

impl TaskDraft {
    pub fn into_task(self) -> Task {
        Task {
            id: None,
            title: self.title,
            description: Some(self.description),
            category_id: self.category_id,
            priority: self.priority.as_str().to_string(),
            due_date: Some(self.due_date.format("%Y-%m-%d").to_string()),
            status: TaskStatus::Pending,
            created_at: None,
            updated_at: None,
        }
    }

    /// Copies the editable fields onto an existing task.
    pub fn apply_to(self, task: &Task) -> Task {
        Task {
            title: self.title,
            description: Some(self.description),
            category_id: self.category_id,
            priority: self.priority.as_str().to_string(),
            due_date: Some(self.due_date.format("%Y-%m-%d").to_string()),
            ..task.clone()
        }
    }
}

pub fn parse_due_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(text).map(|dt| dt.date()))
}

pub fn validate_task(form: &TaskForm) -> Result<TaskDraft, ValidationErrors> {
    let parsed = if form.quick_add {
        parse_task_input(&form.title)
    } else {
        ParsedTask {
            title: form.title.trim().to_string(),
            priority: None,
            due_date: None,
        }
    };
    let priority = form.priority.or(parsed.priority);

    let mut errors = ValidationErrors::default();

    if parsed.title.is_empty() {
        errors.add(Field::Title, "Title is required");
    }
    if priority.is_none() {
        errors.add(Field::Priority, "Priority is required");
    }

    let due_date = if form.due_date.trim().is_empty() {
        match parsed.due_date {
            Some(date) => Some(date),
            None => {
                errors.add(Field::DueDate, "Due date is required");
                None
            }
        }
    } else {
        let date = parse_due_date(&form.due_date);
        if date.is_none() {
            errors.add(Field::DueDate, "Due date is invalid");
        }
        date
    };

    match (priority, due_date) {
        (Some(priority), Some(due_date)) if errors.is_empty() => Ok(TaskDraft {
            title: parsed.title,
            description: form.description.trim().to_string(),
            category_id: form.category_id.clone().filter(|c| !c.is_empty()),
            priority,
            due_date,
        }),
        _ => Err(errors),
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryForm {
    pub name: String,
    pub color: String,
}

impl CategoryForm {
    pub fn from_category(category: &Category) -> Self {
        CategoryForm {
            name: category.name.clone(),
            color: category.color.clone().unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryDraft {
    pub name: String,
    pub color: Option<String>,
}

impl CategoryDraft {
    pub fn into_category(self) -> Category {
        Category {
            id: None,
            name: self.name,
            color: self.color,
        }
    }
}

fn is_hex_color(text: &str) -> bool {
    text.len() == 7
        && text.starts_with('#')
        && text[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn validate_category(form: &CategoryForm) -> Result<CategoryDraft, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let name = form.name.trim();
    let color = form.color.trim();

    if name.is_empty() {
        errors.add(Field::Name, "Name is required");
    }
    if !color.is_empty() && !is_hex_color(color) {
        errors.add(Field::Color, "Color must look like #RRGGBB");
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(CategoryDraft {
        name: name.to_string(),
        color: if color.is_empty() {
            None
        } else {
            Some(color.to_string())
        },
    })
}
