#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskdeck::api::Gateway;
use taskdeck::cache::QueryCache;
use taskdeck::error::GatewayError;
use taskdeck::models::{Category, Task, TaskStatus};
use taskdeck::store::Store;

/// In-memory stand-in for the backend tables.
#[derive(Default)]
pub struct FakeBackend {
    pub tasks: Mutex<Vec<Task>>,
    pub categories: Mutex<Vec<Category>>,
    pub task_lists: AtomicUsize,
    pub category_lists: AtomicUsize,
    pub fail_lists: Mutex<bool>,
    pub list_delay: Mutex<Option<Duration>>,
    next_id: AtomicU64,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeBackend::default())
    }

    pub fn store(self: &Arc<Self>) -> Store {
        Store::new(self.clone(), self.clone(), Arc::new(QueryCache::new()))
    }

    pub fn seed_task(&self, title: &str, priority: &str, status: TaskStatus) -> Task {
        let id = self.next_id();
        let task = Task {
            id: Some(id.clone()),
            title: title.to_string(),
            description: None,
            category_id: None,
            priority: priority.to_string(),
            due_date: Some("2024-06-01".to_string()),
            status,
            created_at: Some(format!("2024-01-01T00:00:{:02}Z", id.parse::<u64>().unwrap_or(0) % 60)),
            updated_at: None,
        };
        self.tasks.lock().unwrap().push(task.clone());
        task
    }

    pub fn seed_category(&self, name: &str) -> Category {
        let category = Category {
            id: Some(self.next_id()),
            name: name.to_string(),
            color: Some("#336699".to_string()),
        };
        self.categories.lock().unwrap().push(category.clone());
        category
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_lists.lock().unwrap() = failing;
    }

    fn next_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    async fn before_list(&self) -> Result<(), GatewayError> {
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_lists.lock().unwrap() {
            return Err(GatewayError::Status {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn not_found(table: &'static str, id: &str) -> GatewayError {
    GatewayError::NotFound {
        table,
        id: id.to_string(),
    }
}

#[async_trait]
impl Gateway<Task> for FakeBackend {
    async fn list(&self) -> Result<Vec<Task>, GatewayError> {
        self.task_lists.fetch_add(1, Ordering::SeqCst);
        self.before_list().await?;
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn create(&self, record: &Task) -> Result<Task, GatewayError> {
        if record.title.trim().is_empty() {
            return Err(GatewayError::Validation("title is required".to_string()));
        }
        let mut task = record.clone();
        task.id = Some(self.next_id());
        task.created_at = Some("2030-01-01T00:00:00Z".to_string());
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, record: &Task) -> Result<Task, GatewayError> {
        let mut tasks = self.tasks.lock().unwrap();
        let existing = tasks
            .iter_mut()
            .find(|t| t.id.as_deref() == Some(id))
            .ok_or_else(|| not_found("Task", id))?;
        let created_at = existing.created_at.clone();
        *existing = Task {
            id: Some(id.to_string()),
            created_at,
            updated_at: Some("2030-01-02T00:00:00Z".to_string()),
            ..record.clone()
        };
        Ok(existing.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id.as_deref() != Some(id));
        if tasks.len() == before {
            return Err(not_found("Task", id));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway<Category> for FakeBackend {
    async fn list(&self) -> Result<Vec<Category>, GatewayError> {
        self.category_lists.fetch_add(1, Ordering::SeqCst);
        self.before_list().await?;
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn create(&self, record: &Category) -> Result<Category, GatewayError> {
        let mut category = record.clone();
        category.id = Some(self.next_id());
        self.categories.lock().unwrap().push(category.clone());
        Ok(category)
    }

    async fn update(&self, id: &str, record: &Category) -> Result<Category, GatewayError> {
        let mut categories = self.categories.lock().unwrap();
        let existing = categories
            .iter_mut()
            .find(|c| c.id.as_deref() == Some(id))
            .ok_or_else(|| not_found("Category", id))?;
        *existing = Category {
            id: Some(id.to_string()),
            ..record.clone()
        };
        Ok(existing.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let mut categories = self.categories.lock().unwrap();
        let before = categories.len();
        categories.retain(|c| c.id.as_deref() != Some(id));
        if categories.len() == before {
            return Err(not_found("Category", id));
        }
        Ok(())
    }
}
