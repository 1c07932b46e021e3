use crate::api::Gateway;
use crate::cache::{CacheKey, QueryCache};
use crate::error::GatewayError;
use crate::models::{Category, Task};
use crate::validation::{CategoryDraft, TaskDraft};
use std::sync::Arc;
use tracing::{info, warn};

/// Gateway access for the UI, with caching and post-mutation refetches.
///
/// Cheap to clone; clones share the gateways and the cache.
#[derive(Clone)]
pub struct Store {
    tasks: Arc<dyn Gateway<Task>>,
    categories: Arc<dyn Gateway<Category>>,
    cache: Arc<QueryCache>,
}

impl Store {
    pub fn new(
        tasks: Arc<dyn Gateway<Task>>,
        categories: Arc<dyn Gateway<Category>>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Store {
            tasks,
            categories,
            cache,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn fetch_tasks(&self) -> Result<Arc<Vec<Task>>, GatewayError> {
        let gateway = Arc::clone(&self.tasks);
        self.cache.tasks.fetch(|| async move { gateway.list().await }).await
    }

    pub async fn fetch_categories(&self) -> Result<Arc<Vec<Category>>, GatewayError> {
        let gateway = Arc::clone(&self.categories);
        self.cache
            .categories
            .fetch(|| async move { gateway.list().await })
            .await
    }

    /// Drops both cached lists and loads them again.
    pub async fn refresh_all(&self) -> Result<(), GatewayError> {
        self.cache.invalidate(CacheKey::Tasks);
        self.cache.invalidate(CacheKey::Categories);
        let (tasks, categories) = tokio::join!(self.fetch_tasks(), self.fetch_categories());
        tasks?;
        categories?;
        Ok(())
    }

    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task, GatewayError> {
        let created = self.tasks.create(&draft.into_task()).await?;
        info!(id = created.id.as_deref().unwrap_or("?"), "task created");
        self.after_mutation(CacheKey::Tasks).await;
        Ok(created)
    }

    pub async fn update_task(&self, task: &Task, draft: TaskDraft) -> Result<Task, GatewayError> {
        let id = task.id.as_deref().ok_or(GatewayError::MissingId)?;
        let updated = self.tasks.update(id, &draft.apply_to(task)).await?;
        info!(id, "task updated");
        self.after_mutation(CacheKey::Tasks).await;
        Ok(updated)
    }

    /// Flips a task between pending and completed.
    pub async fn toggle_complete(&self, task: &Task) -> Result<Task, GatewayError> {
        let id = task.id.as_deref().ok_or(GatewayError::MissingId)?;
        let toggled = Task {
            status: task.status.toggled(),
            ..task.clone()
        };
        let updated = self.tasks.update(id, &toggled).await?;
        info!(id, status = ?updated.status, "task status changed");
        self.after_mutation(CacheKey::Tasks).await;
        Ok(updated)
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), GatewayError> {
        self.tasks.delete(id).await?;
        info!(id, "task deleted");
        self.after_mutation(CacheKey::Tasks).await;
        Ok(())
    }

    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category, GatewayError> {
        let created = self.categories.create(&draft.into_category()).await?;
        info!(id = created.id.as_deref().unwrap_or("?"), "category created");
        self.after_mutation(CacheKey::Categories).await;
        Ok(created)
    }

    pub async fn update_category(
        &self,
        id: &str,
        draft: CategoryDraft,
    ) -> Result<Category, GatewayError> {
        let updated = self
            .categories
            .update(id, &draft.into_category())
            .await?;
        info!(id, "category updated");
        self.after_mutation(CacheKey::Categories).await;
        Ok(updated)
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), GatewayError> {
        self.categories.delete(id).await?;
        info!(id, "category deleted");
        self.after_mutation(CacheKey::Categories).await;
        Ok(())
    }

    // A failed refetch is visible through the cache state; the mutation itself
    // already succeeded.
    async fn after_mutation(&self, key: CacheKey) {
        self.cache.invalidate(key);
        let refetch = match key {
            CacheKey::Tasks => self.fetch_tasks().await.map(|_| ()),
            CacheKey::Categories => self.fetch_categories().await.map(|_| ()),
        };
        if let Err(err) = refetch {
            warn!(%key, error = %err, "refetch after mutation failed");
        }
    }
}
