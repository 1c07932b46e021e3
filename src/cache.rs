use crate::error::GatewayError;
use crate::models::{Category, Task};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Tasks,
    Categories,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheKey::Tasks => "tasks",
            CacheKey::Categories => "categories",
        })
    }
}

/// What a subscriber sees of one cached query.
#[derive(Debug)]
pub enum QueryState<T> {
    Idle,
    Loading { previous: Option<Arc<Vec<T>>> },
    Ready(Arc<Vec<T>>),
    Failed {
        error: String,
        previous: Option<Arc<Vec<T>>>,
    },
}

impl<T> QueryState<T> {
    /// Most recent successfully loaded rows, if any.
    pub fn data(&self) -> Option<&Arc<Vec<T>>> {
        match self {
            QueryState::Ready(data) => Some(data),
            QueryState::Loading { previous } | QueryState::Failed { previous, .. } => {
                previous.as_ref()
            }
            QueryState::Idle => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QueryState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

struct Slot<T> {
    data: Option<Arc<Vec<T>>>,
    loaded_generation: Option<u64>,
}

/// One cached list. Concurrent fetches share a single load.
pub struct Query<T> {
    key: CacheKey,
    generation: AtomicU64,
    slot: Mutex<Slot<T>>,
    state: watch::Sender<QueryState<T>>,
}

impl<T> Query<T> {
    pub fn new(key: CacheKey) -> Self {
        let (state, _) = watch::channel(QueryState::Idle);
        Query {
            key,
            generation: AtomicU64::new(0),
            slot: Mutex::new(Slot {
                data: None,
                loaded_generation: None,
            }),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    /// Marks the cached rows stale; the next `fetch` goes to the backend.
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(key = %self.key, generation, "invalidated");
    }

    /// Returns cached rows when still fresh, otherwise runs `load`.
    ///
    /// Callers arriving while a load is in flight wait for it and reuse its
    /// result instead of issuing their own request.
    pub async fn fetch<F, Fut>(&self, load: F) -> Result<Arc<Vec<T>>, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, GatewayError>>,
    {
        let mut slot = self.slot.lock().await;
        let generation = self.generation.load(Ordering::Acquire);

        if slot.loaded_generation == Some(generation) {
            if let Some(data) = &slot.data {
                debug!(key = %self.key, "cache hit");
                return Ok(Arc::clone(data));
            }
        }

        self.state.send_replace(QueryState::Loading {
            previous: slot.data.clone(),
        });

        match load().await {
            Ok(rows) => {
                let data = Arc::new(rows);
                slot.data = Some(Arc::clone(&data));
                slot.loaded_generation = Some(generation);
                debug!(key = %self.key, rows = data.len(), "loaded");
                self.state.send_replace(QueryState::Ready(Arc::clone(&data)));
                Ok(data)
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "load failed");
                self.state.send_replace(QueryState::Failed {
                    error: err.to_string(),
                    previous: slot.data.clone(),
                });
                Err(err)
            }
        }
    }

    pub async fn cached(&self) -> Option<Arc<Vec<T>>> {
        self.slot.lock().await.data.clone()
    }
}

/// Process-wide query store, passed around explicitly.
pub struct QueryCache {
    pub tasks: Query<Task>,
    pub categories: Query<Category>,
}

impl QueryCache {
    pub fn new() -> Self {
        QueryCache {
            tasks: Query::new(CacheKey::Tasks),
            categories: Query::new(CacheKey::Categories),
        }
    }

    pub fn invalidate(&self, key: CacheKey) {
        match key {
            CacheKey::Tasks => self.tasks.invalidate(),
            CacheKey::Categories => self.categories.invalidate(),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
