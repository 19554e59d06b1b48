//! In-memory to-do store.
//!
//! Process-wide and non-durable: everything is lost on restart. Ids come from
//! a counter kept next to the map, so an id is never handed out twice even
//! after deletions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::TodoId;

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub done: bool,
}

/// Fields to change in [`TodoStore::update`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TodoPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
}

/// Errors from to-do operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    NotFound(TodoId),
}

impl fmt::Display for TodoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(_) => write!(f, "Todo not found"),
        }
    }
}

impl std::error::Error for TodoError {}

#[derive(Default)]
struct Inner {
    todos: BTreeMap<u64, Todo>,
    last_id: u64,
}

/// Shared to-do map. Each operation holds the lock for its whole
/// read-modify-write.
#[derive(Default)]
pub struct TodoStore {
    inner: RwLock<Inner>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All to-dos in id order.
    pub async fn list(&self) -> Vec<Todo> {
        self.inner.read().await.todos.values().cloned().collect()
    }

    /// Create a new, not yet done, to-do.
    pub async fn create(&self, text: impl Into<String>) -> Todo {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let key = inner.last_id;
        let todo = Todo {
            id: TodoId::new(key.to_string()),
            text: text.into(),
            done: false,
        };
        inner.todos.insert(key, todo.clone());
        todo
    }

    /// Apply `patch` to an existing to-do and return the updated record.
    pub async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<Todo, TodoError> {
        let mut inner = self.inner.write().await;
        let todo = parse_key(id)
            .and_then(|key| inner.todos.get_mut(&key))
            .ok_or_else(|| TodoError::NotFound(id.clone()))?;

        if let Some(text) = patch.text {
            todo.text = text;
        }
        if let Some(done) = patch.done {
            todo.done = done;
        }
        Ok(todo.clone())
    }

    /// Remove a to-do and return it.
    pub async fn delete(&self, id: &TodoId) -> Result<Todo, TodoError> {
        let mut inner = self.inner.write().await;
        parse_key(id)
            .and_then(|key| inner.todos.remove(&key))
            .ok_or_else(|| TodoError::NotFound(id.clone()))
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.todos.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// Only canonical decimal ids were ever issued; "01" or "+1" name nothing.
fn parse_key(id: &TodoId) -> Option<u64> {
    let key: u64 = id.as_str().parse().ok()?;
    (key.to_string() == id.as_str()).then_some(key)
}
