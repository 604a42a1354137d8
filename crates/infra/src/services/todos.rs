//! Todo use cases: owner-scoped listing and ownership-checked mutation.
//!
//! Mutations run as two store calls (load + check, then write). A concurrent
//! delete between them surfaces as `NotFound`; a concurrent toggle is last
//! write wins.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use tickbox_auth::{AuthzError, Identity, authorize_owner};
use tickbox_core::TodoId;
use tickbox_todos::{NewTodo, Todo};

use crate::store::{StoreError, TodoStore};

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("Todo not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthzError> for TodoError {
    fn from(value: AuthzError) -> Self {
        TodoError::Forbidden(value.to_string())
    }
}

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    /// The requester's todos, newest first.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<Todo>, TodoError> {
        Ok(self.store.list_todos(identity.user_id).await?)
    }

    pub async fn create(&self, identity: &Identity, new: NewTodo) -> Result<Todo, TodoError> {
        let todo = Todo::create(identity.user_id, new, Utc::now());
        self.store.insert_todo(&todo).await?;
        tracing::info!(todo_id = %todo.id, user_id = %identity.user_id, "todo created");
        Ok(todo)
    }

    /// Set `completed` on a todo the requester owns. Setting the current value is a no-op write.
    pub async fn set_completed(&self, identity: &Identity, id: &str, completed: bool) -> Result<Todo, TodoError> {
        let mut todo = self.load_owned(identity, id).await?;
        let now = Utc::now();
        if !self.store.set_completed(todo.id, completed, now).await? {
            return Err(TodoError::NotFound);
        }
        todo.completed = completed;
        todo.updated_at = now;
        Ok(todo)
    }

    pub async fn delete(&self, identity: &Identity, id: &str) -> Result<(), TodoError> {
        let todo = self.load_owned(identity, id).await?;
        if !self.store.delete_todo(todo.id).await? {
            return Err(TodoError::NotFound);
        }
        tracing::info!(todo_id = %todo.id, user_id = %identity.user_id, "todo deleted");
        Ok(())
    }

    /// Resolve `id` and run the ownership check. A malformed id names nothing.
    async fn load_owned(&self, identity: &Identity, id: &str) -> Result<Todo, TodoError> {
        let id: TodoId = id.parse().map_err(|_| TodoError::NotFound)?;
        let todo = self.store.get_todo(id).await?.ok_or(TodoError::NotFound)?;
        if let Err(e) = authorize_owner(&todo, identity) {
            tracing::warn!(todo_id = %todo.id, user_id = %identity.user_id, "todo ownership check failed");
            return Err(e.into());
        }
        Ok(todo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tickbox_auth::Role;
    use tickbox_core::UserId;

    use crate::store::InMemoryStore;

    fn service() -> TodoService {
        TodoService::new(Arc::new(InMemoryStore::new()))
    }

    fn user() -> Identity {
        Identity::new(UserId::new(), Role::User)
    }

    fn new_todo(title: &str) -> NewTodo {
        NewTodo {
            title: title.to_string(),
            date: Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn created_todo_is_listed_once_and_incomplete() {
        let svc = service();
        let alice = user();

        let created = svc.create(&alice, new_todo("Water plants")).await.unwrap();
        let listed = svc.list(&alice).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert!(!listed[0].completed);
        assert!(svc.list(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_owner_cannot_mutate() {
        let svc = service();
        let alice = user();
        let mallory = Identity::new(UserId::new(), Role::Admin);
        let todo = svc.create(&alice, new_todo("Pay rent")).await.unwrap();
        let id = todo.id.to_string();

        assert!(matches!(
            svc.set_completed(&mallory, &id, true).await,
            Err(TodoError::Forbidden(_))
        ));
        assert!(matches!(svc.delete(&mallory, &id).await, Err(TodoError::Forbidden(_))));

        let listed = svc.list(&alice).await.unwrap();
        assert_eq!(listed, vec![todo]);
    }

    #[tokio::test]
    async fn toggle_is_idempotent() {
        let svc = service();
        let alice = user();
        let id = svc.create(&alice, new_todo("Stretch")).await.unwrap().id.to_string();

        assert!(svc.set_completed(&alice, &id, true).await.unwrap().completed);
        assert!(svc.set_completed(&alice, &id, true).await.unwrap().completed);
        assert!(svc.list(&alice).await.unwrap()[0].completed);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let svc = service();
        let alice = user();
        let id = svc.create(&alice, new_todo("Recycle")).await.unwrap().id.to_string();

        svc.delete(&alice, &id).await.unwrap();
        assert!(matches!(svc.delete(&alice, &id).await, Err(TodoError::NotFound)));
    }

    #[tokio::test]
    async fn unknown_or_malformed_ids_are_not_found() {
        let svc = service();
        let alice = user();

        for id in [TodoId::new().to_string(), "not-a-uuid".to_string()] {
            assert!(matches!(svc.set_completed(&alice, &id, true).await, Err(TodoError::NotFound)));
            assert!(matches!(svc.delete(&alice, &id).await, Err(TodoError::NotFound)));
        }
    }
}
