use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tickbox_auth::{Account, ProviderId, Session, User};
use tickbox_core::{SessionId, TodoId, UserId};
use tickbox_todos::Todo;

use super::r#trait::{SessionStore, StoreError, TodoStore, UserStore, Verification, VerificationStore};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    accounts: Vec<Account>,
    sessions: HashMap<String, Session>,
    verifications: HashMap<String, Verification>,
    /// Insertion-ordered; list ordering relies on it for ties.
    todos: Vec<Todo>,
}

/// In-memory store for tests/dev.
///
/// One lock guards all relations, so every call is atomic on its own.
/// `delete_user` cascades to accounts, sessions and todos.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", user.email)));
        }
        if state.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.accounts.retain(|a| a.user_id != id);
        state.sessions.retain(|_, s| s.user_id != id);
        state.todos.retain(|t| t.user_id != id);
        Ok(true)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let taken = state
            .accounts
            .iter()
            .any(|a| a.provider_id == account.provider_id && a.account_id == account.account_id);
        if taken {
            return Err(StoreError::Conflict(format!(
                "{} account '{}' already linked",
                account.provider_id, account.account_id
            )));
        }
        state.accounts.push(account.clone());
        Ok(())
    }

    async fn find_account(
        &self,
        provider: ProviderId,
        account_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .read()?
            .accounts
            .iter()
            .find(|a| a.provider_id == provider && a.account_id == account_id)
            .cloned())
    }

    async fn find_credential_account(&self, user_id: UserId) -> Result<Option<Account>, StoreError> {
        Ok(self
            .read()?
            .accounts
            .iter()
            .find(|a| a.user_id == user_id && a.provider_id == ProviderId::Credential)
            .cloned())
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if let Some(existing) = state.accounts.iter_mut().find(|a| a.id == account.id) {
            *existing = account.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.sessions.insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.read()?.sessions.get(token_hash).cloned())
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(self.write()?.sessions.remove(token_hash).is_some())
    }

    async fn revoke_user_sessions(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
    ) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, s| s.user_id != user_id || Some(s.id) == keep);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl VerificationStore for InMemoryStore {
    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state
            .verifications
            .insert(verification.identifier.clone(), verification.clone());
        Ok(())
    }

    async fn take_verification(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Verification>, StoreError> {
        let mut state = self.write()?;
        Ok(state
            .verifications
            .remove(identifier)
            .filter(|v| v.expires_at > now))
    }

    async fn purge_expired_verifications(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        let before = state.verifications.len();
        state.verifications.retain(|_, v| v.expires_at > now);
        Ok((before - state.verifications.len()) as u64)
    }
}

#[async_trait]
impl TodoStore for InMemoryStore {
    async fn list_todos(&self, owner: UserId) -> Result<Vec<Todo>, StoreError> {
        let state = self.read()?;
        // Newest insertion first, then a stable sort keeps that order for ties.
        let mut todos: Vec<Todo> = state
            .todos
            .iter()
            .rev()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(todos)
    }

    async fn insert_todo(&self, todo: &Todo) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.todos.iter().any(|t| t.id == todo.id) {
            return Err(StoreError::Conflict(format!("todo {} already exists", todo.id)));
        }
        state.todos.push(todo.clone());
        Ok(())
    }

    async fn get_todo(&self, id: TodoId) -> Result<Option<Todo>, StoreError> {
        Ok(self.read()?.todos.iter().find(|t| t.id == id).cloned())
    }

    async fn set_completed(
        &self,
        id: TodoId,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        match state.todos.iter_mut().find(|t| t.id == id) {
            Some(todo) => {
                todo.completed = completed;
                todo.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_todo(&self, id: TodoId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        let before = state.todos.len();
        state.todos.retain(|t| t.id != id);
        Ok(state.todos.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tickbox_auth::SessionToken;
    use tickbox_todos::NewTodo;

    fn todo_at(owner: UserId, title: &str, at: DateTime<Utc>) -> Todo {
        Todo::create(
            owner,
            NewTodo {
                title: title.to_string(),
                date: at,
            },
            at,
        )
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = InMemoryStore::new();
        let a = User::register("A", "same@example.com", Utc::now()).unwrap();
        let b = User::register("B", "same@example.com", Utc::now()).unwrap();

        store.insert_user(&a).await.unwrap();
        let err = store.insert_user(&b).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_is_owner_scoped_and_newest_first() {
        let store = InMemoryStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let t0 = Utc::now();

        let older = todo_at(alice, "older", t0);
        let newer = todo_at(alice, "newer", t0 + Duration::seconds(5));
        let tie = todo_at(alice, "tie", t0 + Duration::seconds(5));
        let foreign = todo_at(bob, "foreign", t0 + Duration::seconds(10));

        for t in [&older, &newer, &tie, &foreign] {
            store.insert_todo(t).await.unwrap();
        }

        let titles: Vec<String> = store
            .list_todos(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["tie", "newer", "older"]);
    }

    #[tokio::test]
    async fn set_completed_and_delete_report_missing_rows() {
        let store = InMemoryStore::new();
        let todo = todo_at(UserId::new(), "chores", Utc::now());
        store.insert_todo(&todo).await.unwrap();

        assert!(store.set_completed(todo.id, true, Utc::now()).await.unwrap());
        assert!(store.get_todo(todo.id).await.unwrap().unwrap().completed);

        assert!(store.delete_todo(todo.id).await.unwrap());
        assert!(!store.delete_todo(todo.id).await.unwrap());
        assert!(!store.set_completed(todo.id, false, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn revoke_user_sessions_keeps_the_current_one() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let now = Utc::now();

        let current = Session::start(user, &SessionToken::generate(), Duration::hours(1), now);
        let other = Session::start(user, &SessionToken::generate(), Duration::hours(1), now);
        let stranger = Session::start(UserId::new(), &SessionToken::generate(), Duration::hours(1), now);
        for s in [&current, &other, &stranger] {
            store.insert_session(s).await.unwrap();
        }

        let removed = store.revoke_user_sessions(user, Some(current.id)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.find_session(&current.token_hash).await.unwrap().is_some());
        assert!(store.find_session(&other.token_hash).await.unwrap().is_none());
        assert!(store.find_session(&stranger.token_hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn verifications_are_single_use_and_expire() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let v = Verification {
            id: uuid::Uuid::new_v4(),
            identifier: "oauth-state:abc".to_string(),
            value: "github".to_string(),
            expires_at: now + Duration::minutes(10),
            created_at: now,
        };
        store.insert_verification(&v).await.unwrap();

        assert_eq!(store.take_verification("oauth-state:abc", now).await.unwrap(), Some(v.clone()));
        assert_eq!(store.take_verification("oauth-state:abc", now).await.unwrap(), None);

        store.insert_verification(&v).await.unwrap();
        let later = now + Duration::minutes(11);
        assert_eq!(store.take_verification("oauth-state:abc", later).await.unwrap(), None);
    }

    #[tokio::test]
    async fn purging_drops_only_expired_rows() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for i in 0..100 {
            let v = Verification {
                id: uuid::Uuid::new_v4(),
                identifier: format!("oauth-state:{i}"),
                value: "github".to_string(),
                expires_at: now + Duration::minutes(if i == 0 { 30 } else { 10 }),
                created_at: now,
            };
            store.insert_verification(&v).await.unwrap();
        }
        let user = UserId::new();
        let short = Session::start(user, &SessionToken::generate(), Duration::minutes(5), now);
        let long = Session::start(user, &SessionToken::generate(), Duration::hours(1), now);
        store.insert_session(&short).await.unwrap();
        store.insert_session(&long).await.unwrap();

        let later = now + Duration::minutes(20);
        assert_eq!(store.purge_expired_verifications(later).await.unwrap(), 99);
        assert_eq!(store.purge_expired_sessions(later).await.unwrap(), 1);
        assert_eq!(store.read().unwrap().verifications.len(), 1);
        assert!(store.take_verification("oauth-state:0", later).await.unwrap().is_some());
        assert!(store.find_session(&short.token_hash).await.unwrap().is_none());
        assert!(store.find_session(&long.token_hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_user_cascades() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let user = User::register("Gone", "gone@example.com", now).unwrap();
        store.insert_user(&user).await.unwrap();
        let session = Session::start(user.id, &SessionToken::generate(), Duration::hours(1), now);
        store.insert_session(&session).await.unwrap();
        store.insert_todo(&todo_at(user.id, "orphan", now)).await.unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(!store.delete_user(user.id).await.unwrap());
        assert!(store.find_user_by_email("gone@example.com").await.unwrap().is_none());
        assert!(store.find_session(&session.token_hash).await.unwrap().is_none());
        assert!(store.list_todos(user.id).await.unwrap().is_empty());
    }
}
