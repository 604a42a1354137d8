//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / network / other | N/A | `Backend` |
//! | Row decode failure | N/A | `Corrupt` |
//!
//! ## Thread Safety
//!
//! `PostgresStore` is `Send + Sync`; all access goes through the SQLx pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;
use uuid::Uuid;

use tickbox_auth::{Account, ProviderId, Role, Session, User};
use tickbox_core::{AccountId, SessionId, TodoId, UserId};
use tickbox_todos::Todo;

use super::r#trait::{SessionStore, StoreError, TodoStore, UserStore, Verification, VerificationStore};
use super::schema::MIGRATIONS;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply `schema::MIGRATIONS` in order. Safe to run repeatedly.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tracing::info!(statements = MIGRATIONS.len(), "schema up to date");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<T, _>(name)
        .map_err(|e| StoreError::Corrupt(format!("column '{name}': {e}")))
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role: String = column(row, "role")?;
    Ok(User {
        id: UserId::from_uuid(column(row, "id")?),
        name: column(row, "name")?,
        email: column(row, "email")?,
        email_verified: column(row, "email_verified")?,
        image: column(row, "image")?,
        role: role.parse::<Role>().map_err(StoreError::Corrupt)?,
        banned: column(row, "banned")?,
        ban_reason: column(row, "ban_reason")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let provider: String = column(row, "provider_id")?;
    Ok(Account {
        id: AccountId::from_uuid(column(row, "id")?),
        user_id: UserId::from_uuid(column(row, "user_id")?),
        provider_id: provider
            .parse::<ProviderId>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        account_id: column(row, "account_id")?,
        password_hash: column(row, "password_hash")?,
        access_token: column(row, "access_token")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<Session, StoreError> {
    Ok(Session {
        id: SessionId::from_uuid(column(row, "id")?),
        user_id: UserId::from_uuid(column(row, "user_id")?),
        token_hash: column(row, "token_hash")?,
        created_at: column(row, "created_at")?,
        expires_at: column(row, "expires_at")?,
        ip_address: column(row, "ip_address")?,
        user_agent: column(row, "user_agent")?,
    })
}

fn todo_from_row(row: &PgRow) -> Result<Todo, StoreError> {
    Ok(Todo {
        id: TodoId::from_uuid(column(row, "id")?),
        title: column(row, "title")?,
        date: column(row, "date")?,
        completed: column(row, "completed")?,
        user_id: UserId::from_uuid(column(row, "user_id")?),
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

const USER_COLUMNS: &str =
    "id, name, email, email_verified, image, role, banned, ban_reason, created_at, updated_at";
const ACCOUNT_COLUMNS: &str =
    "id, user_id, provider_id, account_id, password_hash, access_token, created_at, updated_at";
const SESSION_COLUMNS: &str = "id, user_id, token_hash, created_at, expires_at, ip_address, user_agent";
const TODO_COLUMNS: &str = "id, title, date, completed, user_id, created_at, updated_at";

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO "user" (id, name, email, email_verified, image, role, banned, ban_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(&user.image)
        .bind(user.role.as_str())
        .bind(user.banned)
        .bind(&user.ban_reason)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(r#"SELECT {USER_COLUMNS} FROM "user" WHERE id = $1"#))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(r#"SELECT {USER_COLUMNS} FROM "user" WHERE email = $1"#))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" ORDER BY created_at DESC, id DESC"#
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE "user"
            SET name = $2, email = $3, email_verified = $4, image = $5, role = $6,
                banned = $7, ban_reason = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(&user.image)
        .bind(user.role.as_str())
        .bind(user.banned)
        .bind(&user.ban_reason)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, account), fields(provider = %account.provider_id), err)]
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO account (id, user_id, provider_id, account_id, password_hash, access_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.user_id.as_uuid())
        .bind(account.provider_id.as_str())
        .bind(&account.account_id)
        .bind(&account.password_hash)
        .bind(&account.access_token)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find_account(
        &self,
        provider: ProviderId,
        account_id: &str,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE provider_id = $1 AND account_id = $2"
        ))
        .bind(provider.as_str())
        .bind(account_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_account", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_credential_account(&self, user_id: UserId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE user_id = $1 AND provider_id = $2"
        ))
        .bind(user_id.as_uuid())
        .bind(ProviderId::Credential.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_credential_account", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self, account), err)]
    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE account
            SET password_hash = $2, access_token = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.password_hash)
        .bind(&account.access_token)
        .bind(account.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_account", e))?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions & verifications
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl SessionStore for PostgresStore {
    #[instrument(skip(self, session), fields(user_id = %session.user_id), err)]
    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO session (id, user_id, token_hash, created_at, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(&session.token_hash)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_session", e))?;
        Ok(())
    }

    #[instrument(skip_all, err)]
    async fn find_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM session WHERE token_hash = $1"))
            .bind(token_hash)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_session", e))?;
        row.as_ref().map(session_from_row).transpose()
    }

    #[instrument(skip_all, err)]
    async fn revoke_session(&self, token_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM session WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_session", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn revoke_user_sessions(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM session WHERE user_id = $1 AND ($2::uuid IS NULL OR id <> $2)")
            .bind(user_id.as_uuid())
            .bind(keep.map(Uuid::from))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_user_sessions", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at <= $1")
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("purge_expired_sessions", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl VerificationStore for PostgresStore {
    #[instrument(skip(self, verification), err)]
    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO verification (id, identifier, value, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (identifier)
            DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(verification.id)
        .bind(&verification.identifier)
        .bind(&verification.value)
        .bind(verification.expires_at)
        .bind(verification.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_verification", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn take_verification(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Verification>, StoreError> {
        let row = sqlx::query(
            "DELETE FROM verification WHERE identifier = $1 RETURNING id, identifier, value, expires_at, created_at",
        )
        .bind(identifier)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("take_verification", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let verification = Verification {
            id: column(&row, "id")?,
            identifier: column(&row, "identifier")?,
            value: column(&row, "value")?,
            expires_at: column(&row, "expires_at")?,
            created_at: column(&row, "created_at")?,
        };
        Ok(Some(verification).filter(|v| v.expires_at > now))
    }

    #[instrument(skip(self), err)]
    async fn purge_expired_verifications(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM verification WHERE expires_at <= $1")
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("purge_expired_verifications", e))?;
        Ok(result.rows_affected())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Todos
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TodoStore for PostgresStore {
    #[instrument(skip(self), fields(user_id = %owner), err)]
    async fn list_todos(&self, owner: UserId) -> Result<Vec<Todo>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TODO_COLUMNS} FROM todo WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_todos", e))?;
        rows.iter().map(todo_from_row).collect()
    }

    #[instrument(skip(self, todo), fields(todo_id = %todo.id, user_id = %todo.user_id), err)]
    async fn insert_todo(&self, todo: &Todo) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO todo (id, title, date, completed, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(todo.id.as_uuid())
        .bind(&todo.title)
        .bind(todo.date)
        .bind(todo.completed)
        .bind(todo.user_id.as_uuid())
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_todo", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(todo_id = %id), err)]
    async fn get_todo(&self, id: TodoId) -> Result<Option<Todo>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TODO_COLUMNS} FROM todo WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_todo", e))?;
        row.as_ref().map(todo_from_row).transpose()
    }

    #[instrument(skip(self), fields(todo_id = %id), err)]
    async fn set_completed(
        &self,
        id: TodoId,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE todo SET completed = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(completed)
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_completed", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(todo_id = %id), err)]
    async fn delete_todo(&self, id: TodoId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM todo WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_todo", e))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {}: {}", operation, err))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
