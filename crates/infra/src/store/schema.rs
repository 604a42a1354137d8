//! Relational schema for the Postgres backend.
//!
//! Statements are idempotent (`IF NOT EXISTS`) and applied in order at startup.

pub const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS "user" (
        id              UUID PRIMARY KEY,
        name            TEXT NOT NULL,
        email           TEXT NOT NULL UNIQUE,
        email_verified  BOOLEAN NOT NULL DEFAULT FALSE,
        image           TEXT,
        role            TEXT NOT NULL DEFAULT 'user',
        banned          BOOLEAN NOT NULL DEFAULT FALSE,
        ban_reason      TEXT,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS account (
        id              UUID PRIMARY KEY,
        user_id         UUID NOT NULL REFERENCES "user"(id) ON DELETE CASCADE,
        provider_id     TEXT NOT NULL,
        account_id      TEXT NOT NULL,
        password_hash   TEXT,
        access_token    TEXT,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (provider_id, account_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS session (
        id              UUID PRIMARY KEY,
        user_id         UUID NOT NULL REFERENCES "user"(id) ON DELETE CASCADE,
        token_hash      TEXT NOT NULL UNIQUE,
        created_at      TIMESTAMPTZ NOT NULL,
        expires_at      TIMESTAMPTZ NOT NULL,
        ip_address      TEXT,
        user_agent      TEXT
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS session_user_id_idx ON session (user_id)"#,
    r#"CREATE INDEX IF NOT EXISTS session_expires_at_idx ON session (expires_at)"#,
    r#"
    CREATE TABLE IF NOT EXISTS verification (
        id              UUID PRIMARY KEY,
        identifier      TEXT NOT NULL UNIQUE,
        value           TEXT NOT NULL,
        expires_at      TIMESTAMPTZ NOT NULL,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS verification_expires_at_idx ON verification (expires_at)"#,
    r#"
    CREATE TABLE IF NOT EXISTS todo (
        id              UUID PRIMARY KEY,
        title           TEXT NOT NULL,
        date            TIMESTAMPTZ NOT NULL,
        completed       BOOLEAN NOT NULL DEFAULT FALSE,
        user_id         UUID NOT NULL REFERENCES "user"(id) ON DELETE CASCADE,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS todo_user_created_idx ON todo (user_id, created_at DESC)"#,
];
