use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tickbox_auth::Owned;
use tickbox_core::{DomainError, TodoId, UserId};

pub const MIN_TITLE_LEN: usize = 3;
pub const MAX_TITLE_LEN: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Model
// ─────────────────────────────────────────────────────────────────────────────

/// A todo item owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    /// Due date.
    pub date: DateTime<Utc>,
    pub completed: bool,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Materialize a validated `NewTodo` for `owner`. Todos start incomplete.
    pub fn create(owner: UserId, new: NewTodo, now: DateTime<Utc>) -> Self {
        Self {
            id: TodoId::new(),
            title: new.title,
            date: new.date,
            completed: false,
            user_id: owner,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Owned for Todo {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}

/// A todo that passed validation and is ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub date: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Create payload as received from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTodoInput {
    pub title: String,
    pub date: Option<String>,
}

impl CreateTodoInput {
    pub fn validate(&self) -> Result<NewTodo, DomainError> {
        let title = validate_title(&self.title)?;
        let date = match self.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_due_date(raw)?,
            _ => return Err(DomainError::validation("Select a date")),
        };
        Ok(NewTodo { title, date })
    }
}

/// Completion toggle payload.
#[derive(Debug, Copy, Clone, Deserialize)]
pub struct UpdateTodoInput {
    pub completed: bool,
}

/// Trimmed title, 3..=100 characters.
pub fn validate_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    let len = title.chars().count();
    if len < MIN_TITLE_LEN {
        return Err(DomainError::validation(format!(
            "Title must be at least {MIN_TITLE_LEN} characters."
        )));
    }
    if len > MAX_TITLE_LEN {
        return Err(DomainError::validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters."
        )));
    }
    Ok(title.to_string())
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| DomainError::validation("Select a date"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn input(title: &str, date: Option<&str>) -> CreateTodoInput {
        CreateTodoInput {
            title: title.to_string(),
            date: date.map(str::to_string),
        }
    }

    #[test]
    fn create_starts_incomplete_and_owned() {
        let owner = UserId::new();
        let new = input("Buy milk", Some("2026-01-02")).validate().unwrap();
        let todo = Todo::create(owner, new, Utc::now());

        assert!(!todo.completed);
        assert_eq!(todo.owner_id(), owner);
        assert_eq!(todo.created_at, todo.updated_at);
    }

    #[test]
    fn date_is_required_and_parsed() {
        assert!(input("Buy milk", None).validate().is_err());
        assert!(input("Buy milk", Some("  ")).validate().is_err());
        assert!(input("Buy milk", Some("tomorrow")).validate().is_err());

        let d = parse_due_date("2026-03-04").unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2026, 3, 4, 0));

        let ts = parse_due_date("2026-03-04T10:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn title_is_trimmed_before_length_check() {
        assert_eq!(validate_title("  abc  ").unwrap(), "abc");
        assert!(validate_title("  ab  ").is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let new = input("Walk dog", Some("2026-01-02")).validate().unwrap();
        let todo = Todo::create(UserId::new(), new, Utc::now());
        let json = serde_json::to_value(&todo).unwrap();

        assert_eq!(json["completed"], false);
        assert!(json.get("userId").is_some());
        assert!(json.get("createdAt").is_some());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Titles inside the bounds are accepted verbatim.
            #[test]
            fn accepts_titles_within_bounds(title in "[a-zA-Z0-9][a-zA-Z0-9 ]{1,98}[a-zA-Z0-9]") {
                prop_assert_eq!(validate_title(&title).unwrap(), title);
            }

            /// Anything longer than the maximum is rejected.
            #[test]
            fn rejects_long_titles(title in "[a-z]{101,200}") {
                prop_assert!(validate_title(&title).is_err());
            }

            /// Anything shorter than the minimum is rejected.
            #[test]
            fn rejects_short_titles(title in "[a-z]{0,2}") {
                prop_assert!(validate_title(&title).is_err());
            }
        }
    }
}
