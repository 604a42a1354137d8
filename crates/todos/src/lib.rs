//! `tickbox-todos`: todo model and input validation.

pub mod todo;

pub use todo::{CreateTodoInput, NewTodo, Todo, UpdateTodoInput, parse_due_date, validate_title};
