//! Terminal to-do list with optional due dates and daily due-today reminders.

pub mod config;
pub mod due_date;
pub mod error;
pub mod reminder;
pub mod task;
pub mod task_store;
pub mod ui;
