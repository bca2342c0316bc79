use chrono::{NaiveDate, NaiveDateTime};

use crate::due_date;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub due: Option<NaiveDateTime>,
}

impl Task {
    /// Line breaks would split the task across lines of the task file, so
    /// they are folded into spaces.
    pub fn new(description: &str, due: Option<NaiveDateTime>) -> Self {
        let description = description.replace(['\r', '\n'], " ");
        Self { description, due }
    }

    /// Rebuilds a task from one line of the task file.
    ///
    /// Lines without a well-formed trailing `(Due: ...)` marker are kept
    /// whole as the description.
    pub fn from_line(line: &str) -> Self {
        match due_date::split_marker(line) {
            Some((description, due)) => Self {
                description: description.to_string(),
                due: Some(due),
            },
            None => Self {
                description: line.to_string(),
                due: None,
            },
        }
    }

    pub fn display_text(&self) -> String {
        match &self.due {
            Some(due) => format!("{}{}", self.description, due_date::marker(due)),
            None => self.description.clone(),
        }
    }

    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.due.is_some_and(|due| due.date() == day)
    }
}
