use std::{io, path::PathBuf};
use thiserror::Error;

use crate::due_date::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Format,
    PastDate,
    Storage,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("empty task")]
    EmptyTask,
    #[error("no selection")]
    NoSelection,
    #[error("bad date format")]
    BadDateFormat(#[from] FormatError),
    #[error("date not in future")]
    DateNotInFuture,
    #[error("failed to {action} {}: {source}", path.display())]
    Persist {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::EmptyTask | TaskError::NoSelection => ErrorKind::Validation,
            TaskError::BadDateFormat(_) => ErrorKind::Format,
            TaskError::DateNotInFuture => ErrorKind::PastDate,
            TaskError::Persist { .. } => ErrorKind::Storage,
        }
    }

    /// Message shown to the user next to the failed action.
    pub fn hint(&self) -> String {
        match self {
            TaskError::EmptyTask => "Please enter a task.".to_string(),
            TaskError::NoSelection => "Please select a task to remove.".to_string(),
            TaskError::BadDateFormat(_) => {
                "Invalid date format. Please use MM/DD/YY hh:mm AM/PM.".to_string()
            }
            TaskError::DateNotInFuture => "Due date must be in the future.".to_string(),
            TaskError::Persist { .. } => format!("Could not save tasks: {self}"),
        }
    }
}
