use chrono::NaiveDateTime;
use std::{
    borrow::Cow,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

use crate::due_date;
use crate::error::TaskError;
use crate::task::Task;

/// Ordered task list kept in lockstep with its backing file.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
    save_error: Option<String>,
}

impl TaskStore {
    /// Opens the store at `path`, reading whatever tasks are already there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TaskError> {
        let path = path.into();
        let tasks = load(&path)?;
        info!(path = %path.display(), count = tasks.len(), "loaded tasks");
        Ok(Self {
            path,
            tasks,
            save_error: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn display_lines(&self) -> Vec<String> {
        self.tasks.iter().map(Task::display_text).collect()
    }

    /// Last save failure, cleared by the next successful save.
    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    /// Validates and appends a task, then rewrites the task file.
    ///
    /// `now` is the wall-clock time the due date must lie strictly after.
    pub fn add(
        &mut self,
        description: &str,
        due_date_text: &str,
        now: NaiveDateTime,
    ) -> Result<Task, TaskError> {
        if description.is_empty() {
            return Err(TaskError::EmptyTask);
        }
        let due = if due_date_text.is_empty() {
            None
        } else {
            let due = due_date::parse(due_date_text)?;
            if due <= now {
                return Err(TaskError::DateNotInFuture);
            }
            Some(due)
        };

        // Stored the way a reload would read it back, so a description that
        // already ends in a due marker carries that date in memory too.
        let task = Task::from_line(&Task::new(description, due).display_text());
        self.tasks.push(task.clone());
        info!(task = %task.display_text(), "added task");
        self.flush();
        Ok(task)
    }

    /// Removes the task at `position` (in display order), then rewrites the
    /// task file.
    pub fn remove(&mut self, position: Option<usize>) -> Result<Task, TaskError> {
        let index = position
            .filter(|&i| i < self.tasks.len())
            .ok_or(TaskError::NoSelection)?;
        let task = self.tasks.remove(index);
        info!(task = %task.display_text(), index, "removed task");
        self.flush();
        Ok(task)
    }

    /// Writes the current list out, reporting any failure to the caller.
    pub fn save(&mut self) -> Result<(), TaskError> {
        let result = save(&self.path, &self.tasks);
        self.save_error = result.as_ref().err().map(ToString::to_string);
        result
    }

    fn flush(&mut self) {
        if let Err(err) = self.save() {
            error!(error = %err, "task list kept in memory only");
        }
    }
}

/// Reads one task per line. A missing file is an empty list.
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the load.
pub fn load(path: &Path) -> Result<Vec<Task>, TaskError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(TaskError::Persist {
                action: "read",
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut lines: Vec<&[u8]> = contents.split(|&b| b == b'\n').collect();
    if lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }

    Ok(lines
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            if matches!(line, Cow::Owned(_)) {
                warn!(index, line = %line, "task line is not valid UTF-8");
            }
            let task = Task::from_line(&line);
            if task.due.is_none() && line.contains("(Due: ") {
                warn!(line = %line, "keeping task with unreadable due date as plain text");
            }
            task
        })
        .collect())
}

/// Overwrites `path` with one display line per task.
pub fn save(path: &Path, tasks: &[Task]) -> Result<(), TaskError> {
    let persist = |source| TaskError::Persist {
        action: "write",
        path: path.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(persist)?);
    for task in tasks {
        writeln!(out, "{}", task.display_text()).map_err(persist)?;
    }
    out.flush().map_err(persist)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reminder;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(14, 30, 15)
            .unwrap()
    }

    fn store() -> (TempDir, TaskStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(dir.path().join("tasks.txt")).unwrap();
        (dir, store)
    }

    #[test]
    fn missing_file_opens_empty() {
        let (_dir, store) = store();
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn add_without_due_date_appends_one() {
        let (_dir, mut store) = store();
        for (i, desc) in ["Buy milk", "x", "  padded  ", "日本語"].iter().enumerate() {
            let task = store.add(desc, "", now()).unwrap();
            assert_eq!(task.due, None);
            assert_eq!(store.len(), i + 1);
            assert_eq!(store.display_lines().last().unwrap(), desc);
        }
    }

    #[test]
    fn add_with_future_due_date() {
        let (_dir, mut store) = store();
        let task = store.add("Pay rent", "01/01/30 09:00 AM", now()).unwrap();
        assert_eq!(task.display_text(), "Pay rent (Due: 01/01/30 09:00 AM)");
        assert_eq!(store.display_lines(), vec!["Pay rent (Due: 01/01/30 09:00 AM)"]);
    }

    #[test]
    fn add_rejects_empty_description() {
        let (_dir, mut store) = store();
        let err = store.add("", "01/01/30 09:00 AM", now()).unwrap_err();
        assert!(matches!(err, TaskError::EmptyTask));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "empty task");
        assert!(store.is_empty());
    }

    #[test]
    fn whitespace_description_is_not_empty() {
        let (_dir, mut store) = store();
        let task = store.add("   ", "", now()).unwrap();
        assert_eq!(task.description, "   ");
        assert_eq!(store.display_lines(), vec!["   "]);
    }

    #[test]
    fn description_with_trailing_marker_matches_reload() {
        let (dir, mut store) = store();
        let task = store.add("Note (Due: 10/19/26 05:00 PM)", "", now()).unwrap();
        assert_eq!(task.description, "Note");
        assert!(task.due.is_some());

        let today = now().date();
        assert_eq!(reminder::check(store.tasks(), today).len(), 1);

        let reopened = TaskStore::open(dir.path().join("tasks.txt")).unwrap();
        assert_eq!(reopened.tasks(), store.tasks());
        assert_eq!(reminder::check(reopened.tasks(), today).len(), 1);
    }

    #[test]
    fn load_replaces_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.txt");
        fs::write(&path, b"Buy milk\n\xff\xfe bad\n").unwrap();
        let store = TaskStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.display_lines()[0], "Buy milk");
        assert!(store.display_lines()[1].ends_with(" bad"));
    }

    #[test]
    fn add_rejects_bad_format_and_leaves_list_alone() {
        let (_dir, mut store) = store();
        store.add("Keep me", "", now()).unwrap();
        for bad in ["next week", "1/1/30 9:00 AM", "01/01/2030 09:00 AM", "01/01/30 09:00"] {
            let err = store.add("Pay rent", bad, now()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format);
            assert_eq!(err.to_string(), "bad date format");
        }
        assert_eq!(store.display_lines(), vec!["Keep me"]);
    }

    #[test]
    fn add_rejects_past_dates() {
        let (_dir, mut store) = store();
        let err = store.add("Pay rent", "01/01/20 09:00 AM", now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PastDate);
        assert_eq!(err.to_string(), "date not in future");
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn due_date_must_be_strictly_later_than_now() {
        let (_dir, mut store) = store();
        let at_minute = now().date().and_hms_opt(14, 30, 0).unwrap();
        let err = store.add("Now", "10/19/26 02:30 PM", at_minute).unwrap_err();
        assert!(matches!(err, TaskError::DateNotInFuture));
        assert!(store.add("Soon", "10/19/26 02:31 PM", now()).is_ok());
    }

    #[test]
    fn remove_undoes_add() {
        let (_dir, mut store) = store();
        store.add("First", "", now()).unwrap();
        store.add("Second", "12/25/26 08:00 AM", now()).unwrap();
        let before = store.display_lines();

        let added = store.add("Third", "", now()).unwrap();
        let removed = store.remove(Some(store.len() - 1)).unwrap();
        assert_eq!(removed, added);
        assert_eq!(store.display_lines(), before);
        assert_eq!(load(store.path()).unwrap(), store.tasks());
    }

    #[test]
    fn remove_by_position_keeps_order() {
        let (_dir, mut store) = store();
        for desc in ["a", "b", "c"] {
            store.add(desc, "", now()).unwrap();
        }
        assert_eq!(store.remove(Some(1)).unwrap().description, "b");
        assert_eq!(store.display_lines(), vec!["a", "c"]);
    }

    #[test]
    fn remove_without_selection_fails() {
        let (_dir, mut store) = store();
        let err = store.remove(None).unwrap_err();
        assert_eq!(err.to_string(), "no selection");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = store.remove(Some(0)).unwrap_err();
        assert!(matches!(err, TaskError::NoSelection));

        store.add("only", "", now()).unwrap();
        assert!(matches!(store.remove(Some(1)), Err(TaskError::NoSelection)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn every_mutation_is_written_through() {
        let (dir, mut store) = store();
        store.add("Buy milk", "", now()).unwrap();
        store.add("Finish report", "05/20/27 03:00 PM", now()).unwrap();
        let path = dir.path().join("tasks.txt");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Buy milk\nFinish report (Due: 05/20/27 03:00 PM)\n"
        );

        store.remove(Some(0)).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Finish report (Due: 05/20/27 03:00 PM)\n"
        );

        store.remove(Some(0)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn save_then_load_preserves_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.txt");
        let tasks: Vec<Task> = [
            "Buy milk",
            "Finish report (Due: 05/20/24 03:00 PM)",
            "Odd (Due: not a date)",
            "Buy milk",
        ]
        .into_iter()
        .map(Task::from_line)
        .collect();

        save(&path, &tasks).unwrap();
        let loaded = load(&path).unwrap();
        let lines: Vec<String> = loaded.iter().map(Task::display_text).collect();
        let expected: Vec<String> = tasks.iter().map(Task::display_text).collect();
        assert_eq!(lines, expected);
    }

    #[test]
    fn load_tolerates_crlf_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.txt");
        fs::write(&path, "Buy milk\r\nPay rent (Due: 01/01/30 09:00 AM)\r\n").unwrap();
        let store = TaskStore::open(&path).unwrap();
        assert_eq!(
            store.display_lines(),
            vec!["Buy milk", "Pay rent (Due: 01/01/30 09:00 AM)"]
        );
        assert!(store.tasks()[1].due.is_some());
    }

    #[test]
    fn failed_save_keeps_memory_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("tasks.txt");
        let mut store = TaskStore::open(&path).unwrap();

        let task = store.add("Buy milk", "", now()).unwrap();
        assert_eq!(store.tasks(), &[task]);
        assert!(store.save_error().unwrap().contains("failed to write"));

        fs::create_dir(dir.path().join("missing-dir")).unwrap();
        store.save().unwrap();
        assert_eq!(store.save_error(), None);
        assert_eq!(fs::read_to_string(&path).unwrap(), "Buy milk\n");
    }
}
