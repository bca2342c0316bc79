use chrono::NaiveDate;
use std::{
    collections::HashSet,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Display text of the task that is due.
    pub task: String,
}

impl Reminder {
    pub fn message(&self) -> String {
        format!("Task '{}' is due today!", self.task)
    }
}

/// One reminder per task whose due date falls on `today`, in list order.
pub fn check(tasks: &[Task], today: NaiveDate) -> Vec<Reminder> {
    tasks
        .iter()
        .filter(|task| task.is_due_on(today))
        .map(|task| Reminder {
            task: task.display_text(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Scheduled { at: Instant },
}

/// Recurring due-today check driven by the caller's event loop.
///
/// Each run reschedules the next one relative to when it ran, so the
/// schedule drifts with however late the loop gets around to it.
#[derive(Debug)]
pub struct ReminderClock {
    state: ClockState,
    startup_delay: Duration,
    interval: Duration,
    dedupe: bool,
    notified_on: Option<NaiveDate>,
    notified: HashSet<String>,
}

impl ReminderClock {
    pub fn new(startup_delay: Duration, interval: Duration, dedupe: bool) -> Self {
        Self {
            state: ClockState::Idle,
            startup_delay,
            interval,
            dedupe,
            notified_on: None,
            notified: HashSet::new(),
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Queues the first check shortly after `now`. No-op once scheduled.
    pub fn start(&mut self, now: Instant) {
        if self.state == ClockState::Idle {
            self.schedule(now, self.startup_delay);
        }
    }

    /// How long the event loop may sleep before the next check is due.
    pub fn time_until_check(&self, now: Instant) -> Option<Duration> {
        match self.state {
            ClockState::Idle => None,
            ClockState::Scheduled { at } => Some(at.saturating_duration_since(now)),
        }
    }

    /// Runs the check if it is due and schedules the next one.
    ///
    /// Returns `None` when no check was due at `now`.
    pub fn poll(&mut self, now: Instant, today: NaiveDate, tasks: &[Task]) -> Option<Vec<Reminder>> {
        match self.state {
            ClockState::Scheduled { at } if at <= now => {}
            _ => return None,
        }

        let mut reminders = check(tasks, today);
        if self.dedupe {
            if self.notified_on != Some(today) {
                self.notified_on = Some(today);
                self.notified.clear();
            }
            reminders.retain(|r| self.notified.insert(r.task.clone()));
        }
        info!(%today, due = reminders.len(), "checked due dates");

        self.schedule(now, self.interval);
        Some(reminders)
    }

    /// Delays too large for the platform clock leave the clock idle.
    fn schedule(&mut self, now: Instant, delay: Duration) {
        self.state = match now.checked_add(delay) {
            Some(at) => {
                debug!(?delay, "scheduled next due-date check");
                ClockState::Scheduled { at }
            }
            None => {
                warn!(?delay, "due-date check delay out of range, reminders stopped");
                ClockState::Idle
            }
        };
    }
}
