use crate::error::TaskError;
use crate::reminder::{Reminder, ReminderClock};
use crate::task_store::TaskStore;
use chrono::{Local, NaiveDate, NaiveDateTime};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::{
    collections::VecDeque,
    io,
    time::{Duration, Instant},
};
use tracing::{error, info, warn};

const HELP: &str = "Enter: add  Tab: switch field  Up/Down: select  Del: remove  Esc: quit";

/// Upper bound on how long the loop blocks waiting for input.
const MAX_IDLE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Description,
    DueDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Info(String),
    Warning(String),
}

pub struct App {
    store: TaskStore,
    clock: ReminderClock,
    description: String,
    due_date: String,
    focus: Field,
    list_state: ListState,
    status: Option<Status>,
    reminders: VecDeque<Reminder>,
    quit: bool,
}

impl App {
    pub fn new(store: TaskStore, clock: ReminderClock) -> Self {
        Self {
            store,
            clock,
            description: String::new(),
            due_date: String::new(),
            focus: Field::Description,
            list_state: ListState::default(),
            status: None,
            reminders: VecDeque::new(),
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Final flush before the window goes away.
    pub fn close(&mut self) -> Result<(), TaskError> {
        self.store.save()
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: NaiveDateTime) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.reminders.pop_front().is_some() {
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char('c') if ctrl => self.quit = true,
            KeyCode::Char('d') if ctrl => self.remove_task(),
            KeyCode::Delete => self.remove_task(),
            KeyCode::Enter => self.add_task(now),
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Field::Description => Field::DueDate,
                    Field::DueDate => Field::Description,
                }
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Backspace => {
                self.input_mut().pop();
            }
            KeyCode::Char(c) if !ctrl => self.input_mut().push(c),
            _ => {}
        }
    }

    /// Runs the reminder check if it is due and queues whatever it finds.
    pub fn tick(&mut self, now: Instant, today: NaiveDate) {
        if let Some(found) = self.clock.poll(now, today, self.store.tasks()) {
            for reminder in &found {
                info!(task = %reminder.task, "task due today");
            }
            self.reminders.extend(found);
        }
    }

    fn input_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Description => &mut self.description,
            Field::DueDate => &mut self.due_date,
        }
    }

    fn add_task(&mut self, now: NaiveDateTime) {
        match self.store.add(&self.description, &self.due_date, now) {
            Ok(_) => {
                self.description.clear();
                self.due_date.clear();
                self.focus = Field::Description;
                self.status = None;
                self.report_save_failure();
            }
            Err(err) => self.warn(err),
        }
    }

    fn remove_task(&mut self) {
        match self.store.remove(self.list_state.selected()) {
            Ok(task) => {
                self.status = Some(Status::Info(format!(
                    "Task \"{}\" removed.",
                    task.display_text()
                )));
                let len = self.store.len();
                if len == 0 {
                    self.list_state.select(None);
                } else if let Some(i) = self.list_state.selected() {
                    self.list_state.select(Some(i.min(len - 1)));
                }
                self.report_save_failure();
            }
            Err(err) => self.warn(err),
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.store.len();
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let next = match self.list_state.selected() {
            None if delta < 0 => len - 1,
            None => 0,
            Some(i) => (i as isize + delta).clamp(0, len as isize - 1) as usize,
        };
        self.list_state.select(Some(next));
    }

    fn warn(&mut self, err: TaskError) {
        warn!(error = %err, "action rejected");
        self.status = Some(Status::Warning(err.hint()));
    }

    fn report_save_failure(&mut self) {
        if let Some(err) = self.store.save_error() {
            self.status = Some(Status::Warning(format!("Could not save tasks: {err}")));
        }
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    app.clock.start(Instant::now());
    loop {
        app.tick(Instant::now(), Local::now().date_naive());
        terminal.draw(|f| draw(f, app))?;

        let timeout = app
            .clock
            .time_until_check(Instant::now())
            .map_or(MAX_IDLE, |wait| wait.min(MAX_IDLE));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key, Local::now().naive_local());
            }
        }
        if app.should_quit() {
            return Ok(());
        }
    }
}

/// Saves the task list, then puts the terminal back.
///
/// The save happens first so a failing teardown cannot skip it. Teardown
/// failures are only logged.
pub fn shutdown(app: &mut App, restore: impl FnOnce() -> io::Result<()>) -> Result<(), TaskError> {
    let saved = app.close();
    if let Err(err) = &saved {
        error!(error = %err, "final save failed");
    }
    if let Err(err) = restore() {
        error!(error = %err, "failed to restore terminal");
    }
    saved
}

fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let inputs = [
        (Field::Description, "Task", &app.description, chunks[0]),
        (
            Field::DueDate,
            "Due Date (MM/DD/YY hh:mm AM/PM)",
            &app.due_date,
            chunks[1],
        ),
    ];
    for (field, title, text, area) in inputs {
        let focused = app.focus == field;
        let input = Paragraph::new(text.as_str()).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(if focused {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default()
                }),
        );
        f.render_widget(input, area);
        if focused && app.reminders.is_empty() {
            let x = area.x + 1 + text.chars().count() as u16;
            f.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
        }
    }

    let items: Vec<ListItem> = app
        .store
        .display_lines()
        .into_iter()
        .map(|line| ListItem::new(Line::from(Span::raw(line))))
        .collect();
    let list = List::new(items)
        .block(Block::default().title("To-Do").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, chunks[2], &mut app.list_state);

    let status = match &app.status {
        Some(Status::Warning(msg)) => Span::styled(msg.as_str(), Style::default().fg(Color::Yellow)),
        Some(Status::Info(msg)) => Span::styled(msg.as_str(), Style::default().fg(Color::Green)),
        None => Span::styled(HELP, Style::default().fg(Color::DarkGray)),
    };
    f.render_widget(Paragraph::new(Line::from(status)), chunks[3]);

    if let Some(reminder) = app.reminders.front() {
        let area = centered_rect(60, 20, f.area());
        let popup = Paragraph::new(reminder.message())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Reminder")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            );
        f.render_widget(Clear, area);
        f.render_widget(popup, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(rows[1])[1]
}
