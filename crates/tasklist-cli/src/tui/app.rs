use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tasklist_core::{
    storage::TaskStorage,
    tasks::{SortMode, Task, TaskError, TaskId},
};
use tasklist_task::TaskStore;
use tracing::debug;

/// What the keyboard is currently driving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// Typing into the search box; the list filters as you type.
    Search,
    Add { buffer: String },
    Edit { id: TaskId, buffer: String },
    ConfirmDelete { id: TaskId, title: String },
    ConfirmClear { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    fn warning(text: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

/// Interactive state on top of a `TaskStore`: search text, sort mode,
/// selection, the active prompt and the last notice.
pub struct App<S: TaskStorage> {
    store: TaskStore<S>,
    search: String,
    sort: SortMode,
    selected: usize,
    mode: Mode,
    notice: Option<Notice>,
    quit: bool,
}

impl<S: TaskStorage> App<S> {
    pub fn new(store: TaskStore<S>, sort: SortMode, warning: Option<TaskError>) -> Self {
        Self {
            store,
            search: String::new(),
            sort,
            selected: 0,
            mode: Mode::Normal,
            notice: warning.map(|w| Notice::error(w.to_string())),
            quit: false,
        }
    }

    pub fn into_store(self) -> TaskStore<S> {
        self.store
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// The rows to render, recomputed from the store each time.
    pub fn visible(&self) -> Vec<Task> {
        self.store.query(&self.search, self.sort)
    }

    /// Selected row index, clamped to the current view.
    pub fn selected_index(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.selected.min(len - 1))
    }

    fn selected_task(&self) -> Option<Task> {
        let view = self.visible();
        let idx = self.selected_index(view.len())?;
        view.into_iter().nth(idx)
    }

    fn select_id(&mut self, id: &TaskId) {
        if let Some(idx) = self.visible().iter().position(|t| &t.id == id) {
            self.selected = idx;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        match self.mode.clone() {
            Mode::Normal => self.handle_normal(key.code),
            Mode::Search => self.handle_search(key.code),
            Mode::Add { buffer } => self.handle_add(key.code, buffer),
            Mode::Edit { id, buffer } => self.handle_edit(key.code, id, buffer),
            Mode::ConfirmDelete { id, title } => self.handle_confirm_delete(key.code, id, title),
            Mode::ConfirmClear { count } => self.handle_confirm_clear(key.code, count),
        }
    }

    fn handle_normal(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('a') => {
                self.mode = Mode::Add {
                    buffer: String::new(),
                }
            }
            KeyCode::Char('e') | KeyCode::Enter => match self.selected_task() {
                Some(task) => {
                    self.mode = Mode::Edit {
                        id: task.id,
                        buffer: task.title,
                    }
                }
                None => self.notice = Some(Notice::info("Select a task first.")),
            },
            KeyCode::Char(' ') | KeyCode::Char('x') => self.toggle_selected(),
            KeyCode::Char('d') | KeyCode::Delete => match self.selected_task() {
                Some(task) => {
                    self.mode = Mode::ConfirmDelete {
                        id: task.id,
                        title: task.title,
                    }
                }
                None => self.notice = Some(Notice::info("Select a task first.")),
            },
            KeyCode::Char('c') => {
                let count = self.store.stats().completed;
                if count == 0 {
                    self.notice = Some(Notice::info("No completed tasks to clear."));
                } else {
                    self.mode = Mode::ConfirmClear { count };
                }
            }
            KeyCode::Char('/') => self.mode = Mode::Search,
            KeyCode::Char('s') => {
                self.sort = self.sort.toggle();
                debug!(sort = ?self.sort, "changed sort mode");
            }
            KeyCode::Char('w') => {
                self.notice = Some(match self.store.save() {
                    Ok(()) => Notice::info("Tasks saved."),
                    Err(err) => Notice::error(format!("Save failed: {err}")),
                });
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.visible().len();
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            _ => {}
        }
    }

    fn handle_search(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => self.mode = Mode::Normal,
            KeyCode::Esc => {
                self.search.clear();
                self.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                self.search.pop();
            }
            KeyCode::Char(c) => {
                self.search.push(c);
                self.selected = 0;
            }
            _ => {}
        }
    }

    fn handle_add(&mut self, code: KeyCode, mut buffer: String) {
        match code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => match self.store.create(&buffer) {
                Ok(task) => {
                    self.mode = Mode::Normal;
                    self.select_id(&task.id);
                    self.notice = Some(Notice::info(format!("Added '{}'.", task.title)));
                }
                Err(TaskError::EmptyTitle) => {
                    self.notice = Some(Notice::warning("Type a task before adding."));
                }
                Err(err) => {
                    self.mode = Mode::Normal;
                    self.notice = Some(storage_notice(err));
                }
            },
            code => {
                edit_buffer(&mut buffer, code);
                self.mode = Mode::Add { buffer };
            }
        }
    }

    fn handle_edit(&mut self, code: KeyCode, id: TaskId, mut buffer: String) {
        match code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => match self.store.edit(&id, &buffer) {
                Ok(task) => {
                    self.mode = Mode::Normal;
                    self.select_id(&task.id);
                    self.notice = Some(Notice::info(format!("Renamed to '{}'.", task.title)));
                }
                Err(TaskError::EmptyTitle) => {
                    self.notice = Some(Notice::warning("A task cannot be left empty."));
                }
                Err(err) => {
                    self.mode = Mode::Normal;
                    self.notice = Some(storage_notice(err));
                }
            },
            code => {
                edit_buffer(&mut buffer, code);
                self.mode = Mode::Edit { id, buffer };
            }
        }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, id: TaskId, title: String) {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.mode = Mode::Normal;
                self.notice = Some(match self.store.delete(&id) {
                    Ok(task) => Notice::info(format!("Removed '{}'.", task.title)),
                    Err(err) => storage_notice(err),
                });
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.notice = Some(Notice::info(format!("Kept '{title}'.")));
            }
            _ => {}
        }
    }

    fn handle_confirm_clear(&mut self, code: KeyCode, count: usize) {
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.mode = Mode::Normal;
                self.notice = Some(match self.store.clear_completed() {
                    Ok(removed) => Notice::info(format!("Removed {removed} completed task(s).")),
                    Err(err) => storage_notice(err),
                });
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.mode = Mode::Normal;
                debug!(count, "clear completed cancelled");
            }
            _ => {}
        }
    }

    fn toggle_selected(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        match self.store.toggle_completed(&task.id) {
            Ok(_) => self.notice = None,
            Err(err) => self.notice = Some(storage_notice(err)),
        }
    }
}

fn edit_buffer(buffer: &mut String, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(c) => buffer.push(c),
        _ => {}
    }
}

/// Notices for failures after validation passed: a vanished selection, or a
/// change that only exists in memory because the write failed.
fn storage_notice(err: TaskError) -> Notice {
    match err {
        TaskError::NotFound { .. } => Notice::info("That task no longer exists."),
        TaskError::StorageIo { .. } | TaskError::CorruptStorage { .. } => {
            Notice::error(format!("Changes are not saved to disk yet: {err}"))
        }
        TaskError::EmptyTitle => Notice::warning(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use tasklist_core::storage::InMemoryTaskStorage;

    use super::*;

    fn app() -> (App<InMemoryTaskStorage>, InMemoryTaskStorage) {
        let storage = InMemoryTaskStorage::new();
        let (store, warning) = TaskStore::open(storage.clone());
        (App::new(store, SortMode::ByDate, warning), storage)
    }

    fn press(app: &mut App<InMemoryTaskStorage>, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App<InMemoryTaskStorage>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add(app: &mut App<InMemoryTaskStorage>, title: &str) {
        press(app, KeyCode::Char('a'));
        type_text(app, title);
        press(app, KeyCode::Enter);
    }

    fn titles(app: &App<InMemoryTaskStorage>) -> Vec<String> {
        app.visible().into_iter().map(|t| t.title).collect()
    }

    #[test]
    fn adds_tasks_and_selects_the_new_one() {
        let (mut app, storage) = app();
        add(&mut app, "first");
        add(&mut app, "second");

        assert_eq!(titles(&app), ["second", "first"]);
        assert_eq!(app.mode(), &Mode::Normal);
        assert_eq!(app.selected_index(2), Some(0));
        assert_eq!(storage.writes(), 3);
    }

    #[test]
    fn blank_add_warns_and_stays_in_prompt() {
        let (mut app, _storage) = app();
        add(&mut app, "   ");

        assert!(matches!(app.mode(), Mode::Add { .. }));
        assert_eq!(app.notice().map(|n| n.level), Some(Level::Warning));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode(), &Mode::Normal);
        assert!(app.visible().is_empty());
    }

    #[test]
    fn edit_is_prefilled_and_cancel_is_a_no_op() {
        let (mut app, storage) = app();
        add(&mut app, "draft");
        let writes = storage.writes();

        press(&mut app, KeyCode::Char('e'));
        match app.mode() {
            Mode::Edit { buffer, .. } => assert_eq!(buffer, "draft"),
            other => panic!("unexpected mode {other:?}"),
        }
        type_text(&mut app, " v2");
        press(&mut app, KeyCode::Esc);

        assert_eq!(titles(&app), ["draft"]);
        assert_eq!(storage.writes(), writes);
    }

    #[test]
    fn edit_submits_new_title() {
        let (mut app, _storage) = app();
        add(&mut app, "draft");
        press(&mut app, KeyCode::Enter);
        for _ in 0.."draft".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "final");
        press(&mut app, KeyCode::Enter);

        assert_eq!(titles(&app), ["final"]);
        assert!(app.store().tasks()[0].updated_at.is_some());
    }

    #[test]
    fn search_filters_live_and_escape_clears_it() {
        let (mut app, _storage) = app();
        add(&mut app, "Buy milk");
        add(&mut app, "Walk dog");
        add(&mut app, "Buy bread");

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "BUY");
        assert_eq!(titles(&app), ["Buy bread", "Buy milk"]);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.search(), "BUY");
        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.search(), "");
        assert_eq!(titles(&app).len(), 3);
    }

    #[test]
    fn sort_key_switches_to_alphabetical() {
        let (mut app, _storage) = app();
        for title in ["banana", "Apple", "cherry"] {
            add(&mut app, title);
        }
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.sort(), SortMode::Alphabetical);
        assert_eq!(titles(&app), ["Apple", "banana", "cherry"]);
    }

    #[test]
    fn toggle_then_confirmed_delete() {
        let (mut app, _storage) = app();
        add(&mut app, "X");
        press(&mut app, KeyCode::Char(' '));
        assert!(app.store().tasks()[0].completed);

        press(&mut app, KeyCode::Char('d'));
        assert!(matches!(app.mode(), Mode::ConfirmDelete { .. }));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.visible().is_empty());
        assert_eq!(app.notice().map(|n| n.text.as_str()), Some("Removed 'X'."));
    }

    #[test]
    fn declined_delete_keeps_task() {
        let (mut app, _storage) = app();
        add(&mut app, "keep");
        press(&mut app, KeyCode::Delete);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(titles(&app), ["keep"]);
    }

    #[test]
    fn clear_completed_needs_something_to_clear() {
        let (mut app, storage) = app();
        add(&mut app, "open");
        let writes = storage.writes();

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.mode(), &Mode::Normal);
        assert_eq!(
            app.notice().map(|n| n.text.as_str()),
            Some("No completed tasks to clear.")
        );
        assert_eq!(storage.writes(), writes);

        add(&mut app, "done");
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.mode(), &Mode::ConfirmClear { count: 1 });
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(titles(&app), ["open"]);
        assert_eq!(
            app.notice().map(|n| n.text.as_str()),
            Some("Removed 1 completed task(s).")
        );
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let (mut app, _storage) = app();
        add(&mut app, "a");
        add(&mut app, "b");
        press(&mut app, KeyCode::Up);
        assert_eq!(app.selected_index(2), Some(0));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_index(2), Some(1));
    }

    #[test]
    fn manual_save_acknowledges_or_reports_failure() {
        let (mut app, storage) = app();
        press(&mut app, KeyCode::Char('w'));
        assert_eq!(app.notice().map(|n| n.text.as_str()), Some("Tasks saved."));

        storage.fail_writes(true);
        press(&mut app, KeyCode::Char('w'));
        assert_eq!(app.notice().map(|n| n.level), Some(Level::Error));
    }

    #[test]
    fn failed_write_warns_but_keeps_task() {
        let (mut app, storage) = app();
        storage.fail_writes(true);
        add(&mut app, "memory only");

        assert_eq!(titles(&app), ["memory only"]);
        assert_eq!(app.notice().map(|n| n.level), Some(Level::Error));
    }

    #[test]
    fn load_warning_is_shown_and_quit_keys_work() {
        let storage = InMemoryTaskStorage::with_contents(b"oops".to_vec());
        let (store, warning) = TaskStore::open(storage);
        let mut app = App::new(store, SortMode::ByDate, warning);
        assert_eq!(app.notice().map(|n| n.level), Some(Level::Error));

        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit());
    }
}
