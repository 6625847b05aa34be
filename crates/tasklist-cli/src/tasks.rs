use std::io::{BufRead, Write};

use color_eyre::{eyre::bail, Result};
use tasklist_core::{
    storage::TaskStorage,
    tasks::{SortMode, Task, TaskError, TaskId, TaskStats},
};
use tasklist_task::TaskStore;

use crate::cli::Command;

const SHORT_ID_LEN: usize = 8;

/// Execute a non-interactive task subcommand against an opened store.
/// Confirmation prompts read from `input`; everything else goes to `out`.
pub fn handle<S, W, R>(
    cmd: Command,
    store: &mut TaskStore<S>,
    default_sort: SortMode,
    out: &mut W,
    input: &mut R,
) -> Result<()>
where
    S: TaskStorage,
    W: Write,
    R: BufRead,
{
    match cmd {
        Command::List { search, sort } => {
            let sort = sort.map(SortMode::from).unwrap_or(default_sort);
            let view = store.query(search.as_deref().unwrap_or(""), sort);
            writeln!(out, "{}", stats_line(&store.stats()))?;
            if view.is_empty() {
                if store.tasks().is_empty() {
                    writeln!(out, "No tasks yet. Add one with `tasklist add <title>`.")?;
                } else {
                    writeln!(out, "No tasks match the search.")?;
                }
                return Ok(());
            }
            for task in &view {
                writeln!(out, "{}", task_line(task))?;
            }
        }
        Command::Add { title } => {
            let task = store.create(&title.join(" "))?;
            writeln!(out, "Created task {}: {}", short_id(&task.id), task.title)?;
        }
        Command::Edit { id, title } => {
            let id = resolve_id(store, &id)?;
            let task = store.edit(&id, &title.join(" "))?;
            writeln!(out, "Renamed {}: {}", short_id(&task.id), task.title)?;
        }
        Command::Toggle { id } => {
            let id = resolve_id(store, &id)?;
            let task = store.toggle_completed(&id)?;
            let state = if task.completed { "done" } else { "pending" };
            writeln!(out, "Marked {state}: {}", task.title)?;
        }
        Command::Rm { id, yes } => {
            let id = resolve_id(store, &id)?;
            let title = store
                .get(&id)
                .map(|t| t.title.clone())
                .ok_or_else(|| TaskError::NotFound { id: id.to_string() })?;
            if !yes && !confirm(&format!("Remove task '{title}'?"), out, input)? {
                writeln!(out, "Kept '{title}'.")?;
                return Ok(());
            }
            let removed = store.delete(&id)?;
            writeln!(out, "Removed '{}'.", removed.title)?;
        }
        Command::Clear { yes } => {
            let pending_removal = store.stats().completed;
            if pending_removal == 0 {
                writeln!(out, "No completed tasks to clear.")?;
                return Ok(());
            }
            let prompt = format!("Remove {pending_removal} completed task(s)?");
            if !yes && !confirm(&prompt, out, input)? {
                writeln!(out, "Nothing removed.")?;
                return Ok(());
            }
            let removed = store.clear_completed()?;
            writeln!(out, "Removed {removed} completed task(s).")?;
        }
        Command::Stats => writeln!(out, "{}", stats_line(&store.stats()))?,
        Command::Save => {
            store.save()?;
            writeln!(out, "Tasks saved.")?;
        }
        other => bail!("not a task command: {other:?}"),
    }

    Ok(())
}

/// Accept a full id or any unique prefix of one. Prefixes ignore case and
/// dashes, so the hyphenless form of a UUID works as well.
pub fn resolve_id<S: TaskStorage>(store: &TaskStore<S>, raw: &str) -> Result<TaskId> {
    let raw = raw.trim();
    let needle = compact(raw);
    if needle.is_empty() {
        return Err(TaskError::NotFound { id: raw.to_string() }.into());
    }
    if let Some(task) = store.tasks().iter().find(|t| t.id.as_str() == raw) {
        return Ok(task.id.clone());
    }
    let matches: Vec<&TaskId> = store
        .tasks()
        .iter()
        .map(|t| &t.id)
        .filter(|id| compact(id.as_str()).starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => Err(TaskError::NotFound { id: raw.to_string() }.into()),
        many => bail!("id prefix '{raw}' matches {} tasks", many.len()),
    }
}

pub fn stats_line(stats: &TaskStats) -> String {
    format!(
        "Total: {} | Pending: {} | Completed: {}",
        stats.total, stats.pending, stats.completed
    )
}

pub fn short_id(id: &TaskId) -> String {
    id.as_str().chars().take(SHORT_ID_LEN).collect()
}

fn compact(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    format!("{mark} {}  {}", short_id(&task.id), task.title)
}

fn confirm<W: Write, R: BufRead>(prompt: &str, out: &mut W, input: &mut R) -> Result<bool> {
    write!(out, "{prompt} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
