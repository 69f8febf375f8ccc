//! Plain-text rendering of tasks.
//!
//! # Responsibility
//! - Turn a task into a one-line display fragment.
//! - Resolve a fragment anchor back to a task id.
//!
//! # Invariants
//! - The anchor of a rendered task is its decimal id, so
//!   `parse_task_id(&task_anchor(task)) == task.id`.
//! - A fragment never contains a line break, whatever the task text holds.
//! - Rendering reads selection from an injected scratch store only.

use crate::model::task::{Task, TaskId};
use crate::repo::task_repo::{RepoResult, TaskRepository};
use crate::scratch::{read_selection, ScratchStore};

const SELECTED_MARKER: char = '>';
const UNSELECTED_MARKER: char = ' ';
const UNKNOWN_DATE: &str = "----------";

/// Stable identifier of a rendered task.
pub fn task_anchor(task: &Task) -> String {
    task.id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

/// Inverse of [`task_anchor`]. Returns `None` for anything that is not an id.
pub fn parse_task_id(anchor: &str) -> Option<TaskId> {
    anchor.trim().parse().ok()
}

/// Rendered listing plus the number of tasks it holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedList {
    pub text: String,
    pub count: usize,
}

/// Renders `task` as `"<marker> <anchor> <date> [<status>] <text>"`, followed
/// by `" (<tag>, ...)"` when the task is tagged.
pub fn render_task(task: &Task, selected: Option<TaskId>) -> String {
    let marker = if selected.is_some() && selected == task.id {
        SELECTED_MARKER
    } else {
        UNSELECTED_MARKER
    };
    let date = task
        .created_at()
        .map_or_else(|| UNKNOWN_DATE.to_string(), |at| at.format("%Y-%m-%d").to_string());

    let mut line = format!(
        "{marker} {} {date} [{}] {}",
        task_anchor(task),
        task.status,
        flatten(&task.text)
    );
    if !task.tags.is_empty() {
        line.push_str(&format!(" ({})", flatten(&task.tags.join(", "))));
    }
    line
}

/// Renders every task in listing order, one line each.
pub fn render_all<R: TaskRepository>(
    repo: &R,
    scratch: &dyn ScratchStore,
) -> RepoResult<RenderedList> {
    let selected = read_selection(scratch);
    let mut rendered = RenderedList::default();
    repo.list(|task| {
        rendered.text.push_str(&render_task(&task, selected));
        rendered.text.push('\n');
        rendered.count += 1;
    })?;
    Ok(rendered)
}

fn flatten(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}
