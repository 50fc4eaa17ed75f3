//! List adapter and checkbox row view.
//!
//! The adapter borrows the controller's mirror and binds one row view per
//! position; the row's check action is wired by the host to
//! `TodoListController::on_item_checked`.

use crate::model::task::{Task, TaskId};

/// Checkbox-capable row showing one task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoRowView {
    text: String,
    item_id: Option<TaskId>,
    checked: bool,
}

impl TodoRowView {
    /// Creates an unbound, unchecked row.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, task: &Task) {
        self.text.clone_from(&task.text);
        self.item_id = Some(task.id);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Id of the bound task, `None` until `bind` ran.
    pub fn item_id(&self) -> Option<TaskId> {
        self.item_id
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }
}

/// Maps mirror positions to bound row views.
#[derive(Debug, Clone, Copy)]
pub struct TodoItemAdapter<'a> {
    items: &'a [Task],
}

impl<'a> TodoItemAdapter<'a> {
    pub fn new(items: &'a [Task]) -> Self {
        Self { items }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, position: usize) -> Option<&'a Task> {
        self.items.get(position)
    }

    pub fn item_id(&self, position: usize) -> Option<TaskId> {
        self.item(position).map(|task| task.id)
    }

    /// Binds the task at `position`, reusing `convert_view` when given.
    ///
    /// A recycled view keeps its check state; rows are unchecked by the
    /// controller right after a check-to-delete.
    pub fn get_view(
        &self,
        position: usize,
        convert_view: Option<TodoRowView>,
    ) -> Option<TodoRowView> {
        let task = self.item(position)?;
        let mut view = convert_view.unwrap_or_default();
        view.bind(task);
        Some(view)
    }

    /// Binds every row in order.
    pub fn views(&self) -> Vec<TodoRowView> {
        (0..self.count())
            .filter_map(|position| self.get_view(position, None))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{TodoItemAdapter, TodoRowView};
    use crate::model::task::Task;

    #[test]
    fn get_view_binds_text_and_id() {
        let tasks = vec![Task::new(1, "Buy milk"), Task::new(5, "Walk dog")];
        let adapter = TodoItemAdapter::new(&tasks);

        let row = adapter.get_view(1, None).unwrap();
        assert_eq!(row.text(), "Walk dog");
        assert_eq!(row.item_id(), Some(5));
        assert!(!row.is_checked());
        assert!(adapter.get_view(2, None).is_none());
    }

    #[test]
    fn get_view_reuses_recycled_row() {
        let tasks = vec![Task::new(9, "Call mom")];
        let adapter = TodoItemAdapter::new(&tasks);

        let mut recycled = TodoRowView::new();
        recycled.bind(&Task::new(2, "old"));
        let row = adapter.get_view(0, Some(recycled)).unwrap();
        assert_eq!(row.text(), "Call mom");
        assert_eq!(row.item_id(), Some(9));
    }

    #[test]
    fn views_follow_mirror_order() {
        let tasks = vec![Task::new(3, "a"), Task::new(1, "b")];
        let adapter = TodoItemAdapter::new(&tasks);
        let texts = adapter
            .views()
            .iter()
            .map(|row| row.text().to_string())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(adapter.item_id(0), Some(3));
    }
}
