use std::sync::Arc;
use std::time::Duration;
use todolist_core::{
    ContentAddress, ContentValues, ControllerError, ControllerState, ListView, QueryRequest,
    TaskId, TodoItemAdapter, TodoListController, TodoProvider, TodoRowView, Value,
};

const WAIT: Duration = Duration::from_secs(5);

/// Records what the list would draw on every redraw.
#[derive(Default)]
struct RecordingListView {
    frames: Vec<Vec<(TaskId, String)>>,
}

impl RecordingListView {
    fn last_texts(&self) -> Vec<String> {
        self.frames
            .last()
            .map(|frame| frame.iter().map(|(_, text)| text.clone()).collect())
            .unwrap_or_default()
    }
}

impl ListView for RecordingListView {
    fn on_data_set_changed(&mut self, adapter: TodoItemAdapter<'_>) {
        let frame = adapter
            .views()
            .into_iter()
            .map(|row| (row.item_id().unwrap(), row.text().to_string()))
            .collect();
        self.frames.push(frame);
    }
}

fn create_controller() -> TodoListController<RecordingListView> {
    let provider = Arc::new(TodoProvider::open_in_memory().unwrap());
    TodoListController::on_create(provider, RecordingListView::default()).unwrap()
}

fn texts(controller: &TodoListController<RecordingListView>) -> Vec<String> {
    controller
        .tasks()
        .iter()
        .map(|task| task.text.clone())
        .collect()
}

#[test]
fn create_starts_loading_with_empty_mirror() {
    let mut controller = create_controller();
    assert_eq!(controller.state(), ControllerState::Loading);
    assert!(controller.tasks().is_empty());

    assert!(controller.await_idle(WAIT).unwrap());
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(controller.tasks().is_empty());
    assert_eq!(controller.view().frames.len(), 1);
}

#[test]
fn add_add_delete_scenario_keeps_insertion_order() {
    let mut controller = create_controller();
    controller.await_idle(WAIT).unwrap();

    controller.on_new_item_added("Buy milk").unwrap().unwrap();
    assert_eq!(controller.state(), ControllerState::Loading);
    controller.await_idle(WAIT).unwrap();
    assert_eq!(texts(&controller), vec!["Buy milk"]);

    controller.on_new_item_added("Walk dog").unwrap().unwrap();
    controller.await_idle(WAIT).unwrap();
    assert_eq!(texts(&controller), vec!["Buy milk", "Walk dog"]);

    let milk_id = controller.tasks()[0].id;
    assert_eq!(controller.on_item_delete(milk_id).unwrap(), 1);
    controller.await_idle(WAIT).unwrap();
    assert_eq!(texts(&controller), vec!["Walk dog"]);
    assert_eq!(controller.view().last_texts(), vec!["Walk dog"]);
}

#[test]
fn empty_input_is_ignored() {
    let mut controller = create_controller();
    controller.await_idle(WAIT).unwrap();

    assert_eq!(controller.on_new_item_added("   ").unwrap(), None);
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(controller.tasks().is_empty());
}

#[test]
fn checking_a_row_deletes_its_task_and_unchecks_it() {
    let mut controller = create_controller();
    controller.on_new_item_added("Call mom").unwrap();
    controller.on_new_item_added("Pay rent").unwrap();
    controller.await_idle(WAIT).unwrap();

    let mut row = controller.adapter().get_view(0, None).unwrap();
    row.set_checked(true);
    assert_eq!(controller.on_item_checked(&mut row).unwrap(), 1);
    assert!(!row.is_checked());

    controller.await_idle(WAIT).unwrap();
    assert_eq!(texts(&controller), vec!["Pay rent"]);
}

#[test]
fn checking_an_unbound_row_is_an_error() {
    let mut controller = create_controller();
    let mut row = TodoRowView::new();
    row.set_checked(true);

    let err = controller.on_item_checked(&mut row).unwrap_err();
    assert!(matches!(err, ControllerError::UnboundRow));
    assert!(!row.is_checked());
}

#[test]
fn deleting_missing_id_reports_zero() {
    let mut controller = create_controller();
    assert_eq!(controller.on_item_delete(12_345).unwrap(), 0);
    assert!(controller.await_idle(WAIT).unwrap());
}

#[test]
fn resume_reloads_rows_written_by_someone_else() {
    let mut controller = create_controller();
    controller.await_idle(WAIT).unwrap();

    let uri = ContentAddress::Collection.to_uri();
    controller
        .provider()
        .insert(&uri, &ContentValues::with_task("from elsewhere"))
        .unwrap();
    assert!(controller.tasks().is_empty());

    controller.on_resume().unwrap();
    assert_eq!(controller.state(), ControllerState::Loading);
    controller.await_idle(WAIT).unwrap();
    assert_eq!(texts(&controller), vec!["from elsewhere"]);
}

#[test]
fn every_completed_load_replaces_the_mirror() {
    let mut controller = create_controller();
    controller.on_resume().unwrap();
    controller.on_new_item_added("one").unwrap();

    assert!(controller.await_idle(WAIT).unwrap());
    assert_eq!(controller.view().frames.len(), 3);
    assert_eq!(texts(&controller), vec!["one"]);
}

#[test]
fn dispatch_pending_applies_finished_loads() {
    let mut controller = create_controller();
    controller.on_new_item_added("queued").unwrap();

    let mut delivered = 0;
    for _ in 0..500 {
        delivered += controller.dispatch_pending().unwrap();
        if controller.state() == ControllerState::Idle {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(delivered, 2);
    assert_eq!(texts(&controller), vec!["queued"]);
}

#[test]
fn malformed_row_keeps_previous_mirror() {
    let mut controller = create_controller();
    controller.on_new_item_added("good").unwrap();
    controller.await_idle(WAIT).unwrap();

    // A blob in the task column is stored as-is and cannot become task text.
    let uri = ContentAddress::Collection.to_uri();
    let mut blob_row = ContentValues::new();
    blob_row.put("task", Value::Blob(vec![0xde, 0xad]));
    controller.provider().insert(&uri, &blob_row).unwrap();

    controller.on_resume().unwrap();
    let err = controller.await_idle(WAIT).unwrap_err();
    assert!(matches!(err, ControllerError::MalformedRow(_)));
    assert_eq!(texts(&controller), vec!["good"]);
    assert_eq!(controller.state(), ControllerState::Idle);

    // The provider still answers; only decoding failed.
    let rows = controller
        .provider()
        .query(&uri, &QueryRequest::all())
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn teardown_returns_view_and_stops_loading() {
    let mut controller = create_controller();
    controller.await_idle(WAIT).unwrap();
    let view = controller.teardown();
    assert_eq!(view.frames.len(), 1);
}
