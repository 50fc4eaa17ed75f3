//! Core of the to-do list: storage, provider façade and list controller.
//! UI hosts talk to this crate through the controller or the FFI layer.

pub mod adapter;
pub mod controller;
pub mod db;
pub mod logging;
pub mod model;
pub mod provider;

pub use adapter::{TodoItemAdapter, TodoRowView};
pub use controller::{
    ControllerError, ControllerResult, ControllerState, ListView, TodoListController,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{Task, TaskDataError, TaskId};
pub use provider::{
    ContentAddress, ContentObserver, ContentValues, ObserverId, ProviderError, ProviderResult,
    QueryRequest, ResultSet, Selection, TodoProvider,
};
pub use rusqlite::types::Value;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
