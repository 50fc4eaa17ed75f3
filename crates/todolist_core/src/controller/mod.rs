//! Presentation controller for the single to-do screen.
//!
//! # Responsibility
//! - Route add/delete input to the provider and reload after each mutation.
//! - Own the in-memory mirror and redraw the list when a load completes.
//!
//! # Invariants
//! - The mirror is replaced as a whole, in delivery order, never patched.
//! - A load whose rows fail to decode leaves the previous mirror in place.
//! - Checking a row deletes its task; the row is unchecked right after.

mod loader;

pub use loader::{LoadOutcome, QueryLoader};

use crate::adapter::{TodoItemAdapter, TodoRowView};
use crate::model::task::{Task, TaskDataError, TaskId};
use crate::provider::{
    ContentAddress, ContentValues, ProviderError, QueryRequest, Selection, TodoProvider,
};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type ControllerResult<T> = Result<T, ControllerError>;

#[derive(Debug)]
pub enum ControllerError {
    Provider(ProviderError),
    MalformedRow(TaskDataError),
    /// A row view was checked before any task was bound to it.
    UnboundRow,
    LoaderStopped,
    LoaderSpawn(std::io::Error),
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(err) => write!(f, "{err}"),
            Self::MalformedRow(err) => write!(f, "malformed task row: {err}"),
            Self::UnboundRow => write!(f, "row view has no bound task"),
            Self::LoaderStopped => write!(f, "query loader is stopped"),
            Self::LoaderSpawn(err) => write!(f, "failed to start query loader: {err}"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Provider(err) => Some(err),
            Self::MalformedRow(err) => Some(err),
            Self::LoaderSpawn(err) => Some(err),
            Self::UnboundRow | Self::LoaderStopped => None,
        }
    }
}

impl From<ProviderError> for ControllerError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

impl From<TaskDataError> for ControllerError {
    fn from(value: TaskDataError) -> Self {
        Self::MalformedRow(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Showing the last loaded list.
    Idle,
    /// At least one query is in flight.
    Loading,
}

/// Receives redraw requests after the mirror changed.
pub trait ListView {
    fn on_data_set_changed(&mut self, adapter: TodoItemAdapter<'_>);
}

/// Mediates between list UI events and the provider.
pub struct TodoListController<V: ListView> {
    provider: Arc<TodoProvider>,
    loader: QueryLoader,
    mirror: Vec<Task>,
    view: V,
    in_flight: usize,
}

impl<V: ListView> TodoListController<V> {
    /// Starts the loader and issues the first load with an empty mirror.
    pub fn on_create(provider: Arc<TodoProvider>, view: V) -> ControllerResult<Self> {
        let loader = QueryLoader::start(Arc::clone(&provider))?;
        let mut controller = Self {
            provider,
            loader,
            mirror: Vec::new(),
            view,
            in_flight: 0,
        };
        controller.restart_loader()?;
        info!("event=controller_create module=controller status=ok");
        Ok(controller)
    }

    /// Re-issues the load regardless of the current state.
    pub fn on_resume(&mut self) -> ControllerResult<()> {
        self.restart_loader()
    }

    /// Inserts `text` as a new task and reloads.
    ///
    /// Whitespace-only input is ignored and yields `Ok(None)`; otherwise the
    /// new row's URI is returned.
    pub fn on_new_item_added(&mut self, text: &str) -> ControllerResult<Option<String>> {
        if text.trim().is_empty() {
            debug!("event=item_add module=controller status=skipped reason=empty_input");
            return Ok(None);
        }

        let uri = self.provider.insert(
            &ContentAddress::Collection.to_uri(),
            &ContentValues::with_task(text),
        )?;
        info!("event=item_add module=controller status=ok uri={uri}");
        self.restart_loader()?;
        Ok(Some(uri))
    }

    /// Deletes one task by id and reloads; returns the deleted row count.
    pub fn on_item_delete(&mut self, id: TaskId) -> ControllerResult<usize> {
        let count = self
            .provider
            .delete(&ContentAddress::Item(id).to_uri(), &Selection::all())?;
        info!("event=item_delete module=controller status=ok id={id} count={count}");
        self.restart_loader()?;
        Ok(count)
    }

    /// Check action of a row: deletes its task, then unchecks the row.
    ///
    /// The row ends up unchecked on every path, including the error ones.
    pub fn on_item_checked(&mut self, row: &mut TodoRowView) -> ControllerResult<usize> {
        let Some(id) = row.item_id() else {
            row.set_checked(false);
            return Err(ControllerError::UnboundRow);
        };
        let result = self.on_item_delete(id);
        row.set_checked(false);
        result
    }

    /// Applies every finished load without blocking; returns how many ran.
    pub fn dispatch_pending(&mut self) -> ControllerResult<usize> {
        let mut delivered = 0;
        while let Some(outcome) = self.loader.try_next() {
            delivered += 1;
            self.on_load_finished(outcome)?;
        }
        Ok(delivered)
    }

    /// Blocks until no load is in flight or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout.
    pub fn await_idle(&mut self, timeout: Duration) -> ControllerResult<bool> {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            match self.loader.next_timeout(remaining)? {
                Some(outcome) => self.on_load_finished(outcome)?,
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    pub fn state(&self) -> ControllerState {
        if self.in_flight > 0 {
            ControllerState::Loading
        } else {
            ControllerState::Idle
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.mirror
    }

    pub fn adapter(&self) -> TodoItemAdapter<'_> {
        TodoItemAdapter::new(&self.mirror)
    }

    pub fn provider(&self) -> &Arc<TodoProvider> {
        &self.provider
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Stops the loader and hands the view back.
    pub fn teardown(self) -> V {
        let Self {
            mut loader, view, ..
        } = self;
        loader.stop();
        info!("event=controller_teardown module=controller status=ok");
        view
    }

    fn restart_loader(&mut self) -> ControllerResult<()> {
        let generation = self
            .loader
            .restart(ContentAddress::Collection.to_uri(), QueryRequest::all())?;
        self.in_flight += 1;
        debug!("event=load_restart module=controller status=start generation={generation}");
        Ok(())
    }

    fn on_load_finished(&mut self, outcome: LoadOutcome) -> ControllerResult<()> {
        self.in_flight = self.in_flight.saturating_sub(1);
        let generation = outcome.generation;

        let rows = outcome.result.map_err(|err| {
            warn!(
                "event=load_finished module=controller status=error generation={generation} error={err}"
            );
            ControllerError::from(err)
        })?;
        let tasks = rows
            .rows()
            .iter()
            .map(Task::from_values)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                warn!(
                    "event=load_finished module=controller status=error generation={generation} error={err}"
                );
                ControllerError::from(err)
            })?;

        self.mirror = tasks;
        debug!(
            "event=load_finished module=controller status=ok generation={generation} rows={}",
            self.mirror.len()
        );
        self.view
            .on_data_set_changed(TodoItemAdapter::new(&self.mirror));
        Ok(())
    }
}
