//! Background query loader.
//!
//! # Invariants
//! - Queries run on the `todo-loader` thread; results are only applied when
//!   the owning thread drains them.
//! - Every restart is answered by exactly one outcome unless the loader is
//!   stopped first. Older outcomes are not cancelled.

use super::{ControllerError, ControllerResult};
use crate::provider::{ProviderResult, QueryRequest, ResultSet, TodoProvider};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct LoadRequest {
    generation: u64,
    uri: String,
    request: QueryRequest,
}

/// Result of one background query.
#[derive(Debug)]
pub struct LoadOutcome {
    /// Sequence number of the restart that produced this outcome.
    pub generation: u64,
    pub result: ProviderResult<ResultSet>,
}

/// Persistent loader re-running one query on demand.
pub struct QueryLoader {
    requests: Option<Sender<LoadRequest>>,
    results: Receiver<LoadOutcome>,
    stopped: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    next_generation: u64,
}

impl QueryLoader {
    /// Spawns the loader thread against `provider`.
    pub fn start(provider: Arc<TodoProvider>) -> ControllerResult<Self> {
        let (request_tx, request_rx) = crossbeam::channel::unbounded::<LoadRequest>();
        let (result_tx, result_rx) = crossbeam::channel::unbounded::<LoadOutcome>();
        let stopped = Arc::new(AtomicBool::new(false));
        let worker_stopped = Arc::clone(&stopped);

        let worker = thread::Builder::new()
            .name("todo-loader".to_string())
            .spawn(move || run_worker(&provider, &request_rx, &result_tx, &worker_stopped))
            .map_err(ControllerError::LoaderSpawn)?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            stopped,
            worker: Some(worker),
            next_generation: 0,
        })
    }

    /// Queues a fresh run of the query and returns its generation.
    pub fn restart(&mut self, uri: String, request: QueryRequest) -> ControllerResult<u64> {
        let sender = self.requests.as_ref().ok_or(ControllerError::LoaderStopped)?;
        self.next_generation += 1;
        let generation = self.next_generation;
        sender
            .send(LoadRequest {
                generation,
                uri,
                request,
            })
            .map_err(|_| ControllerError::LoaderStopped)?;
        Ok(generation)
    }

    /// Returns a finished outcome without blocking.
    pub fn try_next(&self) -> Option<LoadOutcome> {
        self.results.try_recv().ok()
    }

    /// Waits up to `timeout` for the next outcome.
    pub fn next_timeout(&self, timeout: Duration) -> ControllerResult<Option<LoadOutcome>> {
        match self.results.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ControllerError::LoaderStopped),
        }
    }

    /// Stops the worker; queued queries that have not started are dropped.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=loader_stop module=controller status=error error_code=worker_panicked");
            }
        }
    }
}

impl Drop for QueryLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    provider: &TodoProvider,
    requests: &Receiver<LoadRequest>,
    results: &Sender<LoadOutcome>,
    stopped: &AtomicBool,
) {
    for LoadRequest {
        generation,
        uri,
        request,
    } in requests.iter()
    {
        if stopped.load(Ordering::SeqCst) {
            break;
        }
        let result = provider.query(&uri, &request);
        debug!(
            "event=loader_query module=controller status={} generation={generation}",
            if result.is_ok() { "ok" } else { "error" }
        );
        if results.send(LoadOutcome { generation, result }).is_err() {
            break;
        }
    }
}
