//! Durable action queue - exactly one action in flight, FIFO by submission.
//!
//! A single worker thread owns execution. Submissions enqueue and never
//! preempt; a handler failure marks that one action `failed` and the queue
//! moves on. Follow-up changes returned by handlers are enqueued here, at
//! the tail, keeping handlers free of queue access.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{error, info};

use crate::actions::{ActionRecord, ActionTable, Change};
use crate::config::Config;
use crate::diff;
use crate::error::CoreError;
use crate::executor::{ActionContext, Executor};

enum WorkerMessage {
    Run(u64),
    Shutdown,
}

#[derive(Default)]
struct Inflight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Inflight {
    fn increment(&self) {
        *self.count.lock() += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }
}

pub struct ActionQueue {
    executor: Arc<Executor>,
    table: Arc<ActionTable>,
    tx: Sender<WorkerMessage>,
    inflight: Arc<Inflight>,
    worker: Option<JoinHandle<()>>,
}

impl ActionQueue {
    /// Spawn the worker thread and return the submission surface.
    pub fn start(executor: Executor) -> Self {
        let executor = Arc::new(executor);
        let table = Arc::new(ActionTable::new());
        let inflight = Arc::new(Inflight::default());
        let (tx, rx) = unbounded::<WorkerMessage>();

        let worker = {
            let executor = Arc::clone(&executor);
            let table = Arc::clone(&table);
            let inflight = Arc::clone(&inflight);
            let tx = tx.clone();
            thread::spawn(move || {
                while let Ok(message) = rx.recv() {
                    let id = match message {
                        WorkerMessage::Run(id) => id,
                        WorkerMessage::Shutdown => break,
                    };

                    let Some(record) = table.get(id) else {
                        inflight.decrement();
                        continue;
                    };

                    let ctx = ActionContext::new(&table, id);
                    match executor.run(&record.change, &ctx) {
                        Ok(follow_ups) => {
                            table.complete(id);
                            for change in follow_ups {
                                let follow_up_id = table.insert(change);
                                inflight.increment();
                                // The worker is the only receiver, so this
                                // send can only fail after shutdown.
                                if tx.send(WorkerMessage::Run(follow_up_id)).is_err() {
                                    inflight.decrement();
                                }
                            }
                        }
                        Err(e) => {
                            error!(action = record.change.kind(), id, error = %e, "action failed");
                            table.fail(id, e.to_string());
                        }
                    }
                    inflight.decrement();
                }
            })
        };

        Self { executor, table, tx, inflight, worker: Some(worker) }
    }

    /// Enqueue a change as a `pending` action and return its id.
    pub fn submit(&self, change: Change) -> u64 {
        let id = self.table.insert(change);
        self.inflight.increment();
        if self.tx.send(WorkerMessage::Run(id)).is_err() {
            self.inflight.decrement();
        }
        id
    }

    pub fn submit_all(&self, changes: impl IntoIterator<Item = Change>) -> Vec<u64> {
        changes.into_iter().map(|change| self.submit(change)).collect()
    }

    pub fn record(&self, id: u64) -> Option<ActionRecord> {
        self.table.get(id)
    }

    /// All submitted actions in submission order, for external polling.
    pub fn records(&self) -> Vec<ActionRecord> {
        self.table.list()
    }

    /// Block until every submitted action (including fan-out) has reached a
    /// terminal state.
    pub fn wait_idle(&self) {
        self.inflight.wait_idle();
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Compute the changes a new config would require against the current
    /// config and lock.
    pub fn diff_config(&self, new: &Config) -> Result<Vec<Change>, CoreError> {
        let store = self.executor.store();
        let old = store.read_config()?;
        let lock = store.read_lock()?.unwrap_or_default();
        Ok(diff::compute_changes(old.as_ref(), new, &lock))
    }

    /// Persist the config, then submit each change in order.
    pub fn apply_config(
        &self,
        config: &Config,
        changes: Vec<Change>,
    ) -> Result<Vec<u64>, CoreError> {
        self.executor.store().write_config(config)?;
        info!(changes = changes.len(), "applied config");
        Ok(self.submit_all(changes))
    }
}

impl Drop for ActionQueue {
    fn drop(&mut self) {
        // Everything already queued still drains; Shutdown sits behind it.
        let _ = self.tx.send(WorkerMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
