use common::storage::{Connector, LoadSession};
use common::{Error, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::Batch;
use crate::progress::LoadProgress;

/// Receiving end of the batch queue, shared by all workers. Whoever holds the
/// lock waits for the next batch; the rest wait for the lock.
pub type BatchQueue = Arc<Mutex<mpsc::Receiver<Batch>>>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub batches: u64,
    pub failed_batches: u64,
    pub persisted: u64,
}

/// One load worker with its own store session.
pub struct LoadWorker<S: LoadSession> {
    id: usize,
    session: S,
    progress: Arc<LoadProgress>,
    stats: WorkerStats,
}

impl<S: LoadSession> LoadWorker<S> {
    pub fn new(id: usize, session: S, progress: Arc<LoadProgress>) -> Self {
        Self {
            id,
            session,
            progress,
            stats: WorkerStats::default(),
        }
    }

    /// Writes one batch inside a transaction and returns how many records made
    /// it. Single failed inserts are skipped; a failed begin or commit loses
    /// the whole batch.
    pub fn persist_batch(&mut self, batch: &Batch) -> Result<u64> {
        self.session.begin()?;

        let mut inserted = 0u64;
        for listing in &batch.records {
            match self.session.insert(listing) {
                Ok(()) => inserted += 1,
                Err(e) => warn!(
                    worker = self.id,
                    batch = batch.seq,
                    record_id = listing.id,
                    error = %e,
                    "Skipping record that failed to insert"
                ),
            }
        }

        if let Err(e) = self.session.commit() {
            if let Err(rollback_err) = self.session.rollback() {
                warn!(worker = self.id, batch = batch.seq, error = %rollback_err, "Rollback after failed commit also failed");
            }
            return Err(e);
        }

        Ok(inserted)
    }

    /// Drains the queue until it is closed and empty. Blocks the calling thread.
    pub fn run(mut self, queue: BatchQueue) -> WorkerStats {
        loop {
            let next = queue.blocking_lock().blocking_recv();
            let Some(batch) = next else {
                break;
            };

            self.stats.batches += 1;
            match self.persist_batch(&batch) {
                Ok(inserted) => {
                    self.stats.persisted += inserted;
                    let total = self.progress.record(inserted);
                    info!(
                        worker = self.id,
                        batch = batch.seq,
                        inserted,
                        total,
                        rate = self.progress.rate(total).round(),
                        "Batch committed"
                    );
                }
                Err(e) => {
                    self.stats.failed_batches += 1;
                    error!(
                        worker = self.id,
                        batch = batch.seq,
                        size = batch.len(),
                        error = %e,
                        "Batch lost"
                    );
                }
            }
        }

        info!(
            worker = self.id,
            batches = self.stats.batches,
            failed_batches = self.stats.failed_batches,
            persisted = self.stats.persisted,
            "Worker finished"
        );
        self.stats
    }
}

/// Connects `count` workers and starts each on the blocking pool.
///
/// A worker whose connection fails is logged and never started. When none
/// connect the run fails here, before anything is queued, so the reader can
/// never block on a queue nobody drains.
pub async fn start_workers<C: Connector>(
    connector: Arc<C>,
    count: usize,
    queue: BatchQueue,
    progress: Arc<LoadProgress>,
) -> Result<Vec<JoinHandle<WorkerStats>>> {
    let attempts = (0..count).map(|id| {
        let connector = Arc::clone(&connector);
        tokio::task::spawn_blocking(move || (id, connector.connect()))
    });

    let mut handles = Vec::with_capacity(count);
    for attempt in join_all(attempts).await {
        let (id, session) = attempt?;
        match session {
            Ok(session) => {
                let worker = LoadWorker::new(id, session, Arc::clone(&progress));
                let queue = Arc::clone(&queue);
                handles.push(tokio::task::spawn_blocking(move || worker.run(queue)));
            }
            Err(e) => error!(worker = id, error = %e, "Worker could not connect to the store"),
        }
    }

    if handles.is_empty() {
        return Err(Error::NoWorkers(count));
    }

    info!(started = handles.len(), requested = count, "Load workers running");
    Ok(handles)
}
