use chrono::Utc;
use common::config::IngestConfig;
use common::storage::{Connector, LoadSession};
use common::{Error, Result};
use futures::future::join_all;
use std::io::Read;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::batcher::Batcher;
use crate::models::{Batch, LoadReport};
use crate::parser::ListingReader;
use crate::progress::LoadProgress;
use crate::worker::start_workers;

/// Owns the batch queue and the worker pool for one load run.
pub struct IngestCoordinator<C: Connector> {
    connector: Arc<C>,
    config: IngestConfig,
}

#[derive(Debug, Default)]
struct Produced {
    rows_read: u64,
    batches: u64,
}

impl<C: Connector> IngestCoordinator<C> {
    pub fn new(connector: Arc<C>, config: IngestConfig) -> Self {
        Self { connector, config }
    }

    /// Deletes every stored listing. Called once before `run`.
    pub async fn clear_store(&self) -> Result<()> {
        let connector = Arc::clone(&self.connector);
        tokio::task::spawn_blocking(move || connector.connect()?.clear_all()).await??;
        info!("Store cleared");
        Ok(())
    }

    /// Streams `reader` through the batcher into the worker pool and waits
    /// until every queued batch has been handled.
    pub async fn run<R>(&self, reader: ListingReader<R>) -> Result<LoadReport>
    where
        R: Read + Send + 'static,
    {
        self.config.validate()?;

        let started_at = Utc::now();
        let progress = Arc::new(LoadProgress::start());
        let capacity = self.config.queue_capacity();
        let (tx, rx) = mpsc::channel::<Batch>(capacity);

        let workers = start_workers(
            Arc::clone(&self.connector),
            self.config.workers,
            Arc::new(Mutex::new(rx)),
            Arc::clone(&progress),
        )
        .await?;

        info!(
            workers = workers.len(),
            batch_size = self.config.batch_size,
            queue_capacity = capacity,
            "Starting load"
        );

        let batch_size = self.config.batch_size;
        let progress_every = self.config.progress_every;
        let produced =
            tokio::task::spawn_blocking(move || produce(reader, tx, batch_size, progress_every))
                .await;

        // The sender is gone now; workers drain what is left and exit.
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "Load worker did not finish cleanly");
            }
        }

        let produced = produced??;
        let report = LoadReport {
            started_at,
            rows_read: produced.rows_read,
            batches: produced.batches,
            persisted: progress.persisted(),
            elapsed: progress.elapsed(),
        };

        info!(
            rows_read = report.rows_read,
            batches = report.batches,
            persisted = report.persisted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            rate = report.rate().round(),
            "Load finished"
        );
        Ok(report)
    }
}

/// Reader side of the pipeline. Blocks on `blocking_send` whenever the queue
/// is full, which keeps memory bounded when the workers fall behind. A failed
/// read of the input is fatal; bad rows are not.
fn produce<R: Read>(
    reader: ListingReader<R>,
    tx: mpsc::Sender<Batch>,
    batch_size: usize,
    progress_every: u64,
) -> Result<Produced> {
    let mut batcher = Batcher::new(batch_size);
    let mut produced = Produced::default();

    let dispatch = |batch: Batch, produced: &mut Produced| -> Result<()> {
        tx.blocking_send(batch).map_err(|_| Error::QueueClosed)?;
        produced.batches += 1;
        Ok(())
    };

    for row in reader {
        let row = match row {
            Err(Error::Csv(e)) if e.is_io_error() => {
                error!(rows_read = produced.rows_read, error = %e, "Input read failed, aborting load");
                return Err(Error::Csv(e));
            }
            other => other,
        };

        produced.rows_read += 1;
        if progress_every > 0 && produced.rows_read % progress_every == 0 {
            info!(rows_read = produced.rows_read, "Rows processed");
        }

        let listing = match row {
            Ok(listing) => listing,
            Err(e) => {
                warn!(row = produced.rows_read, error = %e, "Skipping unparsable row");
                continue;
            }
        };

        if !listing.is_persistable() {
            debug!(record_id = listing.id, "Filtered listing without coordinates or price");
            continue;
        }

        if let Some(batch) = batcher.push(listing) {
            dispatch(batch, &mut produced)?;
        }
    }

    if let Some(batch) = batcher.finish() {
        dispatch(batch, &mut produced)?;
    }

    Ok(produced)
}
