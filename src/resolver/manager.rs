//! Batch orchestration. Fans the catalog's triples out over a bounded worker
//! pool, funnels finished records into the collection, and supports prompt
//! operator abort without dropping in-flight work.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, Semaphore, mpsc};

use crate::catalog::Catalog;
use crate::collection::EndpointCollection;
use crate::endpoint::{EndpointRecord, RecordSource};
use crate::resolver::ResolveContext;

/// Resolution progress for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionStatus {
    pub running: bool,
    pub total_count: u32,
    pub resolved_count: u32,
    pub progress_percent: u8,
    pub last_run_time: Option<i64>,
}

/// Batch tuning knobs.
#[derive(Debug, Clone)]
pub struct ResolutionConfig {
    pub max_concurrent: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self { max_concurrent: 64 }
    }
}

/// Runs one resolution pass over a catalog.
pub struct ResolutionManager {
    status: Arc<RwLock<ResolutionStatus>>,
    config: ResolutionConfig,
    stop_signal: Arc<RwLock<bool>>,
}

impl ResolutionManager {
    pub fn new(config: ResolutionConfig) -> Self {
        Self {
            status: Arc::new(RwLock::new(ResolutionStatus {
                running: false,
                total_count: 0,
                resolved_count: 0,
                progress_percent: 0,
                last_run_time: None,
            })),
            config,
            stop_signal: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn status(&self) -> ResolutionStatus {
        self.status.read().await.clone()
    }

    /// Handle for wiring an external abort source (e.g. SIGINT) to the batch.
    pub fn stop_handle(&self) -> Arc<RwLock<bool>> {
        self.stop_signal.clone()
    }

    pub async fn request_stop(&self) {
        *self.stop_signal.write().await = true;
    }

    /// Resolve every triple in the catalog. Returns once all issued work has
    /// finished. A raised stop signal stops issuing new resolutions promptly;
    /// resolutions already holding a worker slot complete or time out on
    /// their own.
    pub async fn run(&self, catalog: &Catalog, context: ResolveContext) -> EndpointCollection {
        let triples = catalog.triples();
        let total = triples.len();

        {
            let mut status = self.status.write().await;
            status.running = true;
            status.total_count = total.min(u32::MAX as usize) as u32;
            status.resolved_count = 0;
            status.progress_percent = 0;
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let (record_tx, mut record_rx) = mpsc::channel::<EndpointRecord>(total.max(1));

        for triple in triples {
            if *self.stop_signal.read().await {
                tracing::info!("stop requested, no further triples will be issued");
                break;
            }

            let semaphore = semaphore.clone();
            let record_tx = record_tx.clone();
            let context = context.clone();
            let stop_signal = self.stop_signal.clone();

            tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                // skip work that was queued but not yet issued when the
                // operator asked to stop
                if *stop_signal.read().await {
                    return;
                }

                let record = EndpointRecord::build(RecordSource::Fresh {
                    service: &triple.service,
                    partition: &triple.partition,
                    region: &triple.region,
                    context: &context,
                })
                .await
                .expect("fresh record construction does not fail");

                let _ = record_tx.send(record).await;
            });
        }
        drop(record_tx);

        let mut collection = EndpointCollection::new();
        while let Some(record) = record_rx.recv().await {
            collection.insert(record);

            let mut status = self.status.write().await;
            let resolved = collection.len();
            status.resolved_count = resolved.min(u32::MAX as usize) as u32;
            let percent = resolved
                .saturating_mul(100)
                .checked_div(total.max(1))
                .unwrap_or(0)
                .min(100);
            status.progress_percent = percent as u8;
        }

        {
            let mut status = self.status.write().await;
            status.running = false;
            status.progress_percent = 100;
            status.last_run_time = Some(chrono::Utc::now().timestamp());
        }

        collection
    }
}
