use crate::processor::ThumbnailProcessor;
use snapwall_core::NEW_MEDIA_TOPIC;
use snapwall_infra::{BusResult, EventBus, Subscription};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct WorkerPoolConfig {
    /// Number of worker tasks, each with its own subscription.
    pub workers: usize,
    pub queue_group: String,
    /// Base URL the generator uses to fetch originals.
    pub internal_server_url: String,
    pub dedupe_by_source: bool,
    /// Pause after a failed receive before asking the bus again.
    pub receive_backoff: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_group: "thumbnailer".to_string(),
            internal_server_url: "http://localhost:8080".to_string(),
            dedupe_by_source: true,
            receive_backoff: Duration::from_secs(1),
        }
    }
}

/// Messages settled by the pool since it started.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub acked: u64,
    pub nakked: u64,
}

#[derive(Default)]
struct Counters {
    acked: AtomicU64,
    nakked: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            acked: self.acked.load(Ordering::Relaxed),
            nakked: self.nakked.load(Ordering::Relaxed),
        }
    }
}

pub struct ThumbnailWorkerPool {
    token: CancellationToken,
    tasks: JoinSet<()>,
    counters: Arc<Counters>,
}

impl ThumbnailWorkerPool {
    /// Subscribe `config.workers` times to the "new media" topic and start one
    /// worker task per subscription.
    pub async fn start(
        processor: Arc<ThumbnailProcessor>,
        bus: Arc<dyn EventBus>,
        config: &WorkerPoolConfig,
    ) -> BusResult<Self> {
        let token = CancellationToken::new();
        let counters = Arc::new(Counters::default());
        let mut tasks = JoinSet::new();
        let workers = config.workers.max(1);

        for worker_id in 0..workers {
            let subscription = match bus.subscribe(NEW_MEDIA_TOPIC, &config.queue_group).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "Failed to subscribe worker");
                    token.cancel();
                    while tasks.join_next().await.is_some() {}
                    return Err(e);
                }
            };

            tasks.spawn(run_worker(
                worker_id,
                subscription,
                processor.clone(),
                token.clone(),
                counters.clone(),
                config.receive_backoff,
            ));
        }

        tracing::info!(
            workers,
            queue_group = %config.queue_group,
            dedupe_by_source = config.dedupe_by_source,
            "Thumbnail worker pool started"
        );

        Ok(Self {
            token,
            tasks,
            counters,
        })
    }

    pub fn stats(&self) -> WorkerStats {
        self.counters.snapshot()
    }

    /// Token that stops message acquisition when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop taking new messages, wait for in-flight ones and join every worker.
    pub async fn shutdown(mut self) -> WorkerStats {
        tracing::info!("Thumbnail worker pool shutting down");
        self.token.cancel();

        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task did not finish cleanly");
            }
        }

        let stats = self.counters.snapshot();
        tracing::info!(
            acked = stats.acked,
            nakked = stats.nakked,
            "Thumbnail worker pool stopped"
        );
        stats
    }
}

async fn run_worker(
    worker_id: usize,
    mut subscription: Subscription,
    processor: Arc<ThumbnailProcessor>,
    token: CancellationToken,
    counters: Arc<Counters>,
    receive_backoff: Duration,
) {
    tracing::debug!(worker_id, "Worker started");

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = subscription.next() => next,
        };

        let delivery = match next {
            Some(Ok(delivery)) => delivery,
            Some(Err(e)) => {
                tracing::warn!(worker_id, error = %e, "Failed to receive message, backing off");
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(receive_backoff) => continue,
                }
            }
            None => {
                tracing::warn!(worker_id, "Subscription ended");
                break;
            }
        };

        if delivery.is_redelivery() {
            tracing::debug!(worker_id, message_id = %delivery.id(), attempt = delivery.attempt(), "Redelivered message");
        }

        match processor.process(delivery.payload()).await {
            Ok(_) => match delivery.ack().await {
                Ok(()) => {
                    counters.acked.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => tracing::warn!(worker_id, error = %e, "Failed to ack message"),
            },
            Err(_) => match delivery.nak().await {
                Ok(()) => {
                    counters.nakked.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => tracing::warn!(worker_id, error = %e, "Failed to nak message"),
            },
        }
    }

    subscription.close().await;
    tracing::debug!(worker_id, "Worker stopped");
}
