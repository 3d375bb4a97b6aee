//! Queue registry: binds queue names to dispatch policy and handlers.

use crate::application::worker::{run_worker_loop, JobHandler};
use crate::domain::jobs::{Job, JobOptions, QueueStats};
use crate::ports::queue::{JobQueuePort, QueueError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Per-queue dispatch policy, fixed at registration.
#[derive(Debug, Clone, Copy)]
pub struct QueuePolicy {
    /// Concurrent worker tasks leasing from this queue.
    pub concurrency: usize,
    /// Options stamped onto every job enqueued to this queue.
    pub opts: JobOptions,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            concurrency: 1,
            opts: JobOptions::default(),
        }
    }
}

/// Registry of named queues sharing one broker.
///
/// Enqueueing to an undefined queue is rejected rather than silently
/// creating broker keys nothing will ever drain.
pub struct QueueRegistry<Q> {
    broker: Arc<Q>,
    queues: HashMap<String, QueuePolicy>,
}

impl<Q: JobQueuePort + 'static> QueueRegistry<Q> {
    pub fn new(broker: Arc<Q>) -> Self {
        Self {
            broker,
            queues: HashMap::new(),
        }
    }

    pub fn define(&mut self, name: &str, policy: QueuePolicy) -> &mut Self {
        self.queues.insert(name.to_string(), policy);
        self
    }

    /// Serialize a payload and hand it to the broker, stamping the queue's
    /// dispatch options onto the job.
    pub async fn enqueue<P: Serialize>(&self, queue: &str, payload: &P) -> Result<Job, QueueError> {
        let policy = self
            .queues
            .get(queue)
            .ok_or_else(|| QueueError::UnknownQueue(queue.to_string()))?;
        let job = Job::new(queue, serde_json::to_value(payload)?, policy.opts);
        self.broker.enqueue(&job).await?;
        info!(job = %job.id, queue, "job enqueued");
        Ok(job)
    }

    /// Spawn this queue's worker tasks, each running the dispatch loop.
    pub fn register_worker(
        &self,
        queue: &str,
        handler: Arc<dyn JobHandler>,
    ) -> Result<Vec<JoinHandle<()>>, QueueError> {
        let policy = self
            .queues
            .get(queue)
            .ok_or_else(|| QueueError::UnknownQueue(queue.to_string()))?;
        let handles = (0..policy.concurrency.max(1))
            .map(|worker_id| {
                tokio::spawn(run_worker_loop(
                    worker_id,
                    queue.to_string(),
                    Arc::clone(&self.broker),
                    Arc::clone(&handler),
                ))
            })
            .collect();
        Ok(handles)
    }

    /// Return jobs abandoned on active lists by a previous process to
    /// waiting. Run once at startup, before workers begin leasing.
    pub async fn recover_orphans(&self) -> Result<u64, QueueError> {
        let mut total = 0;
        for name in self.queues.keys() {
            let recovered = self.broker.requeue_orphans(name).await?;
            if recovered > 0 {
                info!(queue = %name, recovered, "requeued orphaned jobs");
            }
            total += recovered;
        }
        Ok(total)
    }

    pub async fn pause_all(&self) -> Result<(), QueueError> {
        for name in self.queues.keys() {
            self.broker.pause(name).await?;
        }
        Ok(())
    }

    pub async fn resume_all(&self) -> Result<(), QueueError> {
        for name in self.queues.keys() {
            self.broker.resume(name).await?;
        }
        Ok(())
    }

    pub async fn stats(&self, queue: &str) -> Result<QueueStats, QueueError> {
        if !self.queues.contains_key(queue) {
            return Err(QueueError::UnknownQueue(queue.to_string()));
        }
        self.broker.stats(queue).await
    }

    pub async fn drain(&self, queue: &str) -> Result<(), QueueError> {
        if !self.queues.contains_key(queue) {
            return Err(QueueError::UnknownQueue(queue.to_string()));
        }
        self.broker.drain(queue).await
    }
}
