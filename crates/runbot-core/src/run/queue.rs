use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{generate_run_id, RunInfo, RunRequest};
use crate::config::QueueConfig;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Run queue is full ({capacity} runs tracked)")]
    Full { capacity: usize },
}

/// Admission-controlled registry of active runs.
///
/// `capacity` bounds how many runs are tracked at once (queued or running);
/// `max_parallel` bounds how many of them execute at once. Admission never
/// waits: a request is either tracked immediately or refused.
pub struct RunQueue {
    runs: DashMap<String, Arc<RunInfo>>,
    active: AtomicUsize,
    capacity: usize,
    workers: Arc<Semaphore>,
}

impl RunQueue {
    pub fn new(capacity: usize, max_parallel: usize) -> Self {
        Self {
            runs: DashMap::new(),
            active: AtomicUsize::new(0),
            capacity,
            workers: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.max_queue_size, config.max_parallel)
    }

    /// Track `request` with status Queued, or refuse it.
    ///
    /// A run id that is already tracked is replaced with a fresh one.
    pub fn admit(&self, mut request: RunRequest) -> Result<Arc<RunInfo>, QueueError> {
        self.active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .map_err(|_| QueueError::Full {
                capacity: self.capacity,
            })?;

        loop {
            match self.runs.entry(request.run_id.clone()) {
                Entry::Occupied(_) => {
                    let fresh = generate_run_id();
                    debug!(run_id = %request.run_id, fresh = %fresh, "run id collision, reassigning");
                    request.run_id = fresh;
                }
                Entry::Vacant(slot) => {
                    let info = Arc::new(RunInfo::new(request));
                    slot.insert(info.clone());
                    info!(
                        run_id = %info.run_id(),
                        label = %info.request.label,
                        active = self.active_count(),
                        "run admitted"
                    );
                    return Ok(info);
                }
            }
        }
    }

    /// Run `callback` on a worker once an execution slot is free.
    ///
    /// The callback receives the tracked `RunInfo` itself, not a copy.
    pub fn dispatch<F, Fut>(&self, info: Arc<RunInfo>, callback: F)
    where
        F: FnOnce(Arc<RunInfo>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let workers = self.workers.clone();
        tokio::spawn(async move {
            // The semaphore is never closed, so a permit always arrives.
            let _permit = workers.acquire_owned().await.ok();
            debug!(run_id = %info.run_id(), "worker picked up run");
            callback(info).await;
        });
    }

    /// Admit and dispatch in one step.
    pub fn submit<F, Fut>(&self, request: RunRequest, callback: F) -> Result<Arc<RunInfo>, QueueError>
    where
        F: FnOnce(Arc<RunInfo>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let info = self.admit(request)?;
        self.dispatch(info.clone(), callback);
        Ok(info)
    }

    /// Stop tracking a run and free its slot.
    pub fn remove_run(&self, run_id: &str) -> Option<Arc<RunInfo>> {
        match self.runs.remove(run_id) {
            Some((_, info)) => {
                self.active.fetch_sub(1, Ordering::SeqCst);
                debug!(run_id = %run_id, status = info.status().label(), "run removed");
                Some(info)
            }
            None => {
                warn!(run_id = %run_id, "removing unknown run");
                None
            }
        }
    }

    pub fn get(&self, run_id: &str) -> Option<Arc<RunInfo>> {
        self.runs.get(run_id).map(|entry| entry.value().clone())
    }

    /// Runs currently tracked for a chat, oldest first.
    pub fn runs_for_chat(&self, chat_id: i64) -> Vec<Arc<RunInfo>> {
        let mut runs: Vec<_> = self
            .runs
            .iter()
            .filter(|entry| entry.value().request.chat_id == chat_id)
            .map(|entry| entry.value().clone())
            .collect();
        runs.sort_by_key(|info| info.request.submitted_at);
        runs
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.active_count() >= self.capacity
    }
}
