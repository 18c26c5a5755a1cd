//! The watcher engine: match, rate-limit, dispatch, retry.
//!
//! `on_created` is invoked after every successful attestation create. It
//! matches the new attestation against the current snapshot of enabled
//! watchers, consults each watcher's token bucket, and spawns one task per
//! (watcher, attestation) pair with a deep copy of the attestation.
//! Rate-limited triggers are dropped, not queued.
//!
//! Failed executions enter a retry queue drained by a 1-second ticker with
//! exponential backoff (1 s doubling to 60 s); after the fifth retry the
//! execution is dropped with a warning. A watcher disabled or deleted by
//! the time a retry fires is a silent no-op.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ats_core::attestation::Attestation;
use ats_core::storage::matches_filter;
use ats_core::watcher::{ActionType, Watcher};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::action::{python_payload, webhook_payload, ActionTransport, WatchError};

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Endpoint of the external python executor
    pub python_executor_url: String,
    /// First retry delay
    pub initial_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
    /// Retries per failed execution before it is dropped
    pub max_attempts: u32,
    /// Granularity of the retry ticker
    pub retry_tick: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            python_executor_url: "http://127.0.0.1:8700/execute".to_string(),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            max_attempts: 5,
            retry_tick: Duration::from_secs(1),
        }
    }
}

struct WatcherRuntime {
    watcher: Watcher,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl WatcherRuntime {
    fn new(watcher: Watcher) -> Self {
        let limiter = build_limiter(watcher.max_fires_per_minute);
        Self { watcher, limiter }
    }

    /// Non-blocking admission check. A zero rate admits nothing.
    fn admits(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => false,
        }
    }
}

/// Token bucket at `max/60` per second with burst 1; zero rate has no
/// bucket at all.
fn build_limiter(max_fires_per_minute: u32) -> Option<DefaultDirectRateLimiter> {
    if max_fires_per_minute == 0 {
        return None;
    }
    let period = Duration::from_secs_f64(60.0 / max_fires_per_minute as f64);
    Quota::with_period(period)
        .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)))
}

struct PendingExecution {
    watcher_id: String,
    attestation: Attestation,
    attempt: u32,
    next_retry_at: Instant,
}

struct Inner {
    config: EngineConfig,
    transport: Arc<dyn ActionTransport>,
    watchers: RwLock<HashMap<String, WatcherRuntime>>,
    retry_queue: Mutex<Vec<PendingExecution>>,
    running: AtomicU64,
    idle: Notify,
    shutdown_tx: watch::Sender<bool>,
    stopped: AtomicBool,
}

/// Handle owning the watcher set, the retry ticker, and all in-flight
/// action tasks. Cloneable handles share one engine.
#[derive(Clone)]
pub struct WatchEngine {
    inner: Arc<Inner>,
    ticker: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl WatchEngine {
    /// Start the engine with the enabled watcher set. Must be called from
    /// within a tokio runtime; spawns the retry ticker immediately.
    pub fn start(
        config: EngineConfig,
        transport: Arc<dyn ActionTransport>,
        watchers: Vec<Watcher>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(Inner {
            config,
            transport,
            watchers: RwLock::new(build_runtime_map(watchers)),
            retry_queue: Mutex::new(Vec::new()),
            running: AtomicU64::new(0),
            idle: Notify::new(),
            shutdown_tx,
            stopped: AtomicBool::new(false),
        });

        let ticker = tokio::spawn(retry_ticker(inner.clone(), shutdown_rx));
        info!(
            watchers = inner.watchers.read().len(),
            "watch engine started"
        );

        Self {
            inner,
            ticker: Arc::new(Mutex::new(Some(ticker))),
        }
    }

    /// Replace the in-memory watcher set after CRUD changes.
    pub fn reload(&self, watchers: Vec<Watcher>) {
        let mut map = self.inner.watchers.write();
        *map = build_runtime_map(watchers);
        info!(watchers = map.len(), "watcher set reloaded");
    }

    /// Current watcher states including in-memory counters, sorted by id.
    pub fn snapshot(&self) -> Vec<Watcher> {
        let map = self.inner.watchers.read();
        let mut watchers: Vec<Watcher> = map.values().map(|r| r.watcher.clone()).collect();
        watchers.sort_by(|a, b| a.id.cmp(&b.id));
        watchers
    }

    /// Evaluate all enabled watchers against a newly created attestation.
    ///
    /// Returns immediately; matching actions run on background tasks, each
    /// receiving its own deep copy of the attestation.
    pub fn on_created(&self, attestation: &Attestation) {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return;
        }

        let mut dispatch: Vec<String> = Vec::new();
        {
            let watchers = self.inner.watchers.read();
            for runtime in watchers.values() {
                let watcher = &runtime.watcher;
                if !watcher.enabled {
                    continue;
                }
                if !matches_filter(attestation, &watcher.filter) {
                    continue;
                }
                if watcher.max_fires_per_minute == 0 {
                    debug!(watcher = %watcher.id, "zero fire rate, dropping trigger");
                    continue;
                }
                if runtime.admits() {
                    dispatch.push(watcher.id.clone());
                } else {
                    debug!(watcher = %watcher.id, "rate limited, dropping trigger");
                }
            }
        }

        for watcher_id in dispatch {
            spawn_execution(self.inner.clone(), watcher_id, attestation.clone(), 0);
        }
    }

    /// Wait for all in-flight action tasks to finish.
    pub async fn wait_idle(&self) {
        loop {
            if self.inner.running.load(Ordering::SeqCst) == 0 {
                return;
            }
            let notified = self.inner.idle.notified();
            if self.inner.running.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop the engine: cancel the ticker, drop pending retries, wait for
    /// in-flight tasks. Idempotent.
    pub async fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let _ = self.inner.shutdown_tx.send(true);

        let ticker = self.ticker.lock().take();
        if let Some(handle) = ticker {
            let _ = handle.await;
        }

        let dropped = {
            let mut queue = self.inner.retry_queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        if dropped > 0 {
            debug!(dropped, "pending retries discarded on shutdown");
        }

        self.wait_idle().await;
        info!("watch engine stopped");
    }
}

fn build_runtime_map(watchers: Vec<Watcher>) -> HashMap<String, WatcherRuntime> {
    watchers
        .into_iter()
        .filter(|w| {
            if !w.enabled {
                debug!(watcher = %w.id, "skipping disabled watcher");
            }
            w.enabled
        })
        .map(|w| (w.id.clone(), WatcherRuntime::new(w)))
        .collect()
}

fn spawn_execution(inner: Arc<Inner>, watcher_id: String, attestation: Attestation, attempt: u32) {
    inner.running.fetch_add(1, Ordering::SeqCst);
    let task_inner = inner.clone();
    tokio::spawn(async move {
        run_execution(&task_inner, watcher_id, attestation, attempt).await;
        if task_inner.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            task_inner.idle.notify_waiters();
        }
    });
}

async fn run_execution(
    inner: &Arc<Inner>,
    watcher_id: String,
    attestation: Attestation,
    attempt: u32,
) {
    // Re-read the watcher: one disabled or deleted since the trigger (or
    // between retries) is a silent no-op.
    let watcher = {
        let map = inner.watchers.read();
        map.get(&watcher_id)
            .filter(|r| r.watcher.enabled)
            .map(|r| r.watcher.clone())
    };
    let Some(watcher) = watcher else {
        debug!(watcher = %watcher_id, attempt, "watcher gone or disabled, dropping execution");
        return;
    };

    match execute_action(inner, &watcher, &attestation).await {
        Ok(()) => {
            let mut map = inner.watchers.write();
            if let Some(runtime) = map.get_mut(&watcher_id) {
                runtime.watcher.fire_count += 1;
                runtime.watcher.last_fired = Some(chrono::Utc::now().timestamp_millis());
            }
            debug!(watcher = %watcher_id, attempt, "action executed");
        }
        Err(error) => {
            warn!(watcher = %watcher_id, attempt, %error, "action failed");
            {
                let mut map = inner.watchers.write();
                if let Some(runtime) = map.get_mut(&watcher_id) {
                    runtime.watcher.error_count += 1;
                    runtime.watcher.last_error = error.to_string();
                }
            }

            let next_attempt = attempt + 1;
            if next_attempt > inner.config.max_attempts {
                warn!(watcher = %watcher_id, "retry budget exhausted, dropping execution");
                return;
            }
            if inner.stopped.load(Ordering::SeqCst) {
                return;
            }

            let delay = backoff_delay(&inner.config, next_attempt);
            inner.retry_queue.lock().push(PendingExecution {
                watcher_id,
                attestation,
                attempt: next_attempt,
                next_retry_at: Instant::now() + delay,
            });
        }
    }
}

/// 1 s doubling per attempt, capped at the configured ceiling.
fn backoff_delay(config: &EngineConfig, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    config
        .initial_backoff
        .saturating_mul(factor)
        .min(config.max_backoff)
}

async fn execute_action(
    inner: &Arc<Inner>,
    watcher: &Watcher,
    attestation: &Attestation,
) -> Result<(), WatchError> {
    match watcher.action_type {
        ActionType::Python => {
            let body = python_payload(attestation, &watcher.action_data)?;
            let response = inner
                .transport
                .post_json(&inner.config.python_executor_url, body)
                .await?;
            if response.status == 200 {
                Ok(())
            } else {
                Err(WatchError::ActionFailed {
                    status: response.status,
                    body: response.body,
                })
            }
        }
        ActionType::Webhook => {
            let body = webhook_payload(&watcher.id, attestation, chrono::Utc::now())?;
            let response = inner.transport.post_json(&watcher.action_data, body).await?;
            if response.is_2xx() {
                Ok(())
            } else {
                Err(WatchError::ActionFailed {
                    status: response.status,
                    body: response.body,
                })
            }
        }
    }
}

async fn retry_ticker(inner: Arc<Inner>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(inner.config.retry_tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                let now = Instant::now();
                let due: Vec<PendingExecution> = {
                    let mut queue = inner.retry_queue.lock();
                    let (ready, pending): (Vec<_>, Vec<_>) =
                        queue.drain(..).partition(|p| p.next_retry_at <= now);
                    *queue = pending;
                    ready
                };

                for pending in due {
                    debug!(watcher = %pending.watcher_id, attempt = pending.attempt, "dispatching retry");
                    spawn_execution(
                        inner.clone(),
                        pending.watcher_id,
                        pending.attestation,
                        pending.attempt,
                    );
                }
            }
        }
    }

    debug!("retry ticker stopped");
}
