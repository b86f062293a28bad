use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use txadvisor_core_types::WatchRegistration;
use txadvisor_rpc::StarknetRpcClient;
use txadvisor_storage::is_retryable_sqlite_anyhow_error;

mod sink;
mod tick;

pub use sink::{SnapshotSink, SqliteSnapshotSink};

use tick::{poll_once, SnapshotClock};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_WATCH_AGE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_TICK_CALL_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    pub poll_interval: Duration,
    pub max_watch_age: Duration,
    pub tick_call_timeout: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_watch_age: DEFAULT_MAX_WATCH_AGE,
            tick_call_timeout: DEFAULT_TICK_CALL_TIMEOUT,
        }
    }
}

struct WatchEntry {
    generation: u64,
    started_at_ms: i64,
    cancel: CancellationToken,
}

struct WatcherInner {
    rpc: Arc<StarknetRpcClient>,
    sink: Arc<dyn SnapshotSink>,
    settings: WatcherSettings,
    registry: Mutex<HashMap<String, WatchEntry>>,
    next_generation: AtomicU64,
}

impl WatcherInner {
    fn registry(&self) -> MutexGuard<'_, HashMap<String, WatchEntry>> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn deregister(&self, tx_hash: &str, generation: u64) {
        let mut registry = self.registry();
        if registry
            .get(tx_hash)
            .is_some_and(|entry| entry.generation == generation)
        {
            registry.remove(tx_hash);
        }
    }
}

#[derive(Clone)]
pub struct WatcherService {
    inner: Arc<WatcherInner>,
}

impl WatcherService {
    pub fn new(
        rpc: Arc<StarknetRpcClient>,
        sink: Arc<dyn SnapshotSink>,
        settings: WatcherSettings,
    ) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                rpc,
                sink,
                settings,
                registry: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn start(&self, tx_hash: &str) -> bool {
        let (generation, cancel) = {
            let mut registry = self.inner.registry();
            if registry.contains_key(tx_hash) {
                return false;
            }
            let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
            let cancel = CancellationToken::new();
            registry.insert(
                tx_hash.to_string(),
                WatchEntry {
                    generation,
                    started_at_ms: chrono::Utc::now().timestamp_millis(),
                    cancel: cancel.clone(),
                },
            );
            (generation, cancel)
        };

        info!(tx_hash = %tx_hash, generation, "watch started");
        let inner = Arc::clone(&self.inner);
        let tx_hash = tx_hash.to_string();
        tokio::spawn(async move {
            run_watch(Arc::clone(&inner), &tx_hash, cancel).await;
            inner.deregister(&tx_hash, generation);
        });
        true
    }

    pub fn stop(&self, tx_hash: &str) -> bool {
        let removed = self.inner.registry().remove(tx_hash);
        match removed {
            Some(entry) => {
                entry.cancel.cancel();
                info!(tx_hash = %tx_hash, generation = entry.generation, "watch stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) -> usize {
        let drained: Vec<(String, WatchEntry)> = self.inner.registry().drain().collect();
        for (_, entry) in &drained {
            entry.cancel.cancel();
        }
        drained.len()
    }

    pub fn is_watching(&self, tx_hash: &str) -> bool {
        self.inner.registry().contains_key(tx_hash)
    }

    pub fn registrations(&self) -> Vec<WatchRegistration> {
        let mut registrations: Vec<WatchRegistration> = self
            .inner
            .registry()
            .iter()
            .map(|(tx_hash, entry)| WatchRegistration {
                tx_hash: tx_hash.clone(),
                started_at: entry.started_at_ms,
                active: !entry.cancel.is_cancelled(),
            })
            .collect();
        registrations.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.tx_hash.cmp(&b.tx_hash))
        });
        registrations
    }
}

async fn run_blocking<T, F>(sink: &Arc<dyn SnapshotSink>, operation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn SnapshotSink) -> Result<T> + Send + 'static,
{
    let sink = Arc::clone(sink);
    tokio::task::spawn_blocking(move || operation(sink.as_ref()))
        .await
        .context("snapshot sink task panicked")?
}

async fn run_watch(inner: Arc<WatcherInner>, tx_hash: &str, cancel: CancellationToken) {
    let started = Instant::now();
    let settings = inner.settings;

    let request_hash = tx_hash.to_string();
    let now_ms = chrono::Utc::now().timestamp_millis();
    if let Err(error) = run_blocking(&inner.sink, move |sink| {
        sink.record_request(&request_hash, now_ms)
    })
    .await
    {
        warn!(tx_hash = %tx_hash, error = %error, "failed to record watch request");
    }

    let lookup_hash = tx_hash.to_string();
    let last_ts = run_blocking(&inner.sink, move |sink| sink.latest_timestamp(&lookup_hash))
        .await
        .unwrap_or_else(|error| {
            warn!(tx_hash = %tx_hash, error = %error, "failed to read latest snapshot timestamp");
            None
        });
    let mut clock = SnapshotClock::starting_after(last_ts);
    let call_timeout = settings
        .tick_call_timeout
        .max(inner.rpc.worst_case_call_duration());

    loop {
        if cancel.is_cancelled() {
            debug!(tx_hash = %tx_hash, "watch cancelled");
            return;
        }
        if started.elapsed() >= settings.max_watch_age {
            info!(
                tx_hash = %tx_hash,
                max_watch_age_secs = settings.max_watch_age.as_secs(),
                "max watch age reached, stopping watch"
            );
            return;
        }

        let report = poll_once(&inner.rpc, tx_hash, call_timeout, &mut clock).await;
        let written = report.snapshots.len();
        let snapshots = report.snapshots;
        let touch_hash = tx_hash.to_string();
        let touched_at = chrono::Utc::now().timestamp_millis();
        let persisted = match run_blocking(&inner.sink, move |sink| {
            sink.append(&snapshots)?;
            sink.touch_request(&touch_hash, touched_at)
        })
        .await
        {
            Ok(()) => {
                debug!(tx_hash = %tx_hash, written, "watch tick persisted");
                true
            }
            Err(error) => {
                warn!(
                    tx_hash = %tx_hash,
                    contended = is_retryable_sqlite_anyhow_error(&error),
                    error = %format!("{error:#}"),
                    "failed to persist watch tick"
                );
                false
            }
        };

        if let Some(status) = report.terminal {
            if persisted {
                info!(tx_hash = %tx_hash, status = %status, "terminal status observed, stopping watch");
                return;
            }
            warn!(
                tx_hash = %tx_hash,
                status = %status,
                "terminal status not persisted, polling again"
            );
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(tx_hash = %tx_hash, "watch cancelled during sleep");
                return;
            }
            _ = tokio::time::sleep(settings.poll_interval) => {}
        }
    }
}
