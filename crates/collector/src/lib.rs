//! In-process call-count collector.
//!
//! A `Collector` is an explicit context owned by the host application's
//! composition root; nothing here is a global. Tracking a call is a
//! lock-free counter increment. Delivery is periodic, coalesced, and
//! at-most-once: counters are drained before the upload, and a failed
//! upload does not restore them. Losing one interval of telemetry is the
//! accepted price for never double-counting.

use dashmap::DashMap;
use identity::FunctionIdentity;
use identity::wire::{FunctionUsage, UsagePayload};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

const DEFAULT_UPLOAD_INTERVAL_MS: u64 = 10_000;
const DEFAULT_PROJECT_ID: &str = "default";
/// Upper bound on the final flush during teardown; shutdown never hangs on
/// a slow endpoint.
const TEARDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Full ingestion URL. Empty disables delivery (tracking continues).
    pub platform_url: String,
    pub project_id: String,
    pub upload_interval: Duration,
    /// When false, `track_call` is a guaranteed no-op.
    pub enabled: bool,
    pub debug: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            platform_url: String::new(),
            project_id: DEFAULT_PROJECT_ID.to_string(),
            upload_interval: Duration::from_millis(DEFAULT_UPLOAD_INTERVAL_MS),
            enabled: true,
            debug: false,
        }
    }
}

impl CollectorConfig {
    /// Configuration from `DEAD_CODE_*` environment variables, with
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let interval_ms = std::env::var("DEAD_CODE_UPLOAD_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_UPLOAD_INTERVAL_MS);

        Self {
            platform_url: std::env::var("DEAD_CODE_PLATFORM_URL").unwrap_or_default(),
            project_id: std::env::var("DEAD_CODE_PROJECT_ID")
                .unwrap_or_else(|_| DEFAULT_PROJECT_ID.to_string()),
            upload_interval: Duration::from_millis(interval_ms),
            enabled: std::env::var("DEAD_CODE_ENABLED").as_deref() != Ok("false"),
            debug: std::env::var("DEAD_CODE_DEBUG").as_deref() == Ok("true"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollectorStats {
    pub tracked_functions: usize,
    pub total_calls: i64,
}

pub struct Collector {
    config: CollectorConfig,
    counters: DashMap<FunctionIdentity, i64>,
    flushing: AtomicBool,
    client: reqwest::Client,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            counters: DashMap::new(),
            flushing: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(CollectorConfig::from_env())
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Record one call. O(1), never blocks, never panics; a no-op when the
    /// collector is disabled.
    pub fn track_call(&self, file: &str, name: &str, line: u32) {
        if !self.config.enabled {
            return;
        }
        *self
            .counters
            .entry(FunctionIdentity::new(file, name, line))
            .or_insert(0) += 1;
    }

    /// Snapshot for debugging and tests.
    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            tracked_functions: self.counters.len(),
            total_calls: self.counters.iter().map(|entry| *entry.value()).sum(),
        }
    }

    /// Deliver the current counters, clearing them first. Serialized by a
    /// compare-exchange: a flush racing an outstanding one is coalesced,
    /// never queued.
    pub async fn flush(&self) {
        if self.config.platform_url.is_empty() {
            self.debug_log("No platform URL configured, skipping upload");
            return;
        }
        if self.counters.is_empty() {
            return;
        }
        if self
            .flushing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.debug_log("Flush already in progress, coalescing");
            return;
        }
        // Must clear on every exit path, including when the teardown
        // timeout drops this future mid-delivery.
        let _guard = FlushGuard(&self.flushing);

        let functions = self.drain();
        if !functions.is_empty() {
            self.deliver(functions).await;
        }
    }

    /// Remove and return every counter. Removal is per key, so an increment
    /// racing the drain lands either in the removed value or in a fresh
    /// entry for the next interval; it is never lost.
    fn drain(&self) -> Vec<FunctionUsage> {
        let keys: Vec<FunctionIdentity> = self
            .counters
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let mut functions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some((identity, call_count)) = self.counters.remove(&key) {
                functions.push(FunctionUsage {
                    file: identity.file,
                    name: identity.name,
                    line: identity.line,
                    call_count,
                });
            }
        }
        functions
    }

    async fn deliver(&self, functions: Vec<FunctionUsage>) {
        let count = functions.len();
        let payload = UsagePayload {
            project_id: self.config.project_id.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            functions,
        };
        self.debug_log(&format!("Uploading {count} function usage records"));

        let response = self
            .client
            .post(&self.config.platform_url)
            .json(&payload)
            .send()
            .await;

        // At-most-once: the drained counts are gone either way.
        match response {
            Ok(response) if response.status().is_success() => {
                self.debug_log("Successfully uploaded usage data");
            }
            Ok(response) => {
                log::error!(
                    "Failed to upload usage data: status {} from {} ({} functions, project {})",
                    response.status(),
                    self.config.platform_url,
                    count,
                    self.config.project_id
                );
            }
            Err(e) => {
                log::error!(
                    "Error uploading usage data to {} ({} functions, project {}): {e}",
                    self.config.platform_url,
                    count,
                    self.config.project_id
                );
            }
        }
    }

    /// Spawn the periodic flush task. The returned handle stops the task
    /// and performs one bounded final flush.
    pub fn start(self: &Arc<Self>) -> CollectorTask {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let collector = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(collector.config.upload_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so the first real
            // flush happens one interval in.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => collector.flush().await,
                    _ = &mut shutdown_rx => {
                        let _ = tokio::time::timeout(TEARDOWN_FLUSH_TIMEOUT, collector.flush()).await;
                        break;
                    }
                }
            }
        });

        CollectorTask {
            shutdown_tx,
            handle,
        }
    }

    fn debug_log(&self, message: &str) {
        if self.config.debug {
            log::debug!("{message}");
        }
    }
}

/// Clears the flush-in-progress flag when the flush future completes or is
/// dropped.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to the running periodic flush task.
pub struct CollectorTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl CollectorTask {
    /// Stop the periodic task after one final best-effort delivery.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}
