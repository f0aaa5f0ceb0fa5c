//! Debounced, bounded-concurrency submission pipeline for security ratings.
//!
//! The collector buffers identifier submissions, flushes them in bounded
//! batches to the ratings API, and maps returned ratings back to the server
//! names each identifier came from. Locally allowlisted servers are resolved
//! immediately and never leave the machine.
//!
//! Concurrency shape: all mutable state sits behind one mutex and no I/O
//! happens under it; flushes move batches into a bounded channel consumed by
//! long-lived workers, and each 202-Accepted response spawns a deadline-bound
//! poller task. Must be used from within a Tokio runtime.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use runmcp_api::{
    ApiError, BatchOutcome, BatchRatingRequest, BatchRatingResponse, IdentifierKind, RatingsClient,
    SecurityRating, TargetIdentifier,
};
use runmcp_store::Storage;

use crate::identifiers::extract_identifiers;
use crate::summary::ScanSummary;

/// Local policy attached to a server during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalPolicy {
    Allowed,
    Denied,
    Pending,
    Unknown,
}

impl fmt::Display for LocalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        })
    }
}

/// Tunables for batching, retry, and polling.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Immediate flush once the pending batch reaches this size.
    pub batch_size: usize,

    /// Idle window after the last submit before a flush fires.
    pub debounce: Duration,

    /// Parallel in-flight batch submissions.
    pub worker_count: usize,

    /// Bounded queue between producer and workers; overflow drops the batch.
    pub channel_size: usize,

    /// Initial retry delay for 5xx responses, doubled each retry.
    pub backoff_base: Duration,

    /// Attempts per batch before dropping it.
    pub max_attempts: u32,

    /// Absolute deadline on asynchronous scan polling.
    pub scan_poll_timeout: Duration,

    /// Poll cadence for scan status.
    pub scan_poll_interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            debounce: Duration::from_millis(200),
            worker_count: 2,
            channel_size: 8,
            backoff_base: Duration::from_millis(250),
            max_attempts: 3,
            scan_poll_timeout: Duration::from_secs(120),
            scan_poll_interval: Duration::from_millis(500),
        }
    }
}

/// Best-effort observer of a server's submission stages.
pub type StageNotifier = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Default)]
struct StageNotifiers {
    submitted: Option<StageNotifier>,
    processing: Option<StageNotifier>,
    received: Option<StageNotifier>,
}

#[derive(Default)]
struct CollectorState {
    // Globally-seen identifiers; an identifier is submitted at most once.
    seen: HashSet<(IdentifierKind, String)>,
    pending: Vec<TargetIdentifier>,
    debounce: Option<JoinHandle<()>>,
    // Taken exactly once by flush_and_stop; a deferred flush finding None is
    // a no-op instead of a send on a closed channel.
    tx: Option<mpsc::Sender<Vec<TargetIdentifier>>>,
    id_to_servers: HashMap<String, Vec<String>>,
    server_policy: HashMap<String, LocalPolicy>,
    server_links: HashMap<String, String>,
    server_rating: HashMap<String, SecurityRating>,
    workers: Vec<JoinHandle<()>>,
    pollers: Vec<JoinHandle<()>>,
}

struct CollectorInner {
    config: CollectorConfig,
    storage: Option<Arc<Storage>>,
    client: RwLock<Option<Arc<dyn RatingsClient>>>,
    notifiers: RwLock<StageNotifiers>,
    state: Mutex<CollectorState>,
}

/// Batches identifier submissions to the ratings API and fans results back
/// out to server names.
pub struct RatingsCollector {
    inner: Arc<CollectorInner>,
}

fn make_key(id: &TargetIdentifier) -> String {
    format!("{}|{}", id.kind.as_str(), id.value)
}

impl RatingsCollector {
    /// Create a collector. Pass `None` for the client to operate offline; a
    /// client can be attached later with [`set_client`](Self::set_client).
    pub fn new(client: Option<Arc<dyn RatingsClient>>, storage: Option<Arc<Storage>>) -> Self {
        Self::with_config(client, storage, CollectorConfig::default())
    }

    /// Create a collector with explicit tunables.
    pub fn with_config(
        client: Option<Arc<dyn RatingsClient>>,
        storage: Option<Arc<Storage>>,
        config: CollectorConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_size);
        let worker_count = config.worker_count;

        let inner = Arc::new(CollectorInner {
            config,
            storage,
            client: RwLock::new(client),
            notifiers: RwLock::new(StageNotifiers::default()),
            state: Mutex::new(CollectorState {
                tx: Some(tx),
                ..CollectorState::default()
            }),
        });

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let inner = Arc::clone(&inner);
            let rx = Arc::clone(&rx);
            workers.push(tokio::spawn(async move {
                loop {
                    let batch = { rx.lock().await.recv().await };
                    match batch {
                        Some(batch) => deliver_batch(&inner, batch).await,
                        None => break,
                    }
                }
            }));
        }
        lock_state(&inner).workers = workers;

        Self { inner }
    }

    /// Set stage notifiers for UI progress.
    pub fn with_stage_notifiers(
        self,
        submitted: StageNotifier,
        processing: StageNotifier,
        received: StageNotifier,
    ) -> Self {
        {
            let mut notifiers = self
                .inner
                .notifiers
                .write()
                .expect("collector notifier lock poisoned");
            notifiers.submitted = Some(submitted);
            notifiers.processing = Some(processing);
            notifiers.received = Some(received);
        }
        self
    }

    /// Whether the collector is operating without a remote client.
    pub fn is_offline(&self) -> bool {
        self.inner
            .client
            .read()
            .expect("collector client lock poisoned")
            .is_none()
    }

    /// Attach a remote client, flushing anything buffered while offline.
    /// Safe to race with [`flush_and_stop`](Self::flush_and_stop): once the
    /// channel sender has been taken, the deferred flush is a no-op.
    pub fn set_client(&self, client: Arc<dyn RatingsClient>) {
        *self
            .inner
            .client
            .write()
            .expect("collector client lock poisoned") = Some(client);
        let mut state = lock_state(&self.inner);
        flush_locked(&mut state);
    }

    /// Record identifiers for a server and schedule a batched flush.
    pub fn submit(&self, server_name: &str, server_config: &Value) {
        let inner = &self.inner;

        // Local allowlist decision wins immediately, no identifiers emitted.
        if inner
            .storage
            .as_ref()
            .is_some_and(|s| s.is_allowlisted("server", server_name))
        {
            lock_state(inner)
                .server_policy
                .insert(server_name.to_string(), LocalPolicy::Allowed);
            return;
        }

        // Offline: surface unknown and return.
        if inner
            .client
            .read()
            .expect("collector client lock poisoned")
            .is_none()
        {
            lock_state(inner)
                .server_policy
                .entry(server_name.to_string())
                .or_insert(LocalPolicy::Unknown);
            return;
        }

        let ids = extract_identifiers(server_name, server_config);
        if ids.is_empty() {
            lock_state(inner)
                .server_policy
                .entry(server_name.to_string())
                .or_insert(LocalPolicy::Unknown);
            return;
        }

        {
            let mut state = lock_state(inner);
            for id in ids {
                let key = make_key(&id);
                let newly_seen = state.seen.insert((id.kind, id.value.clone()));
                // Even already-recorded identifiers map to this server for
                // rating fan-out.
                state
                    .id_to_servers
                    .entry(key)
                    .or_default()
                    .push(server_name.to_string());
                if newly_seen {
                    state.pending.push(id);
                }
            }

            // Re-arm the debounce window; at most one timer is armed.
            if let Some(timer) = state.debounce.take() {
                timer.abort();
            }
            let debounce_inner = Arc::clone(inner);
            let window = inner.config.debounce;
            state.debounce = Some(tokio::spawn(async move {
                tokio::time::sleep(window).await;
                flush_locked(&mut lock_state(&debounce_inner));
            }));

            // Full batches flush immediately; any remainder stays pending
            // under the freshly-armed debounce window.
            while state.pending.len() >= inner.config.batch_size {
                let batch: Vec<TargetIdentifier> =
                    state.pending.drain(..inner.config.batch_size).collect();
                send_batch(&mut state, batch);
            }
        }

        notify_one(inner, Stage::Submitted, server_name);
    }

    /// Copy current per-server policies and ratings into the summary.
    pub fn apply_to_summary(&self, summary: &mut ScanSummary) {
        let state = lock_state(&self.inner);
        for server in &mut summary.servers {
            if let Some(policy) = state.server_policy.get(&server.name) {
                server.local_policy = Some(*policy);
            }
            if let Some(rating) = state.server_rating.get(&server.name) {
                server.rating = Some(rating.clone());
            }
        }
    }

    /// Rating links collected from immediate batch responses, by server name.
    pub fn server_links(&self) -> HashMap<String, String> {
        lock_state(&self.inner).server_links.clone()
    }

    /// Drain pending identifiers, close the queue exactly once, and wait for
    /// workers and pollers to finish.
    pub async fn flush_and_stop(&self) {
        let (tx, workers) = {
            let mut state = lock_state(&self.inner);
            if let Some(timer) = state.debounce.take() {
                timer.abort();
            }
            flush_locked(&mut state);
            (state.tx.take(), std::mem::take(&mut state.workers))
        };
        drop(tx);
        for worker in workers {
            let _ = worker.await;
        }
        // Workers are done, so no new pollers can appear after this take.
        let pollers = std::mem::take(&mut lock_state(&self.inner).pollers);
        for poller in pollers {
            let _ = poller.await;
        }
    }
}

fn lock_state(inner: &CollectorInner) -> std::sync::MutexGuard<'_, CollectorState> {
    inner.state.lock().expect("collector state lock poisoned")
}

/// Move the pending batch into the send queue. Caller holds the state lock.
fn flush_locked(state: &mut CollectorState) {
    let batch = std::mem::take(&mut state.pending);
    send_batch(state, batch);
}

/// Hand one batch to the workers. Never blocks: overflow drops the batch with
/// a debug note, and a stopped collector (sender already taken) is a no-op.
fn send_batch(state: &mut CollectorState, batch: Vec<TargetIdentifier>) {
    if batch.is_empty() {
        return;
    }
    match &state.tx {
        Some(tx) => {
            if tx.try_send(batch).is_err() {
                debug!("ratings collector backpressure: dropping batch");
            }
        }
        None => debug!("ratings collector stopped: dropping batch"),
    }
}

#[derive(Clone, Copy)]
enum Stage {
    Submitted,
    Processing,
    Received,
}

fn stage_notifier(inner: &CollectorInner, stage: Stage) -> Option<StageNotifier> {
    let notifiers = inner
        .notifiers
        .read()
        .expect("collector notifier lock poisoned");
    match stage {
        Stage::Submitted => notifiers.submitted.clone(),
        Stage::Processing => notifiers.processing.clone(),
        Stage::Received => notifiers.received.clone(),
    }
}

fn notify_one(inner: &CollectorInner, stage: Stage, server_name: &str) {
    if let Some(notify) = stage_notifier(inner, stage) {
        notify(server_name);
    }
}

/// Notify every server tied to any identifier in the batch, once each.
fn notify_batch(inner: &CollectorInner, stage: Stage, batch: &[TargetIdentifier]) {
    let Some(notify) = stage_notifier(inner, stage) else {
        return;
    };
    let mut servers: Vec<String> = {
        let state = lock_state(inner);
        batch
            .iter()
            .filter_map(|id| state.id_to_servers.get(&make_key(id)))
            .flatten()
            .cloned()
            .collect()
    };
    servers.sort();
    servers.dedup();
    for server in servers {
        notify(&server);
    }
}

/// Send one batch with retries honoring `Retry-After` and 5xx backoff.
async fn deliver_batch(inner: &Arc<CollectorInner>, batch: Vec<TargetIdentifier>) {
    let client = inner
        .client
        .read()
        .expect("collector client lock poisoned")
        .clone();
    let Some(client) = client else { return };
    if batch.is_empty() {
        return;
    }

    let mut backoff = inner.config.backoff_base;
    for _ in 0..inner.config.max_attempts {
        let request = BatchRatingRequest {
            identifiers: batch.clone(),
        };
        match client.submit_batch_ratings(&request).await {
            Ok(BatchOutcome::Ratings(response)) => {
                apply_rating_links(inner, &response);
                notify_batch(inner, Stage::Received, &batch);
                return;
            }
            Ok(BatchOutcome::Accepted(status)) => {
                on_accepted(inner, &batch, status.scan_id.to_string());
                return;
            }
            Err(ApiError::RateLimited { retry_after }) => {
                tokio::time::sleep(retry_after.unwrap_or(backoff)).await;
            }
            Err(ApiError::Remote { status, .. }) if status >= 500 => {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(err) => {
                debug!(error = %err, "batch submit failed, dropping");
                return;
            }
        }
    }
    debug!("batch submit: max attempts reached, dropping");
}

/// 202 Accepted: notify processing, mark servers pending, spawn the poller.
fn on_accepted(inner: &Arc<CollectorInner>, batch: &[TargetIdentifier], scan_ref: String) {
    notify_batch(inner, Stage::Processing, batch);
    {
        let mut state = lock_state(inner);
        let pending: Vec<String> = batch
            .iter()
            .filter_map(|id| state.id_to_servers.get(&make_key(id)))
            .flatten()
            .cloned()
            .collect();
        for server in pending {
            state.server_policy.insert(server, LocalPolicy::Pending);
        }
    }

    let poll_inner = Arc::clone(inner);
    let poller = tokio::spawn(async move {
        poll_and_apply(&poll_inner, scan_ref).await;
    });
    lock_state(inner).pollers.push(poller);
}

/// Poll the scan to completion (bounded by the poll deadline) and fan ratings
/// out to every server mapped to each rated identifier.
async fn poll_and_apply(inner: &Arc<CollectorInner>, scan_ref: String) {
    let client = inner
        .client
        .read()
        .expect("collector client lock poisoned")
        .clone();
    let Some(client) = client else { return };

    let outcome = tokio::time::timeout(
        inner.config.scan_poll_timeout,
        client.wait_for_scan_completion(&scan_ref, inner.config.scan_poll_interval),
    )
    .await;

    let rated = match outcome {
        Err(_) => {
            debug!(scan = %scan_ref, "scan polling deadline exceeded; dropping");
            return;
        }
        Ok(Err(err)) => {
            debug!(scan = %scan_ref, error = %err, "polling scan failed");
            return;
        }
        Ok(Ok(rated)) => rated,
    };

    let mut to_notify: Vec<String> = Vec::new();
    {
        let mut state = lock_state(inner);
        for (identifier, rating) in rated {
            let key = make_key(&identifier);
            let Some(servers) = state.id_to_servers.get(&key).cloned() else {
                continue;
            };
            for server in servers {
                state.server_rating.insert(server.clone(), rating.clone());
                // A concrete rating supersedes the pending marker.
                state.server_policy.remove(&server);
                to_notify.push(server);
            }
        }
    }
    to_notify.sort();
    to_notify.dedup();
    if let Some(notify) = stage_notifier(inner, Stage::Received) {
        for server in to_notify {
            notify(&server);
        }
    }
}

/// Record rating links from an immediate batch response.
fn apply_rating_links(inner: &CollectorInner, response: &BatchRatingResponse) {
    if response.ratings.is_empty() {
        return;
    }
    let mut state = lock_state(inner);
    for item in &response.ratings {
        let key = make_key(&item.identifier);
        let Some(servers) = state.id_to_servers.get(&key).cloned() else {
            continue;
        };
        for server in servers {
            state.server_links.insert(server, item.rating_url.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn offline_submissions_mark_servers_unknown() {
        let collector = RatingsCollector::new(None, None);
        collector.submit("github", &json!({"url": "https://api.githubcopilot.com/mcp/"}));
        assert!(collector.is_offline());

        let mut summary = ScanSummary::default();
        summary.servers.push(crate::models::ServerReport {
            name: "github".into(),
            path: "f.json".into(),
            ..Default::default()
        });
        collector.apply_to_summary(&mut summary);
        assert_eq!(summary.servers[0].local_policy, Some(LocalPolicy::Unknown));
        collector.flush_and_stop().await;
    }

    #[tokio::test]
    async fn flush_and_stop_is_idempotent_and_safe_after_set_client() {
        let collector = RatingsCollector::new(None, None);
        collector.flush_and_stop().await;
        // A late deferred flush must not panic once the channel is gone.
        {
            let mut state = lock_state(&collector.inner);
            state.pending.push(TargetIdentifier {
                kind: IdentifierKind::Url,
                value: "https://example.com".into(),
            });
        }
        flush_locked(&mut lock_state(&collector.inner));
        collector.flush_and_stop().await;
    }

    #[tokio::test]
    async fn policy_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&LocalPolicy::Allowed).unwrap(),
            "\"allowed\""
        );
        assert_eq!(LocalPolicy::Pending.to_string(), "pending");
    }
}
