//! The slideshow coordinator: a cached, cyclically addressable view of the
//! remote asset list.
//!
//! [`Coordinator`] is a cheap handle; clones share one [`SlideshowState`].
//! Refresh is the only operation that performs I/O. Concurrent refreshes
//! join the fetch already in flight instead of starting another one.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use immich_api::{ApiError, Asset, ErrorKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::RefreshTrigger;
use crate::history::History;
use crate::source::AssetSource;
use crate::tasks::refresher::{self, RefreshSchedule};

/// How the index is repaired when a refresh shrinks the list below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexPolicy {
    #[default]
    ClampToLast,
    ResetToStart,
}

impl IndexPolicy {
    pub fn resolve(self, index: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        if index < len {
            return index;
        }
        match self {
            Self::ClampToLast => len - 1,
            Self::ResetToStart => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlideshowOptions {
    pub index_policy: IndexPolicy,
    pub history_limit: usize,
}

impl Default for SlideshowOptions {
    fn default() -> Self {
        Self {
            index_policy: IndexPolicy::default(),
            history_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connection,
    Auth,
    Server,
    Cancelled,
}

impl From<ErrorKind> for FailureKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Connection => Self::Connection,
            ErrorKind::Auth => Self::Auth,
            ErrorKind::Server => Self::Server,
        }
    }
}

/// Refresh failure shared by every caller that joined the same fetch.
#[derive(Debug, Clone, Error)]
#[error("refresh failed ({kind:?}): {message}")]
pub struct RefreshError {
    pub kind: FailureKind,
    pub message: String,
}

impl RefreshError {
    fn from_api(err: &ApiError) -> Self {
        Self {
            kind: err.kind().into(),
            message: err.to_string(),
        }
    }

    fn cancelled() -> Self {
        Self {
            kind: FailureKind::Cancelled,
            message: "slideshow stopped while refreshing".to_string(),
        }
    }

    fn from_join(err: &JoinError) -> Self {
        Self {
            kind: FailureKind::Cancelled,
            message: format!("refresh task ended early: {err}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum RefreshHealth {
    /// No refresh has completed yet.
    Pending,
    Healthy,
    Failed(FailureKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub count: usize,
    pub previous_count: usize,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct SlideshowState {
    assets: Vec<Asset>,
    index: usize,
    last_refreshed: Option<DateTime<Utc>>,
    health: RefreshHealth,
    history: History,
}

impl SlideshowState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            assets: Vec::new(),
            index: 0,
            last_refreshed: None,
            health: RefreshHealth::Pending,
            history: History::new(history_limit),
        }
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.assets.len()
    }

    pub fn health(&self) -> RefreshHealth {
        self.health
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The asset on screen: the history entry under the cursor while browsing
    /// back, otherwise `assets[index]`.
    pub fn current(&self) -> Option<&Asset> {
        if self.assets.is_empty() {
            return None;
        }
        self.history
            .selected()
            .or_else(|| self.assets.get(self.index))
    }

    /// Returns whether anything changed.
    pub fn advance(&mut self) -> bool {
        if self.assets.is_empty() {
            return false;
        }
        if !self.history.is_live() {
            self.history.step_forward();
            return true;
        }
        let outgoing = self.assets[self.index].clone();
        self.history.record(outgoing);
        self.index = (self.index + 1) % self.assets.len();
        true
    }

    pub fn advance_if_live(&mut self) -> bool {
        self.history.is_live() && self.advance()
    }

    pub fn previous(&mut self) -> bool {
        if self.assets.is_empty() {
            return false;
        }
        self.history.step_back()
    }

    pub fn replace_assets(
        &mut self,
        assets: Vec<Asset>,
        policy: IndexPolicy,
        now: DateTime<Utc>,
    ) -> RefreshReport {
        let previous_count = self.assets.len();
        self.index = policy.resolve(self.index, assets.len());
        self.assets = assets;
        if self.assets.is_empty() {
            self.history.return_to_live();
        }
        self.last_refreshed = Some(now);
        self.health = RefreshHealth::Healthy;
        RefreshReport {
            count: self.assets.len(),
            previous_count,
            index: self.index,
        }
    }

    pub fn mark_failed(&mut self, kind: FailureKind) {
        self.health = RefreshHealth::Failed(kind);
    }

    pub fn snapshot(&self) -> SlideshowSnapshot {
        SlideshowSnapshot {
            current: self.current().cloned(),
            index: self.index,
            count: self.assets.len(),
            in_live_mode: self.history.is_live(),
            history_index: self.history.cursor(),
            history_length: self.history.len(),
            navigation_mode: self.history.navigation_label(),
            health: self.health,
            last_refreshed: self.last_refreshed,
        }
    }
}

/// Read model handed to entity adapters.
#[derive(Debug, Clone, Serialize)]
pub struct SlideshowSnapshot {
    pub current: Option<Asset>,
    pub index: usize,
    pub count: usize,
    pub in_live_mode: bool,
    pub history_index: Option<usize>,
    pub history_length: usize,
    pub navigation_mode: String,
    pub health: RefreshHealth,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl SlideshowSnapshot {
    pub fn last_refresh_succeeded(&self) -> bool {
        self.health == RefreshHealth::Healthy
    }

    /// Something can be shown and the data behind it is fresh.
    pub fn is_available(&self) -> bool {
        self.last_refresh_succeeded() && self.current.is_some()
    }
}

type SharedRefresh = Shared<BoxFuture<'static, Result<RefreshReport, RefreshError>>>;

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn AssetSource>,
    options: SlideshowOptions,
    state: Mutex<SlideshowState>,
    in_flight: Mutex<Option<(u64, SharedRefresh)>>,
    next_refresh_id: AtomicU64,
    revision: watch::Sender<u64>,
    shutdown: CancellationToken,
}

impl Coordinator {
    pub fn new(source: Arc<dyn AssetSource>, options: SlideshowOptions) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SlideshowState::new(options.history_limit)),
                source,
                options,
                in_flight: Mutex::new(None),
                next_refresh_id: AtomicU64::new(1),
                revision,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn source(&self) -> &Arc<dyn AssetSource> {
        &self.inner.source
    }

    /// Re-fetch the asset list. If a refresh is already running this joins it
    /// and returns its result rather than issuing a second fetch.
    ///
    /// The fetch runs on its own task, so it completes and is applied even if
    /// every caller stops waiting. Only [`Coordinator::stop`] abandons it.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Result<RefreshReport, RefreshError> {
        let pending = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some((id, shared)) => {
                    debug!(refresh_id = id, ?trigger, "refresh already in flight; joining");
                    shared.clone()
                }
                None => {
                    let id = self.inner.next_refresh_id.fetch_add(1, Ordering::Relaxed);
                    let task = tokio::spawn(Arc::clone(&self.inner).run_refresh(id, trigger));
                    let shared = async move {
                        task.await
                            .unwrap_or_else(|err| Err(RefreshError::from_join(&err)))
                    }
                    .boxed()
                    .shared();
                    *slot = Some((id, shared.clone()));
                    shared
                }
            }
        };
        pending.await
    }

    pub fn current(&self) -> Option<Asset> {
        self.inner.state.lock().current().cloned()
    }

    pub fn advance(&self) {
        let changed = self.inner.state.lock().advance();
        if changed {
            self.inner.bump();
        }
    }

    /// Advance unless the viewer is browsing history. Used by the timer.
    pub fn advance_if_live(&self) -> bool {
        let changed = self.inner.state.lock().advance_if_live();
        if changed {
            self.inner.bump();
        }
        changed
    }

    pub fn previous(&self) {
        let changed = self.inner.state.lock().previous();
        if changed {
            self.inner.bump();
        }
    }

    pub fn count(&self) -> usize {
        self.inner.state.lock().count()
    }

    pub fn index(&self) -> usize {
        self.inner.state.lock().index()
    }

    pub fn is_available(&self) -> bool {
        self.snapshot().is_available()
    }

    pub fn snapshot(&self) -> SlideshowSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Revision counter bumped on every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Spawn the periodic refresh task. It ends when [`Coordinator::stop`] is called.
    pub fn start(&self, schedule: RefreshSchedule) -> JoinHandle<anyhow::Result<()>> {
        tokio::spawn(refresher::run(
            self.clone(),
            schedule,
            self.inner.shutdown.child_token(),
        ))
    }

    /// Stop the refresh task and abandon any in-flight fetch without applying it.
    pub fn stop(&self) {
        self.inner.shutdown.cancel();
        self.inner.in_flight.lock().take();
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Coordinator")
            .field("count", &state.count())
            .field("index", &state.index())
            .field("health", &state.health())
            .finish_non_exhaustive()
    }
}

impl Inner {
    async fn run_refresh(
        self: Arc<Self>,
        id: u64,
        trigger: RefreshTrigger,
    ) -> Result<RefreshReport, RefreshError> {
        debug!(refresh_id = id, ?trigger, "refresh started");
        let fetched = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            res = self.source.fetch_assets() => Some(res),
        };
        let outcome = match fetched {
            None => {
                debug!(refresh_id = id, "refresh abandoned");
                Err(RefreshError::cancelled())
            }
            Some(Ok(assets)) => Ok(self.apply(assets, trigger)),
            Some(Err(err)) => Err(self.fail(&err, trigger)),
        };

        let mut slot = self.in_flight.lock();
        if slot.as_ref().is_some_and(|(current, _)| *current == id) {
            *slot = None;
        }
        outcome
    }

    fn apply(&self, assets: Vec<Asset>, trigger: RefreshTrigger) -> RefreshReport {
        let report =
            self.state
                .lock()
                .replace_assets(assets, self.options.index_policy, Utc::now());
        if report.count == 0 {
            warn!(?trigger, "immich returned no assets; slideshow is empty");
        } else if report.count != report.previous_count {
            info!(
                ?trigger,
                count = report.count,
                previous = report.previous_count,
                index = report.index,
                "asset list refreshed"
            );
        } else {
            debug!(?trigger, count = report.count, index = report.index, "asset list refreshed");
        }
        self.bump();
        report
    }

    fn fail(&self, err: &ApiError, trigger: RefreshTrigger) -> RefreshError {
        let error = RefreshError::from_api(err);
        self.state.lock().mark_failed(error.kind);
        warn!(
            ?trigger,
            kind = ?error.kind,
            error = %err,
            "refresh failed; keeping previous assets"
        );
        self.bump();
        error
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
