//! Debounced, conflict-aware notebook persistence
//!
//! [`AutoSaveController`] owns the optimistic-concurrency state of one open
//! notebook. Callers report every structural change with
//! [`AutoSaveController::notify_change`]; the controller decides whether the
//! change is real (content hash), debounces bursts, submits
//! `{version, canvas}` and reacts to the outcome.
//!
//! # State machine
//!
//! ```text
//! Idle ──edit──▶ Dirty ──delay expires──▶ Saving ──ok──▶ Idle
//!                  ▲  └──edit reverted──▶ Idle     ├──ok, newer edits──▶ Dirty
//!                  └──────────transport error──────┤
//!                                                  └──stale version──▶ Conflict ──reload──▶ Idle
//! ```
//!
//! No lock is held across a backend call. The debounce delay is a spawned
//! task that is aborted on re-arm and on shutdown; once it starts saving it
//! detaches from the controller so re-arming never cancels an in-flight save.

use crate::backend::InvestigationBackend;
use crate::context::RequestContext;
use crate::error::{CasebookError, Operation};
use casebook_model::{NotebookRecord, NotebookSave};
use casebook_notebook::{DocumentCodec, DocumentHash, NotebookDocument};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Persistence state of an open notebook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveState {
    /// Everything persisted
    Idle,
    /// Unsaved changes, waiting for the debounce delay
    Dirty,
    /// A save request is in flight
    Saving,
    /// Stored version moved on; nothing is saved until reload
    Conflict,
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Dirty => "dirty",
            Self::Saving => "saving",
            Self::Conflict => "conflict",
        };
        f.write_str(name)
    }
}

/// Illegal save-state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal save state transition: {from} -> {to}")]
pub struct TransitionError {
    /// State before the transition
    pub from: SaveState,
    /// State after the transition
    pub to: SaveState,
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: SaveState) -> &'static [SaveState] {
    use SaveState::{Conflict, Dirty, Idle, Saving};
    match from {
        Idle => &[Dirty],
        Dirty => &[Idle, Saving],
        Saving => &[Idle, Dirty, Conflict],
        Conflict => &[Idle],
    }
}

/// Check a single transition against the table
///
/// # Errors
/// `TransitionError` if `to` is not reachable from `from`.
pub fn validate_transition(from: SaveState, to: SaveState) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// Snapshot of the controller for display
#[derive(Debug, Clone, PartialEq)]
pub struct SaveStatus {
    /// Where the controller is in its save cycle
    pub state: SaveState,
    /// Version the next save will be based on
    pub version: u64,
    /// Failure of the most recent save attempt, cleared by a success
    pub last_error: Option<CasebookError>,
    /// Whether some edit is not yet confirmed persisted
    pub has_unsaved_changes: bool,
}

#[derive(Debug, Clone)]
struct Snapshot {
    canvas: Value,
    hash: DocumentHash,
}

struct Inner {
    state: SaveState,
    version: u64,
    last_saved: DocumentHash,
    /// Latest edit not yet submitted
    pending: Option<Snapshot>,
    /// Hash of the canvas currently being saved
    in_flight: Option<DocumentHash>,
    last_error: Option<CasebookError>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every re-arm; a delay task only fires if it is still current
    generation: u64,
    /// Bumped on reload; a save finishing under an older epoch is ignored
    epoch: u64,
    closed: bool,
}

impl Inner {
    fn transition(&mut self, to: SaveState) {
        if self.state == to {
            return;
        }
        match validate_transition(self.state, to) {
            Ok(()) => tracing::debug!(from = %self.state, %to, "autosave transition"),
            Err(err) => tracing::error!(%err, "autosave state machine violated"),
        }
        self.state = to;
    }

    fn cancel_timer(&mut self) {
        self.generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    backend: Arc<dyn InvestigationBackend>,
    context: RequestContext,
    investigation_id: String,
    debounce: Duration,
    codec: DocumentCodec,
    inner: Mutex<Inner>,
}

/// A save that left the lock and is about to hit the backend
struct SaveTicket {
    save: NotebookSave,
    hash: DocumentHash,
    epoch: u64,
}

/// Debounced optimistic-concurrency saver for one notebook
///
/// Must be used from within a Tokio runtime; the debounce delay runs as a
/// spawned task.
pub struct AutoSaveController {
    shared: Arc<Shared>,
}

impl AutoSaveController {
    /// Controller for a freshly loaded notebook
    ///
    /// `version` and `saved_hash` describe what the backend currently holds.
    #[must_use]
    pub fn new(
        backend: Arc<dyn InvestigationBackend>,
        context: RequestContext,
        investigation_id: impl Into<String>,
        debounce: Duration,
        version: u64,
        saved_hash: DocumentHash,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                context,
                investigation_id: investigation_id.into(),
                debounce,
                codec: DocumentCodec::new(),
                inner: Mutex::new(Inner {
                    state: SaveState::Idle,
                    version,
                    last_saved: saved_hash,
                    pending: None,
                    in_flight: None,
                    last_error: None,
                    timer: None,
                    generation: 0,
                    epoch: 0,
                    closed: false,
                }),
            }),
        }
    }

    /// Report that the document may have changed
    ///
    /// A document whose serialized form hashes to the last saved state is a
    /// no-op (and cancels a pending save when an edit was reverted).
    pub fn notify_change(&self, document: &NotebookDocument) {
        let canvas = self.shared.codec.serialize(document);
        let snapshot = Snapshot {
            hash: DocumentHash::of(&canvas),
            canvas,
        };

        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return;
        }
        match inner.state {
            SaveState::Conflict => {
                // Kept locally; nothing is sent until reload.
                inner.pending = (snapshot.hash != inner.last_saved).then_some(snapshot);
            }
            SaveState::Saving => {
                inner.pending = (Some(snapshot.hash) != inner.in_flight).then_some(snapshot);
            }
            SaveState::Idle | SaveState::Dirty => {
                if snapshot.hash == inner.last_saved {
                    inner.pending = None;
                    inner.cancel_timer();
                    inner.transition(SaveState::Idle);
                    return;
                }
                inner.pending = Some(snapshot);
                inner.transition(SaveState::Dirty);
                Shared::arm(&self.shared, &mut inner);
            }
        }
    }

    /// Save pending edits now instead of waiting for the delay
    ///
    /// Does nothing when there is nothing to save or a save is already in
    /// flight.
    ///
    /// # Errors
    /// `Conflict` while the controller is in conflict, otherwise whatever the
    /// save itself returned.
    pub async fn save_now(&self) -> Result<(), CasebookError> {
        let ticket = {
            let mut inner = self.shared.inner.lock();
            if inner.closed {
                return Ok(());
            }
            if inner.state == SaveState::Conflict {
                return Err(inner.last_error.clone().unwrap_or_else(|| CasebookError::Conflict {
                    message: "notebook is in conflict".to_string(),
                }));
            }
            inner.cancel_timer();
            self.shared.begin_save(&mut inner)
        };
        match ticket {
            Some(ticket) => Shared::run_save(&self.shared, ticket).await,
            None => Ok(()),
        }
    }

    /// Adopt a freshly loaded notebook, leaving any conflict
    ///
    /// Unsaved edits are discarded; a save still in flight will be ignored
    /// when it completes.
    pub fn reload(&self, record_version: u64, saved_hash: DocumentHash) {
        let mut inner = self.shared.inner.lock();
        inner.cancel_timer();
        inner.epoch += 1;
        inner.version = record_version;
        inner.last_saved = saved_hash;
        inner.pending = None;
        inner.in_flight = None;
        inner.last_error = None;
        inner.transition(SaveState::Idle);
        tracing::info!(version = record_version, "notebook reloaded");
    }

    /// Cancel the pending delay and refuse all later saves
    ///
    /// A save already in flight finishes but triggers nothing further.
    pub fn shutdown(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.cancel_timer();
        tracing::debug!(
            investigation_id = %self.shared.investigation_id,
            unsaved = inner.pending.is_some(),
            "autosave shut down"
        );
    }

    /// Snapshot of state, version and pending work
    #[must_use]
    pub fn status(&self) -> SaveStatus {
        let inner = self.shared.inner.lock();
        SaveStatus {
            state: inner.state,
            version: inner.version,
            last_error: inner.last_error.clone(),
            has_unsaved_changes: inner.pending.is_some() || inner.in_flight.is_some(),
        }
    }

    /// Current save state
    #[inline]
    #[must_use]
    pub fn state(&self) -> SaveState {
        self.shared.inner.lock().state
    }

    /// Version of the last successful save or load
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.inner.lock().version
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.inner.lock().closed
    }
}

impl Drop for AutoSaveController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for AutoSaveController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("AutoSaveController")
            .field("investigation_id", &self.shared.investigation_id)
            .field("state", &inner.state)
            .field("version", &inner.version)
            .field("pending", &inner.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl Shared {
    /// (Re)start the debounce delay
    fn arm(this: &Arc<Self>, inner: &mut Inner) {
        inner.cancel_timer();
        let generation = inner.generation;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime; autosave delay not armed");
            return;
        };
        let shared = Arc::clone(this);
        let delay = this.debounce;
        inner.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let ticket = {
                let mut inner = shared.inner.lock();
                if inner.closed || inner.generation != generation {
                    return;
                }
                // Detach: from here on a re-arm must not abort this save.
                inner.timer = None;
                shared.begin_save(&mut inner)
            };
            if let Some(ticket) = ticket {
                // Failures are recorded in the controller state.
                let _ = Self::run_save(&shared, ticket).await;
            }
        }));
    }

    /// Move `Dirty` to `Saving`, taking the pending snapshot
    fn begin_save(&self, inner: &mut Inner) -> Option<SaveTicket> {
        if inner.state != SaveState::Dirty {
            return None;
        }
        let Some(snapshot) = inner.pending.take() else {
            inner.transition(SaveState::Idle);
            return None;
        };
        inner.in_flight = Some(snapshot.hash);
        inner.transition(SaveState::Saving);
        Some(SaveTicket {
            save: NotebookSave {
                version: inner.version,
                canvas_doc: snapshot.canvas,
            },
            hash: snapshot.hash,
            epoch: inner.epoch,
        })
    }

    async fn run_save(this: &Arc<Self>, ticket: SaveTicket) -> Result<(), CasebookError> {
        tracing::debug!(version = ticket.save.version, hash = %ticket.hash.short(), "saving notebook");
        let result = this
            .backend
            .save_notebook(&this.context, &this.investigation_id, &ticket.save)
            .await;
        Self::finish_save(this, ticket, result)
    }

    fn finish_save(
        this: &Arc<Self>,
        ticket: SaveTicket,
        result: Result<NotebookRecord, crate::error::BackendError>,
    ) -> Result<(), CasebookError> {
        let mut inner = this.inner.lock();
        if inner.epoch != ticket.epoch {
            tracing::debug!("save finished after reload; ignoring outcome");
            return result
                .map(|_| ())
                .map_err(|err| CasebookError::from_backend(Operation::SaveNotebook, err));
        }
        inner.in_flight = None;

        match result {
            Ok(record) => {
                if record.version != ticket.save.version + 1 {
                    tracing::warn!(
                        submitted = ticket.save.version,
                        returned = record.version,
                        "backend returned unexpected notebook version"
                    );
                }
                inner.version = record.version;
                inner.last_saved = ticket.hash;
                inner.last_error = None;
                tracing::info!(version = record.version, "notebook saved");

                let newer = inner
                    .pending
                    .as_ref()
                    .is_some_and(|pending| pending.hash != inner.last_saved);
                if newer && !inner.closed {
                    inner.transition(SaveState::Dirty);
                    Self::arm(this, &mut inner);
                } else {
                    inner.pending = None;
                    inner.transition(SaveState::Idle);
                }
                Ok(())
            }
            Err(err) => {
                let err = CasebookError::from_backend(Operation::SaveNotebook, err);
                if inner.pending.is_none() {
                    inner.pending = Some(Snapshot {
                        canvas: ticket.save.canvas_doc,
                        hash: ticket.hash,
                    });
                }
                if err.is_conflict() {
                    tracing::warn!(version = ticket.save.version, %err, "notebook save conflict");
                    inner.cancel_timer();
                    inner.transition(SaveState::Conflict);
                } else {
                    tracing::error!(%err, "notebook save failed");
                    inner.transition(SaveState::Dirty);
                }
                inner.last_error = Some(err.clone());
                Err(err)
            }
        }
    }
}
