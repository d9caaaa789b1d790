//! The single mutation point for session state.
//!
//! [`TerminalStore`] keeps the aggregate [`TerminalState`] in a
//! [`tokio::sync::watch`] channel and fans discrete [`TerminalEvent`]s out on
//! a bounded [`tokio::sync::broadcast`] channel. Every mutation runs under
//! the watch channel's write lock, so an observer never sees a
//! half-applied update.

use tokio::sync::{broadcast, watch};
use tracing::{debug, trace};

use ptyshell_core::{Error, Result, SessionId};

use crate::events::TerminalEvent;
use crate::session::{TerminalSession, TerminalState};

/// Outcome of removing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Selected session after the removal
    pub current_session_id: Option<SessionId>,
    /// Session inserted because the list became empty
    pub replacement: Option<SessionId>,
}

/// Shared, observable terminal state.
#[derive(Debug)]
pub struct TerminalStore {
    state: watch::Sender<TerminalState>,
    events: broadcast::Sender<TerminalEvent>,
}

impl TerminalStore {
    /// Create an empty store whose event channel holds `event_capacity`
    /// events per subscriber.
    pub fn new(event_capacity: usize) -> Self {
        let (state, _) = watch::channel(TerminalState::default());
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { state, events }
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> TerminalState {
        self.state.borrow().clone()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<TerminalState> {
        self.state.subscribe()
    }

    /// Observe discrete events. A receiver that falls behind loses the
    /// oldest events.
    pub fn events(&self) -> broadcast::Receiver<TerminalEvent> {
        self.events.subscribe()
    }

    /// Publish events. Never blocks; events with no subscriber are dropped.
    pub fn publish(&self, events: Vec<TerminalEvent>) {
        for event in events {
            trace!("Publishing {:?}", event);
            let _ = self.events.send(event);
        }
    }

    /// Clone one session.
    pub fn get_session(&self, id: &SessionId) -> Option<TerminalSession> {
        self.state.borrow().session(id).cloned()
    }

    /// Clone the selected session.
    pub fn current_session(&self) -> Option<TerminalSession> {
        self.state.borrow().current_session().cloned()
    }

    /// Identifier of the selected session.
    pub fn current_session_id(&self) -> Option<SessionId> {
        self.state.borrow().current_session_id
    }

    /// Number of sessions.
    pub fn session_count(&self) -> usize {
        self.state.borrow().sessions.len()
    }

    /// Whether a session exists.
    pub fn contains(&self, id: &SessionId) -> bool {
        self.state.borrow().session(id).is_some()
    }

    /// Apply `transform` to the aggregate state.
    pub fn update<R>(&self, transform: impl FnOnce(&mut TerminalState) -> R) -> R {
        let mut result = None;
        self.state.send_modify(|state| result = Some(transform(state)));
        match result {
            Some(result) => result,
            None => unreachable!("send_modify always runs its closure"),
        }
    }

    /// Apply `transform` to one session and publish the events it collects.
    ///
    /// Returns `None` without notifying observers when the session does not
    /// exist.
    pub fn update_session<R>(
        &self,
        id: &SessionId,
        transform: impl FnOnce(&mut TerminalSession, &mut Vec<TerminalEvent>) -> R,
    ) -> Option<R> {
        let mut events = Vec::new();
        let mut result = None;
        self.state.send_if_modified(|state| match state.session_mut(id) {
            Some(session) => {
                result = Some(transform(session, &mut events));
                true
            }
            None => false,
        });
        if result.is_none() {
            debug!("Update skipped, session '{}' not found", id);
        }
        self.publish(events);
        result
    }

    /// Add a session, optionally selecting it.
    pub fn add_session(&self, session: TerminalSession, make_current: bool) {
        self.update(|state| {
            if make_current || state.current_session_id.is_none() {
                state.current_session_id = Some(session.id);
            }
            state.sessions.push(session);
        });
    }

    /// Add and select the session built by `make`, unless `limit` sessions
    /// already exist. Check and insert happen in one update.
    pub fn add_session_within(
        &self,
        limit: usize,
        make: impl FnOnce() -> TerminalSession,
    ) -> Result<(SessionId, String)> {
        self.update(|state| {
            if state.sessions.len() >= limit {
                return Err(Error::SessionLimitReached(limit));
            }
            let session = make();
            let added = (session.id, session.title.clone());
            state.current_session_id = Some(session.id);
            state.sessions.push(session);
            Ok(added)
        })
    }

    /// Select a session.
    pub fn set_current(&self, id: &SessionId) -> Result<()> {
        self.update(|state| {
            if state.session(id).is_none() {
                return Err(Error::SessionNotFound(*id));
            }
            state.current_session_id = Some(*id);
            Ok(())
        })
    }

    /// Set the manager-level loading flag.
    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.is_loading != loading;
            state.is_loading = loading;
            changed
        });
    }

    /// Record a manager-level error.
    pub fn set_error(&self, error: Option<String>) {
        self.update(|state| state.error = error);
    }

    /// Remove a session.
    ///
    /// If it was selected, the first remaining session becomes selected; if
    /// none remain, `replacement` is inserted and selected in the same update.
    pub fn remove_session(
        &self,
        id: &SessionId,
        replacement: impl FnOnce() -> TerminalSession,
    ) -> Result<Removal> {
        self.update(|state| {
            let idx = state.position(id).ok_or(Error::SessionNotFound(*id))?;
            state.sessions.remove(idx);

            let mut inserted = None;
            if state.sessions.is_empty() {
                let session = replacement();
                inserted = Some(session.id);
                state.sessions.push(session);
            }
            if state.current_session_id == Some(*id) || inserted.is_some() {
                state.current_session_id = state.sessions.first().map(|s| s.id);
            }
            Ok(Removal {
                current_session_id: state.current_session_id,
                replacement: inserted,
            })
        })
    }
}
