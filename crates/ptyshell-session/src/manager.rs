//! Session manager coordinating multiple shell sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, warn};

use ptyshell_core::{
    AppConfig, CommandId, Dimensions, Error, Result, SessionId, SessionStatus,
};

use crate::events::TerminalEvent;
use crate::machine::{CommandDisposition, SessionStateMachine};
use crate::provision::{ConfiguredEnvironment, EnvironmentProvisioner};
use crate::runtime::{RuntimeOptions, SessionRuntime};
use crate::session::{TerminalSession, TerminalState};
use crate::store::TerminalStore;

const ENVIRONMENT_READY: &str = "Environment initialized. Starting session...";
const ENVIRONMENT_FAILED: &str = "FATAL: Environment initialization failed. Check logs.";

/// Owns every session, its runtime and the shared store.
pub struct SessionManager {
    store: Arc<TerminalStore>,
    runtimes: Mutex<HashMap<SessionId, SessionRuntime>>,
    machine: Arc<SessionStateMachine>,
    provisioner: Arc<dyn EnvironmentProvisioner>,
    config: AppConfig,
    titles: AtomicUsize,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.store.session_count())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager whose sessions start the configured shell.
    pub fn new(config: AppConfig) -> Result<Self> {
        let provisioner = Arc::new(ConfiguredEnvironment::new(
            config.shell.clone(),
            config.terminal.clone(),
        ));
        Self::with_provisioner(config, provisioner)
    }

    /// Create a manager with a custom environment provisioner.
    pub fn with_provisioner(
        config: AppConfig,
        provisioner: Arc<dyn EnvironmentProvisioner>,
    ) -> Result<Self> {
        config.validate()?;
        let machine = Arc::new(SessionStateMachine::from_config(&config)?);
        Ok(Self {
            store: Arc::new(TerminalStore::new(config.session.event_capacity)),
            runtimes: Mutex::new(HashMap::new()),
            machine,
            provisioner,
            config,
            titles: AtomicUsize::new(0),
        })
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<TerminalStore> {
        &self.store
    }

    /// Current aggregate state.
    pub fn snapshot(&self) -> TerminalState {
        self.store.snapshot()
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<TerminalState> {
        self.store.subscribe()
    }

    /// Observe discrete events.
    pub fn events(&self) -> broadcast::Receiver<TerminalEvent> {
        self.store.events()
    }

    /// Clone one session.
    pub fn get_session(&self, id: &SessionId) -> Result<TerminalSession> {
        self.store.get_session(id).ok_or(Error::SessionNotFound(*id))
    }

    /// Clone the selected session.
    pub fn current_session(&self) -> Option<TerminalSession> {
        self.store.current_session()
    }

    /// Number of sessions.
    pub fn session_count(&self) -> usize {
        self.store.session_count()
    }

    fn new_session(&self) -> TerminalSession {
        let n = self.titles.fetch_add(1, Ordering::Relaxed) + 1;
        TerminalSession::new(
            SessionId::new(),
            format!("Session {n}"),
            self.config.session.max_output_lines,
        )
    }

    fn max_items(&self) -> usize {
        self.config.session.max_history_items
    }

    fn current_id(&self) -> Result<SessionId> {
        self.store.current_session_id().ok_or(Error::NoActiveSession)
    }

    /// Create a session, select it and start its shell.
    ///
    /// Provisioning and spawn failures do not fail the call; they are
    /// recorded in the new session's history.
    pub async fn create_session(&self) -> Result<SessionId> {
        let max = self.config.session.max_sessions;
        let (id, title) = match self.store.add_session_within(max, || self.new_session()) {
            Ok(added) => added,
            Err(e) => {
                warn!("Cannot create session: {}", e);
                self.store.set_error(Some(e.to_string()));
                return Err(e);
            }
        };
        info!("Creating session '{}' ({})", id, title);
        self.store.set_error(None);
        self.store
            .publish(vec![TerminalEvent::SessionCreated { session_id: id, title }]);

        self.start_runtime(id).await;
        Ok(id)
    }

    async fn start_runtime(&self, id: SessionId) {
        self.store.set_loading(true);
        let max_items = self.max_items();

        let spec = match self.provisioner.prepare() {
            Ok(spec) => spec,
            Err(e) => {
                error!("Environment initialization failed for session '{}': {}", id, e);
                self.store.update_session(&id, |session, _| {
                    session.status = SessionStatus::Failed;
                    session.push_system_entry(ENVIRONMENT_FAILED, max_items);
                });
                self.store.set_loading(false);
                return;
            }
        };
        self.store.update_session(&id, |session, _| {
            session.push_system_entry(ENVIRONMENT_READY, max_items);
        });

        let options = RuntimeOptions {
            read_buffer_size: self.config.session.read_buffer_size,
            ready_marker: self.config.protocol.ready_marker.clone(),
            max_history_items: max_items,
        };
        match SessionRuntime::start(
            id,
            &spec,
            Arc::clone(&self.store),
            Arc::clone(&self.machine),
            &options,
        ) {
            Ok(runtime) => {
                let mut runtimes = self.runtimes.lock().await;
                if self.store.contains(&id) {
                    runtimes.insert(id, runtime);
                } else {
                    drop(runtimes);
                    info!("Session '{}' closed while starting", id);
                    runtime.shutdown().await;
                }
            }
            Err(e) => {
                error!("Error starting session '{}': {}", id, e);
                self.store
                    .set_error(Some(format!("Error starting terminal session: {e}")));
                self.store.update_session(&id, |session, _| {
                    session.status = SessionStatus::Failed;
                    session.push_system_entry(
                        format!("Error starting terminal session: {e}"),
                        max_items,
                    );
                });
            }
        }
        self.store.set_loading(false);
    }

    /// Select a session.
    pub async fn switch_to_session(&self, id: &SessionId) -> Result<()> {
        debug!("Switching to session '{}'", id);
        self.store.set_current(id)
    }

    /// Close a session.
    ///
    /// Its read loop is cancelled before the writer is closed and the process
    /// killed. Closing the last session creates a replacement, so there is
    /// always at least one.
    pub async fn close_session(&self, id: &SessionId) -> Result<()> {
        if !self.store.contains(id) {
            return Err(Error::SessionNotFound(*id));
        }
        info!("Closing session '{}'", id);

        // Held until the session leaves the store, so a concurrent start
        // cannot register a runtime for it afterwards.
        let removal = {
            let mut runtimes = self.runtimes.lock().await;
            if let Some(runtime) = runtimes.remove(id) {
                runtime.shutdown().await;
            }
            self.store.remove_session(id, || self.new_session())?
        };
        self.store
            .publish(vec![TerminalEvent::SessionClosed { session_id: *id }]);

        if let Some(replacement) = removal.replacement {
            let title = self
                .store
                .get_session(&replacement)
                .map(|s| s.title)
                .unwrap_or_default();
            info!("Created replacement session '{}'", replacement);
            self.store.publish(vec![TerminalEvent::SessionCreated {
                session_id: replacement,
                title,
            }]);
            self.start_runtime(replacement).await;
        }
        Ok(())
    }

    /// Close every session without creating a replacement.
    pub async fn close_all(&self) {
        let closed = {
            let mut runtimes = self.runtimes.lock().await;
            for (_, runtime) in runtimes.drain() {
                runtime.shutdown().await;
            }
            self.store.update(|state| {
                state.current_session_id = None;
                std::mem::take(&mut state.sessions)
            })
        };
        self.store.publish(
            closed
                .into_iter()
                .map(|s| TerminalEvent::SessionClosed { session_id: s.id })
                .collect(),
        );
    }

    /// Submit a command to the selected session.
    ///
    /// Returns the id of the created history entry, or `None` when the text
    /// answered an interactive prompt, was `clear`, or was blank.
    pub async fn send_command(&self, command: &str) -> Result<Option<CommandId>> {
        let id = self.current_id()?;
        self.send_command_to(&id, command).await
    }

    /// Submit a command to a session.
    ///
    /// A write failure is recorded in the session's history and leaves the
    /// command executing; it does not fail the call.
    pub async fn send_command_to(
        &self,
        id: &SessionId,
        command: &str,
    ) -> Result<Option<CommandId>> {
        let machine = Arc::clone(&self.machine);
        let disposition = self
            .store
            .update_session(id, |session, events| {
                machine.begin_command(session, command, events)
            })
            .ok_or(Error::SessionNotFound(*id))??;

        if disposition == CommandDisposition::Cleared {
            debug!("Cleared history of session '{}'", id);
        }
        let line = format!("{command}\n");
        if let Err(e) = self.write_to(id, line.as_bytes()).await {
            self.report(id, format!("Error sending input: {e}"));
        }
        Ok(disposition.command_id())
    }

    /// Send raw text to the selected session. No history entry is created.
    pub async fn send_input(&self, text: &str) -> Result<()> {
        let id = self.current_id()?;
        self.send_input_to(&id, text).await
    }

    /// Send raw text to a session. No history entry is created.
    pub async fn send_input_to(&self, id: &SessionId, text: &str) -> Result<()> {
        let machine = Arc::clone(&self.machine);
        self.store
            .update_session(id, |session, _| machine.note_input(session))
            .ok_or(Error::SessionNotFound(*id))?;
        if let Err(e) = self.write_to(id, text.as_bytes()).await {
            self.report(id, format!("Error sending input: {e}"));
        }
        Ok(())
    }

    /// Send Ctrl+C to the selected session.
    pub async fn send_interrupt_signal(&self) -> Result<()> {
        let id = self.current_id()?;
        self.send_interrupt_signal_to(&id).await
    }

    /// Send Ctrl+C to a session.
    pub async fn send_interrupt_signal_to(&self, id: &SessionId) -> Result<()> {
        if !self.store.contains(id) {
            return Err(Error::SessionNotFound(*id));
        }
        let result = match self.runtimes.lock().await.get(id) {
            Some(runtime) => runtime.interrupt(),
            None => Err(Error::WriterClosed),
        };
        if let Err(e) = result {
            self.report(id, format!("Error sending interrupt signal: {e}"));
        }
        Ok(())
    }

    /// Resize a session's terminal.
    pub async fn resize_session(&self, id: &SessionId, rows: u16, cols: u16) -> Result<()> {
        let dimensions = Dimensions::checked(rows, cols)?;
        match self.runtimes.lock().await.get(id) {
            Some(runtime) => runtime.resize(dimensions),
            None if self.store.contains(id) => Err(Error::WriterClosed),
            None => Err(Error::SessionNotFound(*id)),
        }
    }

    async fn write_to(&self, id: &SessionId, data: &[u8]) -> Result<()> {
        match self.runtimes.lock().await.get(id) {
            Some(runtime) => runtime.write(data),
            None => Err(Error::WriterClosed),
        }
    }

    fn report(&self, id: &SessionId, message: String) {
        warn!("Session '{}': {}", id, message);
        let max_items = self.max_items();
        self.store.update_session(id, |session, _| {
            session.push_system_entry(message, max_items);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptyshell_core::LaunchSpec;

    struct Unavailable;

    impl EnvironmentProvisioner for Unavailable {
        fn prepare(&self) -> Result<LaunchSpec> {
            Err(Error::EnvironmentNotReady("no rootfs".to_string()))
        }
    }

    fn manager(max_sessions: usize) -> SessionManager {
        let mut config = AppConfig::default();
        config.session.max_sessions = max_sessions;
        SessionManager::with_provisioner(config, Arc::new(Unavailable)).unwrap()
    }

    #[tokio::test]
    async fn test_session_manager_create() {
        let manager = manager(10);
        assert_eq!(manager.session_count(), 0);
        assert!(manager.current_session().is_none());
    }

    #[tokio::test]
    async fn test_provisioning_failure_is_one_entry() {
        let manager = manager(10);
        let id = manager.create_session().await.unwrap();
        let session = manager.get_session(&id).unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.command_history.len(), 1);
        assert_eq!(session.command_history[0].output, ENVIRONMENT_FAILED);
        assert!(!manager.snapshot().is_loading);
    }

    #[tokio::test]
    async fn test_titles_and_selection() {
        let manager = manager(10);
        let first = manager.create_session().await.unwrap();
        let second = manager.create_session().await.unwrap();
        assert_eq!(manager.current_session().unwrap().id, second);
        assert_eq!(manager.get_session(&first).unwrap().title, "Session 1");
        assert_eq!(manager.get_session(&second).unwrap().title, "Session 2");

        manager.switch_to_session(&first).await.unwrap();
        assert_eq!(manager.current_session().unwrap().id, first);
        assert!(manager.switch_to_session(&SessionId::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_session_limit() {
        let manager = manager(1);
        manager.create_session().await.unwrap();
        let err = manager.create_session().await.unwrap_err();
        assert!(matches!(err, Error::SessionLimitReached(1)));
        assert_eq!(
            manager.snapshot().error.as_deref(),
            Some("Session limit reached (max: 1)")
        );

        let only = manager.current_session().unwrap().id;
        manager.close_session(&only).await.unwrap();
        manager.close_all().await;
        manager.create_session().await.unwrap();
        assert!(manager.snapshot().error.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_respect_limit() {
        for _ in 0..20 {
            let manager = Arc::new(manager(1));
            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let manager = Arc::clone(&manager);
                    tokio::spawn(async move { manager.create_session().await.is_ok() })
                })
                .collect();

            let mut created = 0;
            for task in tasks {
                if task.await.unwrap() {
                    created += 1;
                }
            }
            assert_eq!(created, 1);
            assert_eq!(manager.session_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_close_only_session_leaves_one() {
        let manager = manager(10);
        let id = manager.create_session().await.unwrap();
        let mut events = manager.events();

        manager.close_session(&id).await.unwrap();
        assert_eq!(manager.session_count(), 1);
        let current = manager.current_session().unwrap();
        assert_ne!(current.id, id);
        assert_eq!(current.title, "Session 2");

        assert_eq!(
            events.recv().await.unwrap(),
            TerminalEvent::SessionClosed { session_id: id }
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            TerminalEvent::SessionCreated { session_id, .. } if session_id == current.id
        ));
    }

    #[tokio::test]
    async fn test_close_unknown_session() {
        let manager = manager(10);
        let err = manager.close_session(&SessionId::new()).await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_send_without_session() {
        let manager = manager(10);
        assert!(matches!(
            manager.send_command("ls").await,
            Err(Error::NoActiveSession)
        ));
        assert!(matches!(
            manager.send_interrupt_signal().await,
            Err(Error::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_write_failure_reported_inline() {
        let manager = manager(10);
        let id = manager.create_session().await.unwrap();

        let command_id = manager.send_command("ls").await.unwrap();
        assert!(command_id.is_some());

        let session = manager.get_session(&id).unwrap();
        let entry = session.executing_entry().unwrap();
        assert_eq!(Some(entry.id), command_id);
        assert_eq!(
            session.command_history.last().unwrap().output,
            "Error sending input: Session writer is closed"
        );

        // The executing entry blocks further commands
        assert!(matches!(
            manager.send_command("pwd").await,
            Err(Error::CommandInProgress(_))
        ));
    }

    #[tokio::test]
    async fn test_interrupt_failure_reported_inline() {
        let manager = manager(10);
        let id = manager.create_session().await.unwrap();
        manager.send_interrupt_signal().await.unwrap();
        let session = manager.get_session(&id).unwrap();
        assert_eq!(
            session.command_history.last().unwrap().output,
            "Error sending interrupt signal: Session writer is closed"
        );
    }

    #[tokio::test]
    async fn test_close_all() {
        let manager = manager(10);
        manager.create_session().await.unwrap();
        manager.create_session().await.unwrap();
        manager.close_all().await;
        assert_eq!(manager.session_count(), 0);
        assert!(manager.snapshot().current_session_id.is_none());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.session.max_history_items = 1;
        assert!(SessionManager::new(config).is_err());
    }
}
