//! Per-session PTY plumbing: reader thread, read loop and writer.

use std::io::Read;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ptyshell_core::{Dimensions, LaunchSpec, Result, SessionId, SessionStatus};
use ptyshell_emulator::PtyHandle;

use crate::decoder::Utf8Decoder;
use crate::machine::SessionStateMachine;
use crate::processor::OutputProcessor;
use crate::store::TerminalStore;

/// Control byte sent for an interrupt (Ctrl+C).
pub const INTERRUPT: u8 = 0x03;

/// `EIO`, returned by a PTY master once the child side has closed.
#[cfg(unix)]
const EIO: i32 = 5;

/// What the reader thread observed.
#[derive(Debug)]
enum ReadEvent {
    Data(String),
    Eof,
    Error(std::io::Error),
}

/// Runtime settings for a session.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Size of a single PTY read
    pub read_buffer_size: usize,
    /// Marker echoed by the bootstrap input line
    pub ready_marker: String,
    /// Maximum history entries, for runtime messages
    pub max_history_items: usize,
}

/// A running session: its PTY, reader thread and read loop.
#[derive(Debug)]
pub struct SessionRuntime {
    session_id: SessionId,
    pty: Arc<PtyHandle>,
    cancel: CancellationToken,
    resize_tx: mpsc::UnboundedSender<Dimensions>,
    task: Option<JoinHandle<()>>,
}

impl SessionRuntime {
    /// Spawn the shell, start reading its output and send the bootstrap line.
    ///
    /// Marks the session `Running` and records `Session started.` before any
    /// output is processed.
    pub fn start(
        session_id: SessionId,
        spec: &LaunchSpec,
        store: Arc<TerminalStore>,
        machine: Arc<SessionStateMachine>,
        options: &RuntimeOptions,
    ) -> Result<Self> {
        let pty = Arc::new(PtyHandle::spawn(spec)?);
        let attached = Self::attach(session_id, spec, Arc::clone(&pty), store, machine, options);
        match attached {
            Ok(runtime) => Ok(runtime),
            Err(err) => {
                warn!("Session '{}' failed to start, stopping it: {}", session_id, err);
                if let Err(e) = pty.close_writer() {
                    warn!("Failed to close writer of session '{}': {}", session_id, e);
                }
                if let Err(e) = pty.kill() {
                    warn!("Failed to kill session '{}': {}", session_id, e);
                }
                Err(err)
            }
        }
    }

    /// Wire a spawned PTY to the store and send the bootstrap line.
    fn attach(
        session_id: SessionId,
        spec: &LaunchSpec,
        pty: Arc<PtyHandle>,
        store: Arc<TerminalStore>,
        machine: Arc<SessionStateMachine>,
        options: &RuntimeOptions,
    ) -> Result<Self> {
        let reader = pty.take_reader()?;
        let max_items = options.max_history_items;

        store.update_session(&session_id, |session, _| {
            session.status = SessionStatus::Running;
            session.push_system_entry("Session started.", max_items);
        });

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        spawn_reader(session_id, reader, output_tx, options.read_buffer_size)?;

        let (resize_tx, resize_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let processor = OutputProcessor::new(
            session_id,
            Arc::clone(&store),
            machine,
            spec.dimensions,
        );
        let task = tokio::spawn(read_loop(
            processor,
            store,
            output_rx,
            resize_rx,
            cancel.clone(),
            max_items,
        ));

        let runtime = Self {
            session_id,
            pty,
            cancel,
            resize_tx,
            task: Some(task),
        };
        runtime.write(format!("echo '{}'\n", options.ready_marker).as_bytes())?;
        Ok(runtime)
    }

    /// Session this runtime serves.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// OS process id of the shell, if known.
    pub fn process_id(&self) -> Option<u32> {
        self.pty.process_id()
    }

    /// Write raw bytes to the shell.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.pty.write(data)?;
        Ok(())
    }

    /// Send Ctrl+C.
    pub fn interrupt(&self) -> Result<()> {
        debug!("Sending interrupt to session '{}'", self.session_id);
        self.write(&[INTERRUPT])
    }

    /// Resize the PTY and the session's screen grid.
    pub fn resize(&self, dimensions: Dimensions) -> Result<()> {
        self.pty.resize(dimensions)?;
        if self.resize_tx.send(dimensions).is_err() {
            debug!("Read loop of session '{}' already ended", self.session_id);
        }
        Ok(())
    }

    /// Whether the shell process is still running.
    pub fn is_alive(&self) -> bool {
        self.pty.is_alive()
    }

    /// Stop the session: cancel the read loop, then close the writer, then
    /// kill the process.
    pub async fn shutdown(mut self) {
        info!("Shutting down session '{}'", self.session_id);
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Read loop of session '{}' failed: {}", self.session_id, e);
            }
        }
        if let Err(e) = self.pty.close_writer() {
            warn!("Failed to close writer of session '{}': {}", self.session_id, e);
        }
        if let Err(e) = self.pty.kill() {
            warn!("Failed to kill session '{}': {}", self.session_id, e);
        }
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Blocking reads run on a dedicated thread so that a PTY that never closes
/// cannot hold up runtime shutdown.
fn spawn_reader(
    session_id: SessionId,
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::UnboundedSender<ReadEvent>,
    buffer_size: usize,
) -> Result<()> {
    std::thread::Builder::new()
        .name(format!("pty-reader-{session_id}"))
        .spawn(move || {
            let mut buf = vec![0u8; buffer_size];
            let mut decoder = Utf8Decoder::new();
            loop {
                let event = match reader.read(&mut buf) {
                    Ok(0) => ReadEvent::Eof,
                    Ok(n) => {
                        let text = decoder.decode(&buf[..n]);
                        if text.is_empty() {
                            continue;
                        }
                        ReadEvent::Data(text)
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    #[cfg(unix)]
                    Err(e) if e.raw_os_error() == Some(EIO) => ReadEvent::Eof,
                    Err(e) => ReadEvent::Error(e),
                };
                let last = !matches!(event, ReadEvent::Data(_));
                if tx.send(event).is_err() || last {
                    break;
                }
            }
            debug!("Reader thread of session '{}' finished", session_id);
        })?;
    Ok(())
}

async fn read_loop(
    mut processor: OutputProcessor,
    store: Arc<TerminalStore>,
    mut output_rx: mpsc::UnboundedReceiver<ReadEvent>,
    mut resize_rx: mpsc::UnboundedReceiver<Dimensions>,
    cancel: CancellationToken,
    max_items: usize,
) {
    let session_id = processor.session_id();
    info!("Read loop of session '{}' started", session_id);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("Read loop of session '{}' cancelled", session_id);
                break;
            }
            Some(dimensions) = resize_rx.recv() => processor.resize(dimensions),
            event = output_rx.recv() => match event {
                Some(ReadEvent::Data(text)) => processor.process_chunk(&text),
                Some(ReadEvent::Error(e)) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    error!("Error reading from session '{}': {}", session_id, e);
                    store.update_session(&session_id, |session, _| {
                        session.status = SessionStatus::Exited;
                        session.push_system_entry(
                            format!("Error reading from terminal: {e}"),
                            max_items,
                        );
                    });
                    break;
                }
                Some(ReadEvent::Eof) | None => {
                    info!("Output of session '{}' ended", session_id);
                    store.update_session(&session_id, |session, _| {
                        session.status = SessionStatus::Exited;
                    });
                    break;
                }
            },
        }
    }
}
