//! PTY (Pseudo-Terminal) handling with portable-pty.

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use ptyshell_core::{Dimensions, Error, LaunchSpec, Result};

/// Handle to a process running on a PTY.
///
/// Owns the three handles a session needs: the input writer, the output
/// reader (taken once by the read loop) and the child lifecycle.
pub struct PtyHandle {
    /// The master PTY end
    master: Arc<Mutex<Box<dyn MasterPty + Send>>>,
    /// The child process
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    /// Current PTY dimensions
    dimensions: Arc<Mutex<Dimensions>>,
    /// PTY writer (None once closed)
    writer: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
    /// PTY reader (None once taken)
    reader: Arc<Mutex<Option<Box<dyn Read + Send>>>>,
}

impl std::fmt::Debug for PtyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyHandle")
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> Error {
    Error::PtyError(format!("Lock error: {e}"))
}

impl PtyHandle {
    /// Spawn a process attached to a new PTY.
    ///
    /// # Example
    /// ```no_run
    /// use ptyshell_core::LaunchSpec;
    /// use ptyshell_emulator::pty::PtyHandle;
    ///
    /// # fn example() -> ptyshell_core::Result<()> {
    /// let pty = PtyHandle::spawn(&LaunchSpec::new("/bin/sh"))?;
    /// pty.write(b"echo hello\n")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(spec: &LaunchSpec) -> Result<Self> {
        let dimensions = spec.dimensions;
        info!(
            "Spawning PTY: command='{}' args={:?}, dimensions={}x{}, cwd={:?}",
            spec.program, spec.args, dimensions.rows, dimensions.cols, spec.working_directory
        );

        let pty_system = native_pty_system();
        let pty_size = PtySize {
            rows: dimensions.rows,
            cols: dimensions.cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system.openpty(pty_size).map_err(|e| {
            error!("Failed to open PTY: {}", e);
            Error::PtyError(format!("Failed to open PTY: {e}"))
        })?;

        let mut cmd = CommandBuilder::new(&spec.program);
        for arg in &spec.args {
            cmd.arg(arg);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &spec.working_directory {
            debug!("Setting working directory to: {}", dir);
            cmd.cwd(dir);
        }

        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            error!("Failed to spawn command '{}': {}", spec.program, e);
            Error::PtyError(format!("Failed to spawn command: {e}"))
        })?;
        // The child holds its own copy; keeping ours would stop EOF from reaching the reader.
        drop(pair.slave);

        let handles = pair
            .master
            .take_writer()
            .map_err(|e| {
                error!("Failed to take PTY writer: {}", e);
                Error::PtyError(format!("Failed to take writer: {e}"))
            })
            .and_then(|writer| {
                let reader = pair.master.try_clone_reader().map_err(|e| {
                    error!("Failed to clone PTY reader: {}", e);
                    Error::PtyError(format!("Failed to clone reader: {e}"))
                })?;
                Ok((writer, reader))
            });
        let (writer, reader) = match handles {
            Ok(handles) => handles,
            Err(e) => {
                let mut child = child;
                if let Err(kill_err) = child.kill() {
                    warn!("Failed to kill half-spawned process: {}", kill_err);
                }
                return Err(e);
            }
        };

        info!(
            "PTY spawned successfully: command='{}' pid={:?}",
            spec.program,
            child.process_id()
        );

        Ok(Self {
            master: Arc::new(Mutex::new(pair.master)),
            child: Arc::new(Mutex::new(child)),
            dimensions: Arc::new(Mutex::new(dimensions)),
            writer: Arc::new(Mutex::new(Some(writer))),
            reader: Arc::new(Mutex::new(Some(reader))),
        })
    }

    /// Take the output reader. Only the first call returns it.
    pub fn take_reader(&self) -> Result<Box<dyn Read + Send>> {
        self.reader
            .lock()
            .map_err(lock_error)?
            .take()
            .ok_or_else(|| Error::PtyError("PTY reader already taken".to_string()))
    }

    /// Write data to the PTY and flush it.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        debug!("Writing {} bytes to PTY", data.len());
        let mut writer_lock = self.writer.lock().map_err(lock_error)?;
        let writer = writer_lock.as_mut().ok_or(Error::WriterClosed)?;

        writer.write_all(data)?;
        writer.flush()?;

        Ok(data.len())
    }

    /// Close the input side. Later writes fail with [`Error::WriterClosed`].
    pub fn close_writer(&self) -> Result<()> {
        let writer = self.writer.lock().map_err(lock_error)?.take();
        if writer.is_some() {
            debug!("Closed PTY writer");
        }
        Ok(())
    }

    /// Resize the PTY to new dimensions.
    ///
    /// Sends SIGWINCH to the child process to notify of the size change.
    pub fn resize(&self, new_dimensions: Dimensions) -> Result<()> {
        info!(
            "Resizing PTY to {}x{}",
            new_dimensions.rows, new_dimensions.cols
        );

        let new_size = PtySize {
            rows: new_dimensions.rows,
            cols: new_dimensions.cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        self.master
            .lock()
            .map_err(lock_error)?
            .resize(new_size)
            .map_err(|e| Error::PtyError(format!("Resize failed: {e}")))?;

        *self.dimensions.lock().map_err(lock_error)? = new_dimensions;
        Ok(())
    }

    /// Get current PTY dimensions.
    pub fn dimensions(&self) -> Result<Dimensions> {
        Ok(*self.dimensions.lock().map_err(lock_error)?)
    }

    /// OS process id of the child, if known.
    pub fn process_id(&self) -> Option<u32> {
        self.child.lock().ok().and_then(|child| child.process_id())
    }

    /// Check if the child process is still running.
    pub fn is_alive(&self) -> bool {
        match self.child.lock() {
            Ok(mut child) => child.try_wait().ok().flatten().is_none(),
            Err(_) => false,
        }
    }

    /// Kill the child process. Killing an exited process is not an error.
    pub fn kill(&self) -> Result<()> {
        let mut child = self.child.lock().map_err(lock_error)?;
        if child.try_wait().ok().flatten().is_some() {
            debug!("PTY process already exited");
            return Ok(());
        }

        info!("Killing PTY process pid={:?}", child.process_id());
        child
            .kill()
            .map_err(|e| Error::PtyError(format!("Kill failed: {e}")))?;
        // Reap so the process does not linger as a zombie
        let _ = child.try_wait();
        Ok(())
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        if self.is_alive() {
            debug!("Dropping PTY handle with a live process");
            if let Err(e) = self.kill() {
                warn!("Failed to kill PTY process on drop: {}", e);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn spawn_sh() -> PtyHandle {
        PtyHandle::spawn(&LaunchSpec::new("/bin/sh")).unwrap()
    }

    /// Read on a helper thread until `needle` shows up or the deadline passes.
    fn read_until(pty: &PtyHandle, needle: &str, timeout: Duration) -> String {
        let mut reader = pty.take_reader().unwrap();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = [0u8; 1024];
            while let Ok(n) = reader.read(&mut buf) {
                if n == 0 || tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        });

        let deadline = Instant::now() + timeout;
        let mut output = String::new();
        while !output.contains(needle) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(bytes) => output.push_str(&String::from_utf8_lossy(&bytes)),
                Err(_) => break,
            }
        }
        output
    }

    #[test]
    fn test_pty_spawn() {
        let pty = spawn_sh();
        assert!(pty.is_alive());
        assert!(pty.process_id().is_some());
        pty.kill().unwrap();
    }

    #[test]
    fn test_pty_spawn_missing_program() {
        let result = PtyHandle::spawn(&LaunchSpec::new("/definitely/not/a/shell"));
        assert!(matches!(result, Err(Error::PtyError(_))));
    }

    #[test]
    fn test_pty_dimensions() {
        let spec = LaunchSpec::new("/bin/sh").with_dimensions(Dimensions::new(30, 100));
        let pty = PtyHandle::spawn(&spec).unwrap();
        assert_eq!(pty.dimensions().unwrap(), Dimensions::new(30, 100));
        pty.kill().unwrap();
    }

    #[test]
    fn test_pty_write_and_read() {
        let pty = spawn_sh();
        pty.write(b"echo hello_pty\n").unwrap();
        let output = read_until(&pty, "hello_pty", Duration::from_secs(5));
        assert!(output.contains("hello_pty"));
        pty.kill().unwrap();
    }

    #[test]
    fn test_pty_env_and_cwd() {
        let spec = LaunchSpec::new("/bin/sh")
            .with_env("PTYSHELL_TEST_VAR", "marker42")
            .with_working_directory("/tmp");
        let pty = PtyHandle::spawn(&spec).unwrap();
        pty.write(b"echo \"$PTYSHELL_TEST_VAR:$(pwd)\"\n").unwrap();
        let output = read_until(&pty, "marker42:/tmp", Duration::from_secs(5));
        assert!(output.contains("marker42:/tmp"));
        pty.kill().unwrap();
    }

    #[test]
    fn test_take_reader_once() {
        let pty = spawn_sh();
        assert!(pty.take_reader().is_ok());
        assert!(pty.take_reader().is_err());
        pty.kill().unwrap();
    }

    #[test]
    fn test_write_after_close() {
        let pty = spawn_sh();
        pty.close_writer().unwrap();
        assert!(matches!(pty.write(b"x"), Err(Error::WriterClosed)));
        pty.kill().unwrap();
    }

    #[test]
    fn test_pty_resize() {
        let pty = spawn_sh();
        pty.resize(Dimensions::new(40, 120)).unwrap();
        assert_eq!(pty.dimensions().unwrap(), Dimensions::new(40, 120));
        pty.kill().unwrap();
    }

    /// Whether `pid` is gone or a zombie.
    #[cfg(target_os = "linux")]
    fn is_dead(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat.rsplit_once(')').is_some_and(|(_, rest)| {
                rest.trim_start()
                    .starts_with(|c: char| c == 'Z' || c == 'X')
            }),
            Err(_) => true,
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_drop_kills_live_process() {
        let pty = spawn_sh();
        let pid = pty.process_id().unwrap();
        assert!(!is_dead(pid));
        drop(pty);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !is_dead(pid) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(is_dead(pid));
    }

    #[test]
    fn test_pty_kill() {
        let pty = spawn_sh();
        assert!(pty.is_alive());
        pty.kill().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while pty.is_alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(!pty.is_alive());

        // Second kill is a no-op
        assert!(pty.kill().is_ok());
    }
}
