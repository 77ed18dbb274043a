//! Lock file management for edit-session exclusivity

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCK_FILE: &str = "locks/session.lock";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("an edit session is already running (pid {pid})")]
    Held { pid: u32 },
}

/// Session lock file structure
pub struct SessionLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockContent {
    pub pid: u32,
    pub started_at: u64,
}

impl SessionLock {
    /// Acquire exclusive session lock under the `.sp` directory
    ///
    /// Fails with [`LockError::Held`] if a live process holds it.
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        Self::acquire_inner(state_dir, true)
    }

    fn acquire_inner(state_dir: &Path, retry_stale: bool) -> Result<Self> {
        let lock_path = state_dir.join(LOCK_FILE);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create locks directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            let content = Self::read_lock_content(&mut file).ok();
            match content {
                Some(content) if is_process_alive(content.pid) || !retry_stale => {
                    return Err(LockError::Held { pid: content.pid }.into());
                }
                None if !retry_stale => {
                    return Err(LockError::Held { pid: 0 }.into());
                }
                _ => {
                    tracing::warn!("Removing stale session lock");
                    drop(file);
                    std::fs::remove_file(&lock_path)?;
                    return Self::acquire_inner(state_dir, false);
                }
            }
        }

        Self::write_lock_content(&mut file)?;

        Ok(Self {
            path: lock_path,
            file,
        })
    }

    /// Who holds the lock right now, if anyone
    pub fn holder(state_dir: &Path) -> Result<Option<LockContent>> {
        let lock_path = state_dir.join(LOCK_FILE);
        if !lock_path.exists() {
            return Ok(None);
        }

        let mut file = match OpenOptions::new().read(true).write(true).open(&lock_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to open lock file"),
        };

        // Taking the lock ourselves means nobody holds it; dropping the
        // file releases it again
        if try_flock_exclusive(&file)? {
            return Ok(None);
        }

        match Self::read_lock_content(&mut file) {
            Ok(content) if is_process_alive(content.pid) => Ok(Some(content)),
            _ => Ok(None),
        }
    }

    /// Release the session lock
    pub fn release(self) -> Result<()> {
        // The flock goes away with the file handle; remove the file explicitly
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }

    /// Write lock content (PID + timestamp)
    fn write_lock_content(file: &mut File) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            started_at: current_timestamp_ms(),
        };

        let serialized =
            serde_json::to_string(&content).context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Read lock content from file
    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let content: LockContent =
            serde_json::from_str(&contents).context("Failed to deserialize lock content")?;
        Ok(content)
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to acquire exclusive file lock (non-blocking)
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Check if process is alive
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if pid == 0 {
        return false;
    }

    // Null signal: existence check only
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true, // EPERM: alive but not ours
    }
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
