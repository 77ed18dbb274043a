//! sp edit, driven through its prompt

use crate::common::TestWorkspace;
use anyhow::{Context, Result};
use journal::CanvasBlock;
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdout};
use std::time::Duration;

/// Kills the session if a test bails out before `quit`
struct SessionProcess(Option<Child>);

impl Drop for SessionProcess {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Read session output until its banner shows the store is open
fn wait_for_banner(stdout: &mut BufReader<ChildStdout>) -> Result<String> {
    let mut seen = String::new();
    loop {
        let mut line = String::new();
        if stdout.read_line(&mut line)? == 0 {
            anyhow::bail!("Edit session exited early:\n{}", seen);
        }
        seen.push_str(&line);
        if line.starts_with("Editing") {
            return Ok(seen);
        }
    }
}

#[test]
fn test_edit_session_autosaves_and_flushes() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.sp(&["init"]).assert_success()?;

    let mut session = SessionProcess(Some(ws.sp(&["edit", "--debounce-ms", "50"]).spawn()?));
    let lock_path = ws.root().join(".sp/locks/session.lock");
    let mut stdout = BufReader::new(
        session
            .0
            .as_mut()
            .and_then(|child| child.stdout.take())
            .context("session stdout")?,
    );
    wait_for_banner(&mut stdout)?;
    assert!(lock_path.exists());

    // One-shot commands refuse to open the locked store
    let busy = ws.sp(&["save"]).assert_failure()?;
    assert!(busy.contains_stderr("edit session is active"));
    let status = ws.sp(&["status"]).assert_success()?;
    assert_eq!(status.field("Session"), Some("Editing ✓"));

    ws.edit_block(CanvasBlock::ValuePropositions, "Light after dark")?;
    std::thread::sleep(Duration::from_millis(500));

    let mut child = session.0.take().context("session already taken")?;
    {
        let mut stdin = child.stdin.take().context("session stdin")?;
        writeln!(stdin, "snapshot from-session")?;
        writeln!(stdin, "quit")?;
    }
    let output = child.wait_with_output()?;
    let mut rest = String::new();
    stdout.read_to_string(&mut rest)?;
    assert!(
        output.status.success(),
        "edit failed: {}\n{}",
        rest,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(rest.contains("Session closed"));

    assert!(!lock_path.exists());
    let status = ws.sp(&["status"]).assert_success()?;
    assert_eq!(status.field("State"), Some("All changes saved"));
    assert_eq!(status.field("Session"), Some("Not running"));

    let log = ws.sp(&["log"]).assert_success()?;
    assert!(log.contains_stdout("from-session"));

    let session_log = ws.root().join(".sp/logs/session.log");
    assert!(session_log.exists());
    Ok(())
}
