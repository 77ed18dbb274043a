//! init, save, and status

use crate::common::TestWorkspace;
use anyhow::Result;
use journal::CanvasBlock;

#[test]
fn test_init_creates_workspace() -> Result<()> {
    let ws = TestWorkspace::new()?;

    let result = ws.sp(&["init", "--title", "Solar kiosks"]).assert_success()?;
    assert!(result.contains_stdout("Initializing Savepoint workspace"));

    assert!(ws.root().join(".sp/store").is_dir());
    assert!(ws.root().join(".sp/journal").is_dir());
    assert_eq!(ws.document()?.title, "Solar kiosks");

    // Second init fails
    let again = ws.sp(&["init"]).assert_failure()?;
    assert!(again.contains_stderr("already initialized"));
    Ok(())
}

#[test]
fn test_commands_outside_workspace_fail() -> Result<()> {
    let ws = TestWorkspace::new()?;
    let result = ws.sp(&["status"]).assert_failure()?;
    assert!(result.contains_stderr("Not a Savepoint workspace"));
    Ok(())
}

#[test]
fn test_save_bumps_revision() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.sp(&["init"]).assert_success()?;

    let status = ws.sp(&["status"]).assert_success()?;
    assert_eq!(status.field("State"), Some("All changes saved"));
    assert_eq!(status.field("Session"), Some("Not running"));
    assert_eq!(status.field("Revision"), Some("1"));

    ws.edit_block(CanvasBlock::ValuePropositions, "Cheap evening light")?;
    let status = ws.sp(&["status"]).assert_success()?;
    assert_eq!(status.field("State"), Some("Unsaved changes"));
    assert_eq!(status.field("Canvas"), Some("1/9 blocks filled"));

    let saved = ws.sp(&["save"]).assert_success()?;
    assert!(saved.contains_stdout("Saved revision"));
    assert!(saved.contains_stdout("2"));

    let status = ws.sp(&["status"]).assert_success()?;
    assert_eq!(status.field("State"), Some("All changes saved"));
    assert_eq!(status.field("Revision"), Some("2"));

    // Saving unchanged content keeps the revision
    let again = ws.sp(&["save"]).assert_success()?;
    assert!(again.contains_stdout("2"));
    Ok(())
}

#[test]
fn test_save_reports_invalid_document() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_config("[autosave]\nmax_retries = 2\nbackoff = \"fixed\"\nbase_delay_ms = 10\n")?;
    ws.sp(&["init"]).assert_success()?;

    std::fs::write(ws.document_path(), b"{ not json")?;
    let result = ws.sp(&["save"]).assert_failure()?;
    assert!(result.contains_stderr("parse"));
    Ok(())
}
