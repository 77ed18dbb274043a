//! snapshot, log, show, diff, restore, and gc

use crate::common::TestWorkspace;
use anyhow::Result;
use journal::CanvasBlock;

#[test]
fn test_snapshot_log_and_restore() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.sp(&["init", "--title", "Kiosks"]).assert_success()?;

    let v2 = ws.edit_block(CanvasBlock::Channels, "Market stalls")?;
    let snap = ws.sp(&["snapshot", "--label", "pitch-v2"]).assert_success()?;
    let snap_id = snap.parse_snapshot_id().expect("snapshot id printed");

    // Unchanged content without a label is not snapshotted again
    let same = ws.sp(&["snapshot"]).assert_success()?;
    assert!(same.contains_stdout("No changes since snapshot"));

    ws.edit_block(CanvasBlock::Channels, "Radio ads")?;
    ws.sp(&["snapshot"]).assert_success()?;

    let log = ws.sp(&["log"]).assert_success()?;
    assert!(log.contains_stdout("3 of 3"));
    assert!(log.contains_stdout("pitch-v2"));

    let show = ws.sp(&["show", &snap_id, "-p"]).assert_success()?;
    assert!(show.contains_stdout("Market stalls"));
    assert!(show.contains_stdout("Channels"));

    let diff = ws.sp(&["diff", "pitch-v2"]).assert_success()?;
    assert!(diff.contains_stdout("Radio ads"));

    ws.sp(&["restore", "pitch-v2", "-y"]).assert_success()?;
    assert_eq!(ws.document()?, v2);

    let diff = ws.sp(&["diff", "pitch-v2"]).assert_success()?;
    assert!(diff.contains_stdout("No changes"));
    Ok(())
}

#[test]
fn test_restore_requires_confirmation() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.sp(&["init"]).assert_success()?;

    ws.edit_block(CanvasBlock::CostStructure, "Panels")?;
    let edited = ws.document()?;

    let missing = ws.sp(&["restore", "nonexistent-label"]).assert_failure()?;
    assert!(missing.contains_stderr("No snapshot found"));

    let snap = ws.sp(&["snapshot", "--label", "before"]).assert_success()?;
    assert!(snap.parse_snapshot_id().is_some());
    ws.edit_block(CanvasBlock::CostStructure, "Panels, rent")?;

    let mut cmd = ws.sp(&["restore", "before"]);
    cmd.stdin("n\n");
    let declined = cmd.assert_success()?;
    assert!(declined.contains_stdout("Restore cancelled"));
    assert_ne!(ws.document()?, edited);

    cmd = ws.sp(&["restore", "before"]);
    cmd.stdin("y\n");
    cmd.assert_success()?;
    assert_eq!(ws.document()?, edited);
    Ok(())
}

#[test]
fn test_gc_respects_retention() -> Result<()> {
    let ws = TestWorkspace::new()?;
    ws.write_config("[gc]\nretain_count = 2\nretain_hours = 0\nretain_labeled = true\n")?;
    ws.sp(&["init"]).assert_success()?;
    ws.sp(&["snapshot", "--label", "keep-me"]).assert_success()?;

    for i in 0..4 {
        ws.edit_block(CanvasBlock::KeyResources, &format!("draft {}", i))?;
        ws.sp(&["snapshot"]).assert_success()?;
    }

    let gc = ws.sp(&["gc"]).assert_success()?;
    assert!(gc.contains_stdout("Snapshots deleted"));

    let log = ws.sp(&["log"]).assert_success()?;
    // Two newest plus the labeled one
    assert!(log.contains_stdout("3 of 3"));
    assert!(log.contains_stdout("keep-me"));

    let again = ws.sp(&["gc"]).assert_success()?;
    assert!(again.contains_stdout("No garbage found"));
    Ok(())
}
