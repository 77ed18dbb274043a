//! sp config

use crate::common::TestWorkspace;
use anyhow::Result;

#[test]
fn test_config_set_and_get() -> Result<()> {
    let ws = TestWorkspace::new()?;

    let path = ws.sp(&["config", "path"]).assert_success()?;
    assert!(path.contains_stdout("config.toml"));
    assert!(path.contains_stdout("does not exist"));

    let get = ws.sp(&["config", "get", "autosave.debounce_ms"]).assert_success()?;
    assert_eq!(get.stdout.trim(), "1000");

    ws.sp(&["config", "set", "autosave.debounce_ms", "250"]).assert_success()?;
    let get = ws.sp(&["config", "get", "autosave.debounce_ms"]).assert_success()?;
    assert_eq!(get.stdout.trim(), "250");
    assert!(ws.config_path().exists());

    let list = ws.sp(&["config", "list"]).assert_success()?;
    assert!(list.contains_stdout("[autosave]"));
    assert!(list.contains_stdout("retain_labeled"));
    Ok(())
}

#[test]
fn test_config_rejects_bad_values() -> Result<()> {
    let ws = TestWorkspace::new()?;

    ws.sp(&["config", "set", "autosave.max_retries", "0"]).assert_failure()?;
    ws.sp(&["config", "set", "autosave.backoff", "linear"]).assert_failure()?;
    ws.sp(&["config", "get", "no.such.key"]).assert_failure()?;
    assert!(!ws.config_path().exists());
    Ok(())
}

#[test]
fn test_config_example_and_create() -> Result<()> {
    let ws = TestWorkspace::new()?;

    let example = ws.sp(&["config", "example"]).assert_success()?;
    assert!(example.contains_stdout("[autosave]"));

    ws.sp(&["config", "path", "--create"]).assert_success()?;
    assert!(ws.config_path().exists());
    Ok(())
}
