//! Running `sp` against a test workspace and reading what it prints

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

/// One `sp` invocation, bound to a workspace directory and config file
pub struct SpCommand {
    workspace: PathBuf,
    config: PathBuf,
    args: Vec<String>,
    input: Option<String>,
}

impl SpCommand {
    pub fn new(workspace: &Path, config: &Path) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            config: config.to_path_buf(),
            args: Vec::new(),
            input: None,
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Answer prompts (e.g. restore confirmation) with this input
    pub fn stdin(&mut self, input: &str) -> &mut Self {
        self.input = Some(input.to_string());
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_sp"));
        command
            .args(&self.args)
            .current_dir(&self.workspace)
            .env("SP_CONFIG", &self.config)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    fn run(&self) -> Result<SpOutput> {
        let mut command = self.command();
        let output = match &self.input {
            Some(input) => {
                let mut child = command
                    .stdin(Stdio::piped())
                    .spawn()
                    .context("Failed to start sp")?;
                if let Some(mut stdin) = child.stdin.take() {
                    stdin.write_all(input.as_bytes())?;
                }
                child.wait_with_output()?
            }
            None => command.stdin(Stdio::null()).output().context("Failed to run sp")?,
        };
        Ok(SpOutput::from(output))
    }

    /// Start a long-running command such as `sp edit`
    pub fn spawn(&self) -> Result<Child> {
        self.command()
            .stdin(Stdio::piped())
            .spawn()
            .context("Failed to start sp")
    }

    pub fn assert_success(&self) -> Result<SpOutput> {
        let output = self.run()?;
        if !output.success {
            anyhow::bail!(
                "sp {} failed:\n{}\n{}",
                self.args.join(" "),
                output.stdout,
                output.stderr
            );
        }
        Ok(output)
    }

    pub fn assert_failure(&self) -> Result<SpOutput> {
        let output = self.run()?;
        if output.success {
            anyhow::bail!("sp {} should have failed:\n{}", self.args.join(" "), output.stdout);
        }
        Ok(output)
    }
}

/// Captured output with colors stripped
#[derive(Debug, Clone)]
pub struct SpOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl From<Output> for SpOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: strip_ansi(&String::from_utf8_lossy(&output.stdout)),
            stderr: strip_ansi(&String::from_utf8_lossy(&output.stderr)),
            success: output.status.success(),
        }
    }
}

impl SpOutput {
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Value of a `Name:   value` line, as printed by `sp status`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.stdout.lines().find_map(|line| {
            let (key, value) = line.trim_start().split_once(':')?;
            (key == name).then(|| value.trim())
        })
    }

    /// Id from the `Snapshot <id>` line printed by `sp snapshot`
    pub fn parse_snapshot_id(&self) -> Option<String> {
        self.stdout
            .lines()
            .filter_map(|line| line.split_once("Snapshot "))
            .find_map(|(_, rest)| {
                let token = rest.split_whitespace().next()?;
                ulid::Ulid::from_string(token).ok().map(|id| id.to_string())
            })
    }
}

fn strip_ansi(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI sequences end with a letter
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            plain.push(c);
        }
    }
    plain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stdout(text: &str) -> SpOutput {
        SpOutput {
            stdout: strip_ansi(text),
            stderr: String::new(),
            success: true,
        }
    }

    #[test]
    fn test_status_fields() {
        let out = stdout(
            "Canvas:        1/9 blocks filled\n\
             Session:       \x1b[33mNot running\x1b[39m\n\
             \x20 Revision:    \x1b[33m2\x1b[39m\n\
             \x20 State:       \x1b[32mAll changes saved\x1b[39m\n",
        );
        assert_eq!(out.field("Revision"), Some("2"));
        assert_eq!(out.field("State"), Some("All changes saved"));
        assert_eq!(out.field("Session"), Some("Not running"));
        assert_eq!(out.field("Canvas"), Some("1/9 blocks filled"));
        assert_eq!(out.field("Evidence"), None);
    }

    #[test]
    fn test_snapshot_id_from_colored_line() {
        let out = stdout("✓ Snapshot \x1b[33m01HXKJ7NVQW3Y2YMZK5VFZX3G8\x1b[39m\n  Label: pitch\n");
        assert_eq!(
            out.parse_snapshot_id().as_deref(),
            Some("01HXKJ7NVQW3Y2YMZK5VFZX3G8")
        );
        assert_eq!(stdout("No changes since snapshot").parse_snapshot_id(), None);
    }
}
