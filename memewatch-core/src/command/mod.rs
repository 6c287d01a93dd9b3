//! External-tool invocation.
//!
//! All subprocess orchestration (ffprobe, ffmpeg, fpcalc) goes through the
//! narrow [`CommandRunner`] seam so unit tests can substitute deterministic
//! canned outputs instead of spawning real binaries.

mod mock;

pub use mock::{MockRunner, RecordedCall};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CoreError, Result};

/// Runs a named external program and captures its combined stdout+stderr.
///
/// Implementations must be thread-safe (`Send + Sync`). A non-zero exit
/// status is reported as [`CoreError::ToolInvocation`] with the captured
/// output attached; once started, an invocation runs to completion (no
/// cancellation semantics).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// [`CommandRunner`] backed by real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        debug!(program, ?args, "running external tool");

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| CoreError::tool(program, format!("unable to spawn: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(CoreError::tool(
                program,
                format!("{}: {}", output.status, combined.trim()),
            ));
        }

        Ok(combined)
    }
}

/// Render a path as a subprocess argument.
pub(crate) fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}
