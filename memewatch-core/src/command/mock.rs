//! Mock command runner for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use super::CommandRunner;
use crate::error::{CoreError, Result};

type Handler = dyn Fn(&str, &[&str]) -> Result<String> + Send + Sync;

/// One recorded invocation, for asserting on argument construction.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
}

/// Mock [`CommandRunner`] for testing.
/// WARNING: Do not use in production - never spawns a real process!
///
/// The handler receives the program name and arguments and returns the canned
/// combined output (or an error). Handlers may create files on disk to mimic
/// tools that write their results to an output path, e.g. ffmpeg frame
/// extraction.
pub struct MockRunner {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRunner {
    pub fn new(handler: impl Fn(&str, &[&str]) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A runner that answers every invocation with the same output.
    pub fn always(output: impl Into<String>) -> Self {
        let output = output.into();
        Self::new(move |_, _| Ok(output.clone()))
    }

    /// A runner that fails every invocation with a `ToolInvocation` error.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |program, _| Err(CoreError::tool(program, message.clone())))
    }

    /// All invocations seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            });
        }
        (self.handler)(program, args)
    }
}
