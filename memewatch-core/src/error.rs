use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("workspace error: {0}")]
    Workspace(String),

    #[error("{tool} invocation failed: {message}")]
    ToolInvocation { tool: String, message: String },

    #[error("unparsable tool output: {0}")]
    ToolOutput(String),

    #[error("no audio stream in source media")]
    NoAudioStream,

    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("image error: {0}")]
    Image(String),
}

impl CoreError {
    /// Build a `ToolInvocation` error for the given program.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
