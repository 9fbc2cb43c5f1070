use std::fmt;
use std::io;

/// Render pipeline error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The app failed before producing its fragment sequence
    Setup(String),
    /// The app failed while producing a fragment
    Fragment(String),
    /// The job was cancelled because its output was abandoned
    Aborted,
    /// The head or tail template failed to render
    Document(String),
    /// A render coroutine could not be spawned
    Spawn(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Setup(msg) => write!(f, "render setup failed: {msg}"),
            RenderError::Fragment(msg) => write!(f, "render failed mid-stream: {msg}"),
            RenderError::Aborted => write!(f, "render aborted"),
            RenderError::Document(msg) => write!(f, "document template failed: {msg}"),
            RenderError::Spawn(msg) => write!(f, "failed to spawn render coroutine: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<RenderError> for io::Error {
    fn from(err: RenderError) -> Self {
        io::Error::other(err)
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        RenderError::Document(err.to_string())
    }
}
