//! Error taxonomy for devstart.
//!
//! Every aborting error reaches the top level as a `DevstartError`. Callers
//! label failures with [`ResultExt::context`] so the final message reads as a
//! chain of short operation names, e.g. `adding aliases: timed out waiting for
//! alias 10.144.0.4`.

use thiserror::Error;

pub type DevstartResult<T> = Result<T, DevstartError>;

#[derive(Debug, Error)]
pub enum DevstartError {
    /// Bad flag values or missing files named by the user.
    #[error("{0}")]
    InvalidInput(String),

    /// Dependency archive does not match the supported compatibility tag.
    #[error("{0}")]
    Incompatible(String),

    /// A bounded wait ran out of time.
    #[error("{0}")]
    Timeout(String),

    /// Host prerequisites (virtualization, privileges) are not met.
    #[error("host requirements not met: {0}")]
    Requirements(String),

    #[error("{0}")]
    Hypervisor(String),

    #[error("{0}")]
    Network(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Failure reported by an external collaborator (cache, provisioner, ...).
    #[error("{0}")]
    External(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<DevstartError>,
    },
}

impl DevstartError {
    /// Wrap this error with a short operation label.
    pub fn context(self, context: impl Into<String>) -> Self {
        DevstartError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any `Context` layers.
    pub fn root(&self) -> &DevstartError {
        match self {
            DevstartError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), DevstartError::Timeout(_))
    }
}

/// Labelling helper for results, mirroring `anyhow::Context` for our enum.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> DevstartResult<T>;

    fn with_context<F, S>(self, f: F) -> DevstartResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for DevstartResult<T> {
    fn context(self, context: impl Into<String>) -> DevstartResult<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> DevstartResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
