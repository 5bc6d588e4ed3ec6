//! Error types for Wayhost
//!
//! Every fallible operation in the crate reports a [`Error`]. Callers that
//! need to decide between aborting, retrying or carrying on use
//! [`Error::kind`] rather than matching individual variants.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Construction failed; the object never became valid
    SetupFailure,
    /// Interrupted or would-block I/O, retried internally
    TransientIo,
    /// The compositor connection errored or hung up
    ProtocolError,
    /// A platform or engine call failed at runtime
    OperationFailure,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid window dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("could not connect to the wayland display: {0}")]
    Connect(#[from] wayland_client::ConnectError),

    #[error("compositor did not advertise a required global: {0}")]
    MissingGlobal(&'static str),

    #[error("required resource file not found: {}", .0.display())]
    MissingResource(PathBuf),

    #[error("asset bundle is not valid: {}", .0.display())]
    InvalidAssetBundle(PathBuf),

    #[error("EGL setup failed ({stage}): {detail}")]
    Egl { stage: &'static str, detail: String },

    #[error("surface setup failed: {0}")]
    Surface(String),

    #[error("event loop setup failed: {0}")]
    EventLoop(String),

    #[error("could not launch the rendering engine: {0}")]
    EngineLaunch(String),

    #[error("rendering engine call failed: {0}")]
    Engine(String),

    #[error("wayland protocol error: {0}")]
    Protocol(String),

    #[error("display connection lost")]
    ConnectionLost,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDimensions { .. }
            | Error::Connect(_)
            | Error::MissingGlobal(_)
            | Error::MissingResource(_)
            | Error::InvalidAssetBundle(_)
            | Error::Egl { .. }
            | Error::Surface(_)
            | Error::EventLoop(_)
            | Error::EngineLaunch(_) => ErrorKind::SetupFailure,
            Error::Engine(_) => ErrorKind::OperationFailure,
            Error::Protocol(_) | Error::ConnectionLost => ErrorKind::ProtocolError,
            Error::Io(e) if is_transient(e) => ErrorKind::TransientIo,
            Error::Io(_) => ErrorKind::ProtocolError,
        }
    }

    /// Whether the failure should abort construction of the owning object
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::SetupFailure | ErrorKind::ProtocolError
        )
    }
}

/// Interrupted and would-block results are retried, never surfaced
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

impl From<calloop::Error> for Error {
    fn from(err: calloop::Error) -> Self {
        match err {
            calloop::Error::IoError(e) => Error::Io(e),
            other => Error::EventLoop(other.to_string()),
        }
    }
}
