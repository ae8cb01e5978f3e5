//! Ambient error types.
//!
//! Per the error-handling design: construction failures (pipe/fcntl set-up)
//! surface as a `Result` rather than an empty handle; everything else
//! (fatal dispatch errors, misuse contracts) is logged and then panics or is
//! asserted away in debug builds, never returned as an [`Error`].

/// Errors that can occur while building an
/// [`EventLoop`](crate::runtime::event_loop::EventLoop).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The self-pipe could not be created (`pipe(2)` failed).
    #[error("failed to create self-pipe: {0}")]
    CreatePipe(#[source] std::io::Error),

    /// The self-pipe's read end could not be set non-blocking (`fcntl(2)`
    /// failed).
    #[error("failed to set self-pipe non-blocking: {0}")]
    SetNonBlocking(#[source] std::io::Error),
}

/// Convenience alias for fallible constructors in this crate.
pub type Result<T> = std::result::Result<T, Error>;
