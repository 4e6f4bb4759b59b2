//! Error types.
//!
//! The source implementation reports one shared `enum channel_status`
//! (`SUCCESS` / `CHANNEL_FULL` / `CHANNEL_EMPTY` / `CLOSED_ERROR` / ...,
//! notoriously aliasing `CHANNEL_FULL` and `CHANNEL_EMPTY` at the same
//! value) from every operation. Here each operation gets its own `Result`
//! and its own error type instead, so a send failure and a receive failure
//! can never be confused at the type level, and a failed send can hand the
//! value it failed to send back to the caller.

use std::fmt;

use thiserror::Error;

/// A blocking send failed because the channel was closed. Carries the value
/// back so it isn't silently dropped.
#[derive(Error)]
#[error("send on a closed channel")]
pub struct SendError<T>(pub T);

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

impl<T: PartialEq> PartialEq for SendError<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// A blocking receive failed because the channel was closed (and had
/// nothing left to report).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("receive on a closed channel")]
pub struct RecvError;

/// A non-blocking send failed either because the channel was full right
/// now, or because it was closed.
#[derive(Error)]
pub enum TrySendError<T> {
    #[error("channel full")]
    Full(T),
    #[error("send on a closed channel")]
    Closed(T),
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.debug_tuple("Full").finish_non_exhaustive(),
            TrySendError::Closed(_) => f.debug_tuple("Closed").finish_non_exhaustive(),
        }
    }
}

impl<T: PartialEq> PartialEq for TrySendError<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TrySendError::Full(a), TrySendError::Full(b)) => a == b,
            (TrySendError::Closed(a), TrySendError::Closed(b)) => a == b,
            _ => false,
        }
    }
}

/// A non-blocking receive failed either because the channel was empty right
/// now, or because it was closed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    #[error("channel empty")]
    Empty,
    #[error("receive on a closed channel")]
    Closed,
}

/// `close()` was called on a channel that was already closed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("channel already closed")]
pub struct CloseError;

/// `destroy()` was called on a channel that hadn't been closed yet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("channel must be closed before it can be destroyed")]
pub struct DestroyError;

/// `select()` resolved against a case whose channel was closed. Carries the
/// index of that case, same as a successful resolution would.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("select case {0} resolved against a closed channel")]
pub struct SelectError(pub usize);
