//! The public, typed channel handle.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::buffer::Message;
use crate::error::{CloseError, DestroyError, RecvError, SendError, TryRecvError, TrySendError};
use crate::raw::{BlockingRecvResult, BlockingSendResult, RawChannel, RecvAttempt, SendAttempt};
use crate::request::Outcome;

fn downcast<T: 'static>(msg: Message) -> T {
    *msg.downcast::<T>().expect("channel message type mismatch")
}

/// A bounded, typed channel.
///
/// Unlike `std::sync::mpsc`, there is no split sender/receiver pair: a
/// `Channel<T>` is a single cloneable handle, and any clone can send,
/// receive, or close it, the same way a channel is used in CSP-style
/// languages.
pub struct Channel<T> {
    raw: Arc<RawChannel>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Channel {
            raw: self.raw.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> Channel<T> {
    /// Creates a channel that can hold up to `capacity` messages before a
    /// `send` blocks.
    pub fn bounded(capacity: usize) -> Channel<T> {
        Channel {
            raw: RawChannel::new(capacity),
            _marker: PhantomData,
        }
    }

    /// Creates an unbuffered channel: `send` only ever completes against an
    /// already-waiting `recv`, and vice versa.
    pub fn rendezvous() -> Channel<T> {
        Self::bounded(0)
    }

    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    pub(crate) fn raw(&self) -> &Arc<RawChannel> {
        &self.raw
    }

    /// Sends `value`, blocking until there is room (or a waiting receiver,
    /// for a rendezvous channel) or the channel is closed.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let msg: Message = Box::new(value);
        match self.raw.send(msg) {
            BlockingSendResult::Done(Ok(())) => Ok(()),
            BlockingSendResult::Done(Err(msg)) => Err(SendError(downcast(msg))),
            BlockingSendResult::Pending(req, slot) => {
                let (outcome, _) = req.wait();
                req.release();
                match outcome {
                    Outcome::Success => Ok(()),
                    Outcome::Closed => {
                        let msg = slot.take_result().expect("closed send must hand its payload back");
                        Err(SendError(downcast(msg)))
                    }
                }
            }
        }
    }

    /// Receives a value, blocking until one is available or the channel is
    /// closed with nothing left to deliver.
    pub fn recv(&self) -> Result<T, RecvError> {
        match self.raw.recv() {
            BlockingRecvResult::Done(Ok(msg)) => Ok(downcast(msg)),
            BlockingRecvResult::Done(Err(())) => Err(RecvError),
            BlockingRecvResult::Pending(req, slot) => {
                let (outcome, _) = req.wait();
                req.release();
                match outcome {
                    Outcome::Success => Ok(downcast(
                        slot.take_result().expect("served recv must carry a payload"),
                    )),
                    Outcome::Closed => Err(RecvError),
                }
            }
        }
    }

    /// Sends without blocking: fails immediately if the channel is full (or,
    /// for a rendezvous channel, if no receiver is waiting right now).
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let msg: Message = Box::new(value);
        match self.raw.try_send(msg) {
            SendAttempt::Success => Ok(()),
            SendAttempt::Full(msg) => Err(TrySendError::Full(downcast(msg))),
            SendAttempt::Closed(msg) => Err(TrySendError::Closed(downcast(msg))),
        }
    }

    /// Receives without blocking: fails immediately if nothing is available.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        match self.raw.try_recv() {
            RecvAttempt::Success(msg) => Ok(downcast(msg)),
            RecvAttempt::Empty => Err(TryRecvError::Empty),
            RecvAttempt::Closed => Err(TryRecvError::Closed),
        }
    }

    /// Closes the channel. Every thread currently parked on it (sender or
    /// receiver) is woken with an error; buffered messages are left in
    /// place, but later `recv`s still report closed rather than draining
    /// them.
    pub fn close(&self) -> Result<(), CloseError> {
        self.raw.close().map_err(|()| CloseError)
    }

    /// Releases this handle's hold on the channel, failing if the channel
    /// was never closed. The underlying state is reclaimed by `Drop`
    /// regardless; this exists for parity with callers that want to assert
    /// the channel was properly wound down before dropping it.
    pub fn destroy(self) -> Result<(), DestroyError> {
        self.raw.check_destroyable().map_err(|()| DestroyError)
    }
}
