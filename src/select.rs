//! Multi-way `select` across channels of different message types.
//!
//! Each `SelectCase` type-erases its payload into the same `Message =
//! Box<dyn Any + Send>` the rest of the channel core uses, and exposes a
//! typed constructor (`send`/`recv`) and a typed accessor (`into_recv`) at
//! the boundary.

use std::sync::Arc;

use log::trace;

use crate::channel::Channel;
use crate::error::SelectError;
use crate::raw::{Direction, RegisterOutcome};
use crate::request::{Outcome, Request, Slot};

/// One arm of a `select` call: either a value offered for send, or an intent
/// to receive, on a specific channel.
pub struct SelectCase {
    slot: Arc<Slot>,
}

impl SelectCase {
    /// Offers `value` for send on `channel` as one arm of a `select`.
    pub fn send<T: Send + 'static>(channel: &Channel<T>, value: T) -> SelectCase {
        SelectCase {
            slot: Slot::new_send(channel.raw().clone(), Box::new(value)),
        }
    }

    /// Offers to receive from `channel` as one arm of a `select`.
    pub fn recv<T: Send + 'static>(channel: &Channel<T>) -> SelectCase {
        SelectCase {
            slot: Slot::new_recv(channel.raw().clone()),
        }
    }

    /// After `select` returns, pulls the received value out of this case.
    /// `None` if this case was a send, or didn't win.
    pub fn into_recv<T: Send + 'static>(self) -> Option<T> {
        self.slot
            .take_result()
            .map(|msg| *msg.downcast::<T>().expect("select case type mismatch"))
    }
}

/// Offers every case in `cases` simultaneously and commits to whichever one
/// first becomes feasible, blocking if none are. Returns the index of the
/// winning case.
///
/// If the winning case's channel was closed rather than genuinely served,
/// returns `Err(SelectError(index))` carrying that same index.
pub fn select(cases: &mut [SelectCase]) -> Result<usize, SelectError> {
    assert!(!cases.is_empty(), "select requires at least one case");

    let slots: Vec<Arc<Slot>> = cases.iter().map(|c| c.slot.clone()).collect();
    let req = Request::new_select(slots);

    for (i, case) in cases.iter().enumerate() {
        if !req.is_valid() {
            break;
        }
        let raw = case.slot.raw().clone();
        let outcome = match case.slot.direction() {
            Direction::Send => raw.register_send(&req, i),
            Direction::Recv => raw.register_recv(&req, i),
        };
        match outcome {
            RegisterOutcome::Committed(Outcome::Success) => {
                trace!("select: case {} committed immediately", i);
                req.release();
                return Ok(i);
            }
            RegisterOutcome::Committed(Outcome::Closed) => {
                trace!("select: case {} closed immediately", i);
                req.release();
                return Err(SelectError(i));
            }
            RegisterOutcome::WouldBlock => continue,
            RegisterOutcome::AlreadyResolved => break,
        }
    }

    trace!("select: waiting");
    let (outcome, index) = req.wait();
    req.release();
    match outcome {
        Outcome::Success => Ok(index),
        Outcome::Closed => Err(SelectError(index)),
    }
}
