//! The request object: the rendezvous point a blocked sender, receiver, or
//! select call parks on, and the mechanism a server-side thread uses to wake
//! it.
//!
//! A `Request` is shared (`Arc`) between every queue entry that references it
//! and the thread that is waiting on it. `Blocking` requests sit on exactly
//! one channel's queue; `Select` requests may sit on several simultaneously,
//! one queue entry per case, each carrying the index of the case it serves.
//! Exactly one of those entries is ever allowed to commit the request: the
//! `valid` flag, always flipped under `state`'s lock, is what arbitrates that.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use log::trace;

use crate::buffer::Message;
use crate::raw::{Direction, RawChannel};

/// A single send or receive slot: a payload cell shared between a `Request`
/// and whatever public-facing handle (a blocking call's local state, or a
/// `SelectCase`) needs to read the result back out once it is served.
pub(crate) struct Slot {
    raw: Arc<RawChannel>,
    direction: Direction,
    payload: Mutex<Option<Message>>,
}

impl Slot {
    pub(crate) fn new_send(raw: Arc<RawChannel>, value: Message) -> Arc<Slot> {
        Arc::new(Slot {
            raw,
            direction: Direction::Send,
            payload: Mutex::new(Some(value)),
        })
    }

    pub(crate) fn new_recv(raw: Arc<RawChannel>) -> Arc<Slot> {
        Arc::new(Slot {
            raw,
            direction: Direction::Recv,
            payload: Mutex::new(None),
        })
    }

    pub(crate) fn raw(&self) -> &Arc<RawChannel> {
        &self.raw
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    /// Removes this slot's payload. Used both to hand a send case's value off
    /// to the channel, and to pull a probe value back out if a rendezvous
    /// attempt turned out not to have a receiver after all.
    pub(crate) fn take_payload(&self) -> Message {
        self.payload
            .lock()
            .expect("slot lock poisoned")
            .take()
            .expect("slot payload already taken")
    }

    pub(crate) fn put_payload(&self, msg: Message) {
        *self.payload.lock().expect("slot lock poisoned") = Some(msg);
    }

    /// Retrieves whatever ended up in the slot after the request committed.
    /// `None` if this case never got served (e.g. a send case, or a select
    /// case that lost the race).
    pub(crate) fn take_result(&self) -> Option<Message> {
        self.payload.lock().expect("slot lock poisoned").take()
    }
}

pub(crate) enum RequestData {
    Blocking(Arc<Slot>),
    Select(Vec<Arc<Slot>>),
}

impl RequestData {
    pub(crate) fn slot_for(&self, index: usize) -> &Arc<Slot> {
        match self {
            RequestData::Blocking(slot) => slot,
            RequestData::Select(slots) => &slots[index],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Closed,
}

pub(crate) struct RequestState {
    pub(crate) valid: bool,
    pub(crate) refcount: usize,
    pub(crate) ret: Option<Outcome>,
    pub(crate) selected_index: usize,
}

pub(crate) struct Request {
    pub(crate) data: RequestData,
    state: Mutex<RequestState>,
    wake: Condvar,
}

impl Request {
    pub(crate) fn new_blocking(slot: Arc<Slot>) -> Arc<Request> {
        Arc::new(Request {
            data: RequestData::Blocking(slot),
            state: Mutex::new(RequestState {
                valid: true,
                refcount: 1,
                ret: None,
                selected_index: 0,
            }),
            wake: Condvar::new(),
        })
    }

    pub(crate) fn new_select(slots: Vec<Arc<Slot>>) -> Arc<Request> {
        Arc::new(Request {
            data: RequestData::Select(slots),
            state: Mutex::new(RequestState {
                valid: true,
                refcount: 1,
                ret: None,
                selected_index: 0,
            }),
            wake: Condvar::new(),
        })
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().expect("request lock poisoned")
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.lock_state().valid
    }

    pub(crate) fn notify(&self) {
        self.wake.notify_one();
    }

    /// Registers one more queue entry pointing at this request.
    pub(crate) fn acquire(&self) {
        self.lock_state().refcount += 1;
    }

    /// Releases one reference: a discarded stale queue entry, or the waiting
    /// thread's own reference once it has harvested `ret`.
    ///
    /// Implements orphan detection: if this drops `refcount` to 1 while the
    /// request is still valid, every channel that held an entry for it has
    /// now gone away (closed or served something else), so the one remaining
    /// holder, the waiter itself, is woken with `Closed`.
    pub(crate) fn release(&self) {
        let mut guard = self.lock_state();
        guard.refcount -= 1;
        if guard.refcount == 1 && guard.valid {
            guard.valid = false;
            guard.ret = Some(Outcome::Closed);
            guard.selected_index = 0;
            drop(guard);
            trace!("request orphaned: all channels holding it are gone");
            self.notify();
        }
    }

    /// Blocks until some server thread (or this same thread, for an
    /// immediately-feasible select registration) commits this request, then
    /// returns its outcome and which case won.
    pub(crate) fn wait(&self) -> (Outcome, usize) {
        let mut guard = self.lock_state();
        while guard.valid {
            guard = self.wake.wait(guard).expect("request lock poisoned");
        }
        let outcome = guard.ret.take().expect("committed request missing its outcome");
        (outcome, guard.selected_index)
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        debug_assert_eq!(
            self.state.get_mut().refcount,
            0,
            "request dropped with outstanding references"
        );
    }
}

/// One channel's queue holds these: which case (`index`, always 0 for a
/// plain blocking call) a parked `Request` is waiting on that channel for.
pub(crate) struct QueueEntry {
    pub(crate) index: usize,
    pub(crate) request: Arc<Request>,
}
