//! The type-erased channel core.
//!
//! `RawChannel` holds the buffer and the two wait queues behind one mutex and
//! implements every primitive operation (`try_send`/`try_recv`, the blocking
//! registration paths, `close`) against that lock. `Channel<T>` (in
//! `channel.rs`) is a thin typed veneer boxing/downcasting `T` around this.
//!
//! Locking discipline: the channel lock is always acquired before any
//! request lock, and at most one channel lock is ever held by a single
//! thread at a time. A request's own lock is never held across a call into
//! a serve-capable primitive, since that primitive may need to lock a
//! different request entirely (the peer it ends up serving); request locks
//! are only ever taken one at a time, just long enough to read or write that
//! request's fields.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace};

use crate::buffer::{Message, RingBuffer};
use crate::queue::WaitQueue;
use crate::request::{Outcome, QueueEntry, Request, Slot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Send,
    Recv,
}

pub(crate) enum SendAttempt {
    Success,
    Full(Message),
    Closed(Message),
}

pub(crate) enum RecvAttempt {
    Success(Message),
    Empty,
    Closed,
}

pub(crate) enum RegisterOutcome {
    Committed(Outcome),
    WouldBlock,
    AlreadyResolved,
}

/// Outcome of a blocking send's first, non-parking attempt.
pub(crate) enum BlockingSendResult {
    Done(Result<(), Message>),
    Pending(Arc<Request>, Arc<Slot>),
}

pub(crate) enum BlockingRecvResult {
    Done(Result<Message, ()>),
    Pending(Arc<Request>, Arc<Slot>),
}

struct ChannelState {
    buffer: RingBuffer,
    send_waiters: WaitQueue,
    recv_waiters: WaitQueue,
    closed: bool,
}

impl ChannelState {
    /// Serves the buffer's oldest message to the next valid receiver,
    /// discarding stale (already-resolved) entries it finds along the way.
    fn serve_recv_from_buffer(&mut self) {
        loop {
            let entry = match self.recv_waiters.pop_front() {
                Some(e) => e,
                None => return,
            };
            let mut guard = entry.request.lock_state();
            if !guard.valid {
                drop(guard);
                entry.request.release();
                continue;
            }
            let slot = entry.request.data.slot_for(entry.index).clone();
            let msg = self.buffer.pop();
            slot.put_payload(msg);
            guard.valid = false;
            guard.ret = Some(Outcome::Success);
            guard.selected_index = entry.index;
            drop(guard);
            entry.request.notify();
            entry.request.release();
            return;
        }
    }

    /// Feeds a waiting sender's payload into freshly-available buffer space.
    fn serve_send_into_buffer(&mut self) {
        loop {
            let entry = match self.send_waiters.pop_front() {
                Some(e) => e,
                None => return,
            };
            let mut guard = entry.request.lock_state();
            if !guard.valid {
                drop(guard);
                entry.request.release();
                continue;
            }
            let slot = entry.request.data.slot_for(entry.index).clone();
            let msg = slot.take_payload();
            self.buffer.push(msg);
            guard.valid = false;
            guard.ret = Some(Outcome::Success);
            guard.selected_index = entry.index;
            drop(guard);
            entry.request.notify();
            entry.request.release();
            return;
        }
    }

    /// Rendezvous hand-off: delivers `msg` straight to the next valid
    /// receiver with no buffer involved. Hands the message back if there is
    /// no receiver waiting.
    fn serve_recv_direct(&mut self, msg: Message) -> Result<(), Message> {
        loop {
            let entry = match self.recv_waiters.pop_front() {
                Some(e) => e,
                None => return Err(msg),
            };
            let mut guard = entry.request.lock_state();
            if !guard.valid {
                drop(guard);
                entry.request.release();
                continue;
            }
            let slot = entry.request.data.slot_for(entry.index).clone();
            slot.put_payload(msg);
            guard.valid = false;
            guard.ret = Some(Outcome::Success);
            guard.selected_index = entry.index;
            drop(guard);
            entry.request.notify();
            entry.request.release();
            return Ok(());
        }
    }

    /// Rendezvous hand-off, receive side: pulls a payload straight out of the
    /// next valid waiting sender.
    fn serve_send_direct(&mut self) -> Option<Message> {
        loop {
            let entry = match self.send_waiters.pop_front() {
                Some(e) => e,
                None => return None,
            };
            let mut guard = entry.request.lock_state();
            if !guard.valid {
                drop(guard);
                entry.request.release();
                continue;
            }
            let slot = entry.request.data.slot_for(entry.index).clone();
            let msg = slot.take_payload();
            guard.valid = false;
            guard.ret = Some(Outcome::Success);
            guard.selected_index = entry.index;
            drop(guard);
            entry.request.notify();
            entry.request.release();
            return Some(msg);
        }
    }

    /// Drains one queue at close time: every still-valid waiter is woken
    /// with `Closed`, no transfer attempted.
    fn drain_closed(queue: &mut WaitQueue) {
        while let Some(entry) = queue.pop_front() {
            let mut guard = entry.request.lock_state();
            if guard.valid {
                guard.valid = false;
                guard.ret = Some(Outcome::Closed);
                guard.selected_index = entry.index;
                drop(guard);
                entry.request.notify();
            } else {
                drop(guard);
            }
            entry.request.release();
        }
    }
}

pub(crate) struct RawChannel {
    capacity: usize,
    state: Mutex<ChannelState>,
}

impl RawChannel {
    pub(crate) fn new(capacity: usize) -> Arc<RawChannel> {
        debug!("channel created: capacity={}", capacity);
        Arc::new(RawChannel {
            capacity,
            state: Mutex::new(ChannelState {
                buffer: RingBuffer::with_capacity(capacity),
                send_waiters: WaitQueue::new(),
                recv_waiters: WaitQueue::new(),
                closed: false,
            }),
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().expect("channel lock poisoned")
    }

    fn try_send_locked(&self, state: &mut ChannelState, value: Message) -> SendAttempt {
        if state.closed {
            return SendAttempt::Closed(value);
        }
        if self.capacity == 0 {
            return match state.serve_recv_direct(value) {
                Ok(()) => SendAttempt::Success,
                Err(value) => SendAttempt::Full(value),
            };
        }
        if state.buffer.is_full() {
            return SendAttempt::Full(value);
        }
        state.buffer.push(value);
        state.serve_recv_from_buffer();
        SendAttempt::Success
    }

    fn try_recv_locked(&self, state: &mut ChannelState) -> RecvAttempt {
        if state.closed {
            return RecvAttempt::Closed;
        }
        if self.capacity == 0 {
            return match state.serve_send_direct() {
                Some(msg) => RecvAttempt::Success(msg),
                None => RecvAttempt::Empty,
            };
        }
        if state.buffer.is_empty() {
            return RecvAttempt::Empty;
        }
        let msg = state.buffer.pop();
        state.serve_send_into_buffer();
        RecvAttempt::Success(msg)
    }

    pub(crate) fn try_send(&self, value: Message) -> SendAttempt {
        let mut state = self.lock_state();
        trace!("try_send");
        self.try_send_locked(&mut state, value)
    }

    pub(crate) fn try_recv(&self) -> RecvAttempt {
        let mut state = self.lock_state();
        trace!("try_recv");
        self.try_recv_locked(&mut state)
    }

    /// One continuous critical section: try immediately, and if that would
    /// block, park a blocking request on this channel's send queue before
    /// releasing the lock.
    pub(crate) fn send(self: &Arc<Self>, value: Message) -> BlockingSendResult {
        let mut state = self.lock_state();
        trace!("send: attempting");
        match self.try_send_locked(&mut state, value) {
            SendAttempt::Success => BlockingSendResult::Done(Ok(())),
            SendAttempt::Closed(msg) => BlockingSendResult::Done(Err(msg)),
            SendAttempt::Full(msg) => {
                let slot = Slot::new_send(self.clone(), msg);
                let req = Request::new_blocking(slot.clone());
                req.acquire();
                state.send_waiters.push_back(QueueEntry { index: 0, request: req.clone() });
                trace!("send: parked");
                BlockingSendResult::Pending(req, slot)
            }
        }
    }

    pub(crate) fn recv(self: &Arc<Self>) -> BlockingRecvResult {
        let mut state = self.lock_state();
        trace!("recv: attempting");
        match self.try_recv_locked(&mut state) {
            RecvAttempt::Success(msg) => BlockingRecvResult::Done(Ok(msg)),
            RecvAttempt::Closed => BlockingRecvResult::Done(Err(())),
            RecvAttempt::Empty => {
                let slot = Slot::new_recv(self.clone());
                let req = Request::new_blocking(slot.clone());
                req.acquire();
                state.recv_waiters.push_back(QueueEntry { index: 0, request: req.clone() });
                trace!("recv: parked");
                BlockingRecvResult::Pending(req, slot)
            }
        }
    }

    /// A `select` registration attempt on this channel, for case `index` of
    /// `req`. `req`'s lock is only ever held long enough to read or write its
    /// fields, never across a call into a serve-capable primitive: those
    /// primitives lock a *different* request, whichever one they end up
    /// serving.
    pub(crate) fn register_send(&self, req: &Arc<Request>, index: usize) -> RegisterOutcome {
        let mut state = self.lock_state();
        if !req.lock_state().valid {
            return RegisterOutcome::AlreadyResolved;
        }
        if state.closed {
            let mut guard = req.lock_state();
            guard.valid = false;
            guard.ret = Some(Outcome::Closed);
            guard.selected_index = index;
            drop(guard);
            req.notify();
            return RegisterOutcome::Committed(Outcome::Closed);
        }
        let slot = req.data.slot_for(index).clone();
        if self.capacity == 0 {
            let value = slot.take_payload();
            match state.serve_recv_direct(value) {
                Ok(()) => {
                    let mut guard = req.lock_state();
                    guard.valid = false;
                    guard.ret = Some(Outcome::Success);
                    guard.selected_index = index;
                    drop(guard);
                    req.notify();
                    RegisterOutcome::Committed(Outcome::Success)
                }
                Err(value) => {
                    slot.put_payload(value);
                    req.lock_state().refcount += 1;
                    state.send_waiters.push_back(QueueEntry { index, request: req.clone() });
                    RegisterOutcome::WouldBlock
                }
            }
        } else if state.buffer.is_full() {
            req.lock_state().refcount += 1;
            state.send_waiters.push_back(QueueEntry { index, request: req.clone() });
            RegisterOutcome::WouldBlock
        } else {
            let value = slot.take_payload();
            state.buffer.push(value);
            let mut guard = req.lock_state();
            guard.valid = false;
            guard.ret = Some(Outcome::Success);
            guard.selected_index = index;
            drop(guard);
            req.notify();
            state.serve_recv_from_buffer();
            RegisterOutcome::Committed(Outcome::Success)
        }
    }

    pub(crate) fn register_recv(&self, req: &Arc<Request>, index: usize) -> RegisterOutcome {
        let mut state = self.lock_state();
        if !req.lock_state().valid {
            return RegisterOutcome::AlreadyResolved;
        }
        if state.closed {
            let mut guard = req.lock_state();
            guard.valid = false;
            guard.ret = Some(Outcome::Closed);
            guard.selected_index = index;
            drop(guard);
            req.notify();
            return RegisterOutcome::Committed(Outcome::Closed);
        }
        let slot = req.data.slot_for(index).clone();
        if self.capacity == 0 {
            match state.serve_send_direct() {
                Some(msg) => {
                    slot.put_payload(msg);
                    let mut guard = req.lock_state();
                    guard.valid = false;
                    guard.ret = Some(Outcome::Success);
                    guard.selected_index = index;
                    drop(guard);
                    req.notify();
                    RegisterOutcome::Committed(Outcome::Success)
                }
                None => {
                    req.lock_state().refcount += 1;
                    state.recv_waiters.push_back(QueueEntry { index, request: req.clone() });
                    RegisterOutcome::WouldBlock
                }
            }
        } else if state.buffer.is_empty() {
            req.lock_state().refcount += 1;
            state.recv_waiters.push_back(QueueEntry { index, request: req.clone() });
            RegisterOutcome::WouldBlock
        } else {
            let msg = state.buffer.pop();
            slot.put_payload(msg);
            let mut guard = req.lock_state();
            guard.valid = false;
            guard.ret = Some(Outcome::Success);
            guard.selected_index = index;
            drop(guard);
            req.notify();
            state.serve_send_into_buffer();
            RegisterOutcome::Committed(Outcome::Success)
        }
    }

    /// Closes the channel: every queued waiter, on either side, is woken
    /// with `Closed`. Already-buffered messages are left in place, but a
    /// subsequent `recv` will still report `Closed` rather than draining
    /// them.
    pub(crate) fn close(&self) -> Result<(), ()> {
        let mut state = self.lock_state();
        if state.closed {
            return Err(());
        }
        state.closed = true;
        debug!("channel closed");
        ChannelState::drain_closed(&mut state.recv_waiters);
        ChannelState::drain_closed(&mut state.send_waiters);
        Ok(())
    }

    /// `destroy()` is largely vestigial in Rust (`Drop` reclaims the channel
    /// regardless), but keeps parity with the source API's contract: it is
    /// only valid to call once the channel has been closed.
    pub(crate) fn check_destroyable(&self) -> Result<(), ()> {
        let state = self.lock_state();
        if state.closed {
            Ok(())
        } else {
            Err(())
        }
    }
}
