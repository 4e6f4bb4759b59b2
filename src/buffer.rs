//! The channel's message ring buffer.
//!
//! Every access happens with the owning channel's lock already held.

use std::collections::VecDeque;

/// Opaque, type-erased message handle. The typed `Channel<T>` boxes values of
/// `T` into this before they ever reach the buffer or the wait queues, and
/// downcasts them back out on the way to a caller.
pub(crate) type Message = Box<dyn std::any::Any + Send>;

/// A bounded FIFO of opaque message slots.
pub(crate) struct RingBuffer {
    capacity: usize,
    slots: VecDeque<Message>,
}

impl RingBuffer {
    pub(crate) fn with_capacity(capacity: usize) -> RingBuffer {
        RingBuffer {
            capacity,
            slots: VecDeque::with_capacity(capacity),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Inserts at the tail. Caller must have checked `!is_full()`.
    pub(crate) fn push(&mut self, value: Message) {
        debug_assert!(!self.is_full(), "push on a full ring buffer");
        self.slots.push_back(value);
    }

    /// Removes from the head. Caller must have checked `!is_empty()`.
    pub(crate) fn pop(&mut self) -> Message {
        self.slots
            .pop_front()
            .expect("pop on an empty ring buffer")
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn respects_capacity() {
        let mut buf = RingBuffer::with_capacity(2);
        assert!(buf.is_empty());
        buf.push(Box::new(1u8));
        buf.push(Box::new(2u8));
        assert!(buf.is_full());
    }

    #[test]
    fn fifo_order() {
        let mut buf = RingBuffer::with_capacity(3);
        buf.push(Box::new(1u8));
        buf.push(Box::new(2u8));
        buf.push(Box::new(3u8));
        assert_eq!(*buf.pop().downcast::<u8>().unwrap(), 1);
        assert_eq!(*buf.pop().downcast::<u8>().unwrap(), 2);
        assert_eq!(*buf.pop().downcast::<u8>().unwrap(), 3);
        assert!(buf.is_empty());
    }

    #[test]
    fn zero_capacity_is_always_full_and_empty() {
        let buf = RingBuffer::with_capacity(0);
        assert!(buf.is_full());
        assert!(buf.is_empty());
    }
}
