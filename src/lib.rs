//! ### millrace
//!
//! A bounded, typed channel for coordinating threads, plus a multi-way `select`
//! that offers a set of send/receive intents across distinct channels and
//! commits to exactly one as soon as any becomes feasible.
//!
//! The channel itself is a single cloneable handle used from both ends (like a
//! Go channel), rather than a split sender/receiver pair: any clone can send,
//! receive, or close.
//!
//! ```
//! use millrace::Channel;
//!
//! let c = Channel::bounded(2);
//! c.send(1).unwrap();
//! c.send(2).unwrap();
//! assert_eq!(c.recv().unwrap(), 1);
//! assert_eq!(c.recv().unwrap(), 2);
//! ```

mod buffer;
mod queue;
mod request;
mod raw;

pub mod channel;
pub mod error;
pub mod select;

pub use channel::Channel;
pub use error::{CloseError, DestroyError, RecvError, SelectError, SendError, TryRecvError, TrySendError};
pub use select::{select, SelectCase};
