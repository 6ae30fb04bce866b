//! Producer/consumer byte buffering for the streaming demultiplexer.

pub mod ring;
pub mod stream;

pub use ring::ByteRing;
pub use stream::{DequeueGuard, InputFn, StreamBuffer};
