//! Channel bridge between the controller and the native module.
//!
//! - **protocol**: wire types (outbound posts, replies, events)
//! - **codec**: JSON framing codec for AsyncRead/AsyncWrite
//! - **transport**: the module-process channel and its spawn seam

pub mod codec;
pub mod protocol;
pub mod transport;
