//! adtp-net: framing, SRV discovery, and one-shot envelope transport.
//!
//! One TCP connection serves one request/response pair; there is no
//! keepalive and teardown is `Close`.

pub mod conn;
pub mod framing;

pub use conn::{connect, recv_envelope, resolve_location, send_envelope, DEFAULT_TRACKER_PORT};
pub use framing::{FramingError, MAX_ENVELOPE_FRAME_SIZE};
