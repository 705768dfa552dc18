//! Client-side error kinds. Server failures travel as typed error
//! envelopes and surface here as [`RemoteError`].

use adtp_crypto::{EnvelopeError, RemoteError};
use adtp_net::FramingError;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The fan-out deadline elapsed with trackers still outstanding.
    #[error("all trackers timed out")]
    Timeout,

    /// Every tracker answered, none successfully.
    #[error("unable to find address in trackers")]
    ExhaustedAllTrackers,

    /// The tracker replied with something other than a registration.
    #[error("got the wrong response from tracker")]
    ProtocolViolation,

    /// The redirect handler resolved to a different fingerprint than the
    /// redirect entry names.
    #[error("redirect resolved to a different fingerprint")]
    RedirectFingerprintMismatch,

    /// The registered encryption key could not be decoded.
    #[error("unable to decode registered encryption key")]
    BadKey,

    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),

    #[error("framing: {0}")]
    Framing(#[from] FramingError),

    #[error("envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    /// A typed error envelope from the far side.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
