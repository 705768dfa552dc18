//! adtp-crypto: identities, addresses, and signed envelopes.
//!
//! An identity holds an Ed25519 signing key and an X25519 key agreement
//! key; its address is the hex fingerprint of the signing key. Envelopes
//! carry a signed payload either in the clear or sealed to the recipient's
//! key, and support counter-signatures so a tracker can attest to a record
//! it stored.

pub mod address;
pub mod envelope;
pub mod hash;
pub mod identity;
pub mod transcript;

pub use address::Address;
pub use envelope::{
    open_envelope, EnvelopeError, Header, RemoteError, SignedMessage, TIMESTAMP_WINDOW_SECS,
};
pub use identity::{verify_signature, Identity, IdentityError};
