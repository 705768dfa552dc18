//! adtp-proto: wire format definitions for the AirDispatch tracker protocol.
//!
//! The tracker speaks three payload types over signed envelopes: a
//! registration record, a query, and a typed error. Payloads are
//! field-numbered binary messages; the envelope tags each payload with an
//! opaque type code string.

pub mod wire;

pub use wire::{
    Envelope, EnvelopeMode, ErrorBody, ErrorCode, Redirect, SignatureProof, SignedPayload,
    TrackerQuery, TrackerRegister,
};

/// Type code carried on envelopes holding a `TrackerQuery`.
pub const QUERY_CODE: &str = "QUERY";

/// Type code carried on envelopes holding a `TrackerRegister`.
pub const REGISTRATION_CODE: &str = "REGISTRATION";

/// Type code carried on envelopes holding an `ErrorBody`.
pub const ERROR_CODE: &str = "ERROR";

/// Lookup type tag for ordinary resolution.
pub const LOOKUP_TYPE_DEFAULT: &str = "DEFAULT";

/// Wildcard lookup type matching any class of lookup in redirect routing.
pub const LOOKUP_TYPE_WILDCARD: &str = "*";
