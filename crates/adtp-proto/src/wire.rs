//! Message structs with the published field-number layout.
//!
//! Fields the schema marks required are required for encoding only; decoding
//! tolerates their absence and yields zero values, so malformed input
//! surfaces as an integrity failure upstream rather than a codec error.

/// A registration record binding an address to a location and key.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrackerRegister {
    /// Owner's public-key fingerprint, rendered as a string.
    #[prost(string, tag = "1")]
    pub address: String,
    /// Byte-encoded public encryption key.
    #[prost(bytes = "vec", tag = "2")]
    pub encryption_key: Vec<u8>,
    /// host:port where the owner's mail server listens.
    #[prost(string, tag = "3")]
    pub location: String,
    /// Epoch seconds; informational, not enforced server-side.
    #[prost(uint64, tag = "4")]
    pub expires: u64,
    #[prost(message, repeated, tag = "5")]
    pub redirect: Vec<Redirect>,
    /// Optional human-readable alias.
    #[prost(string, tag = "6")]
    pub username: String,
}

/// A lookup by address or alias. Exactly one of `address`/`username` is
/// consulted server-side: an empty `username` routes to address lookup.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrackerQuery {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(string, tag = "2")]
    pub username: String,
    /// Reserved; defined by the schema but never consulted.
    #[prost(bool, tag = "3")]
    pub need_key: bool,
}

/// A per-lookup-type pointer from a registered address to another address.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Redirect {
    /// Lookup type this entry applies to, or `*` for any.
    #[prost(string, tag = "1")]
    pub types: String,
    #[prost(string, tag = "2")]
    pub alias: String,
    /// Fingerprint the redirect must resolve to.
    #[prost(string, tag = "3")]
    pub address: String,
}

/// Server error taxonomy carried on `ERROR`-typed envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ErrorCode {
    Unspecified = 0,
    /// Read, decrypt, reconstruct, or decode failure.
    UnexpectedError = 1,
    /// Signature verification failed, or the signed identity does not
    /// match the payload it claims to cover.
    InvalidSignature = 2,
    /// No record for the queried address or alias.
    AddressNotFound = 3,
    /// Failure counter-signing or packing a response.
    InternalError = 4,
}

/// Body of an `ERROR`-typed envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorBody {
    #[prost(enumeration = "ErrorCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}


/// One signature over a signed payload: the signer's Ed25519 verifying key
/// and the signature bytes. Counter-signatures append further proofs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignatureProof {
    #[prost(bytes = "vec", tag = "1")]
    pub sign_pub: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// The signed inner message: payload bytes, type code, header fields, and
/// one or more signature proofs over the canonical transcript of the rest.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedPayload {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
    #[prost(string, tag = "2")]
    pub type_code: String,
    /// Sender fingerprint. The first proof's key must derive this.
    #[prost(string, tag = "3")]
    pub from: String,
    /// Recipient fingerprint; empty for the anonymous placeholder.
    #[prost(string, tag = "4")]
    pub to: String,
    /// Epoch seconds at signing time.
    #[prost(uint64, tag = "5")]
    pub timestamp: u64,
    #[prost(message, repeated, tag = "6")]
    pub proofs: Vec<SignatureProof>,
}

/// How the envelope body is packed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EnvelopeMode {
    /// `body` is an encoded `SignedPayload` in the clear.
    Plain = 0,
    /// `body` is an encoded `SignedPayload` sealed to the recipient's
    /// X25519 key; `ephemeral_kex_pub` and `nonce` are set.
    Sealed = 1,
}

/// The outer addressed carrier written to the wire, one per frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    /// Recipient fingerprint; only this identifies the recipient, a
    /// property the tracker's query framing depends on.
    #[prost(string, tag = "1")]
    pub to: String,
    #[prost(enumeration = "EnvelopeMode", tag = "2")]
    pub mode: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub body: Vec<u8>,
    /// Sender's ephemeral X25519 public key (sealed mode only).
    #[prost(bytes = "vec", tag = "4")]
    pub ephemeral_kex_pub: Vec<u8>,
    /// Random 24-byte salt binding derived keys to this envelope (sealed
    /// mode only).
    #[prost(bytes = "vec", tag = "5")]
    pub nonce: Vec<u8>,
}


#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn register_round_trip() {
        let reg = TrackerRegister {
            address: "abcdef".into(),
            encryption_key: vec![1, 2, 3],
            location: "mail.example.com:2048".into(),
            expires: 1_700_000_000,
            redirect: vec![Redirect {
                types: "DEFAULT".into(),
                alias: "other".into(),
                address: "fedcba".into(),
            }],
            username: "hunter".into(),
        };

        let bytes = reg.encode_to_vec();
        let decoded = TrackerRegister::decode(&bytes[..]).unwrap();
        assert_eq!(decoded, reg);
    }

    #[test]
    fn register_without_optional_fields() {
        let reg = TrackerRegister {
            address: "abcdef".into(),
            encryption_key: vec![9],
            location: "host:1".into(),
            expires: 1,
            redirect: Vec::new(),
            username: String::new(),
        };

        let bytes = reg.encode_to_vec();
        let decoded = TrackerRegister::decode(&bytes[..]).unwrap();
        assert_eq!(decoded, reg);
        assert!(decoded.username.is_empty());
        assert!(decoded.redirect.is_empty());
    }

    #[test]
    fn query_round_trip() {
        for (address, username, need_key) in [
            ("abc", "", false),
            ("", "hunter", false),
            ("abc", "", true),
        ] {
            let q = TrackerQuery {
                address: address.into(),
                username: username.into(),
                need_key,
            };
            let decoded = TrackerQuery::decode(&q.encode_to_vec()[..]).unwrap();
            assert_eq!(decoded, q);
        }
    }

    #[test]
    fn decode_empty_yields_zero_values() {
        // Required-for-encoding fields decode to defaults when absent so
        // integrity checks can reject the message upstream.
        let decoded = TrackerRegister::decode(&b""[..]).unwrap();
        assert_eq!(decoded.address, "");
        assert_eq!(decoded.expires, 0);

        let decoded = TrackerQuery::decode(&b""[..]).unwrap();
        assert_eq!(decoded.address, "");
        assert!(!decoded.need_key);
    }

    #[test]
    fn error_body_code_mapping() {
        let body = ErrorBody {
            code: ErrorCode::AddressNotFound as i32,
            message: "couldn't find that address".into(),
        };
        assert_eq!(body.code(), ErrorCode::AddressNotFound);

        let unknown = ErrorBody {
            code: 99,
            message: String::new(),
        };
        assert_eq!(unknown.code(), ErrorCode::Unspecified);
    }

    #[test]
    fn envelope_mode_mapping() {
        let env = Envelope {
            to: "abc".into(),
            mode: EnvelopeMode::Sealed as i32,
            body: vec![1],
            ephemeral_kex_pub: vec![2; 32],
            nonce: vec![3; 24],
        };
        assert_eq!(env.mode(), EnvelopeMode::Sealed);

        let decoded = Envelope::decode(&env.encode_to_vec()[..]).unwrap();
        assert_eq!(decoded, env);
    }
}
