//! Signed messages and the addressed envelopes that carry them.
//!
//! A `SignedMessage` binds a payload, type code, and header under one or
//! more Ed25519 signatures over a canonical transcript. Each signature
//! verifies independently, so a tracker can counter-sign a stored record
//! and a reader can check either attestation on its own.
//!
//! The outer carrier is either plain (the tracker protocol's mode: a
//! querying client does not know the queried party's key) or sealed to the
//! recipient's X25519 key with an HPKE-style sealed box.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use prost::Message;
use rand_core::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey};

use adtp_proto::{wire, Envelope, EnvelopeMode, ErrorBody, ErrorCode, SignedPayload};

use crate::address::Address;
use crate::hash::fingerprint;
use crate::identity::{verify_signature, Identity};
use crate::transcript::Transcript;

/// Accepted clock skew, in seconds, when reconstructing with timestamp
/// verification. Bounds the replay window for live requests.
pub const TIMESTAMP_WINDOW_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("signature verification failed")]
    BadSignature,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("malformed envelope")]
    MalformedEnvelope,
    #[error("timestamp {timestamp} outside accepted window at {now}")]
    StaleTimestamp { timestamp: u64, now: u64 },
    #[error("recipient has no encryption key to seal to")]
    NoRecipientKey,
}

/// A typed error received from the far side of an exchange.
#[derive(Clone, Debug)]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
    /// The responder's stated address.
    pub address: String,
}

impl RemoteError {
    /// Materialise a remote error from an `ERROR`-typed payload and its
    /// header. A payload that fails to decode still yields a remote error,
    /// with an unspecified code.
    pub fn from_payload(payload: &[u8], header: &Header) -> Self {
        let body = ErrorBody::decode(payload).unwrap_or_default();
        Self {
            code: body.code(),
            message: body.message,
            address: header.from.clone(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} from {}: {}", self.code, self.address, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Envelope header fields covered by every signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub from: String,
    pub to: String,
    pub timestamp: u64,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A payload under one or more independent signatures.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedMessage {
    payload: Vec<u8>,
    type_code: String,
    header: Header,
    proofs: Vec<wire::SignatureProof>,
}

impl SignedMessage {
    /// Sign `payload` with `signer`, producing a message from the signer's
    /// address to `recipient`.
    pub fn sign(payload: Vec<u8>, type_code: &str, recipient: &Address, signer: &Identity) -> Self {
        let header = Header {
            from: signer.fingerprint().to_string(),
            to: recipient.fingerprint().to_string(),
            timestamp: now_unix(),
        };
        let mut message = Self {
            payload,
            type_code: type_code.to_string(),
            header,
            proofs: Vec::new(),
        };
        message.add_signature(signer);
        message
    }

    /// Append a counter-signature over the same signed content.
    pub fn add_signature(&mut self, signer: &Identity) {
        let digest = self.sign_data();
        self.proofs.push(wire::SignatureProof {
            sign_pub: signer.sign_pub().to_vec(),
            signature: signer.sign(&digest).to_vec(),
        });
    }

    fn sign_data(&self) -> [u8; 32] {
        let mut t = Transcript::new("adtp_signed_v1");
        t.append_bytes(1, &self.payload);
        t.append_str(2, &self.type_code);
        t.append_str(3, &self.header.from);
        t.append_str(4, &self.header.to);
        t.append_u64(5, self.header.timestamp);
        t.finalize()
    }

    /// Check every signature, and that the first signer's key derives the
    /// header's `from` fingerprint.
    pub fn verify(&self) -> bool {
        let Some(first) = self.proofs.first() else {
            return false;
        };
        if fingerprint(&first.sign_pub) != self.header.from {
            return false;
        }
        let digest = self.sign_data();
        self.proofs
            .iter()
            .all(|proof| verify_signature(&proof.sign_pub, &digest, &proof.signature).is_ok())
    }

    /// Reconstruct the message, rejecting timestamps outside the accepted
    /// window. Servers use this path to bound replays.
    pub fn reconstruct_with_timestamp(&self) -> Result<(&[u8], &str, &Header), EnvelopeError> {
        let now = now_unix();
        let timestamp = self.header.timestamp;
        if timestamp.saturating_add(TIMESTAMP_WINDOW_SECS) < now
            || timestamp > now.saturating_add(TIMESTAMP_WINDOW_SECS)
        {
            return Err(EnvelopeError::StaleTimestamp { timestamp, now });
        }
        Ok((&self.payload, &self.type_code, &self.header))
    }

    /// Reconstruct without timestamp verification. Lookup responses carry
    /// long-lived registrations and may be re-served hours after signing.
    pub fn reconstruct(&self) -> (&[u8], &str, &Header) {
        (&self.payload, &self.type_code, &self.header)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn type_code(&self) -> &str {
        &self.type_code
    }

    pub fn proofs(&self) -> &[wire::SignatureProof] {
        &self.proofs
    }

    fn to_wire(&self) -> SignedPayload {
        SignedPayload {
            payload: self.payload.clone(),
            type_code: self.type_code.clone(),
            from: self.header.from.clone(),
            to: self.header.to.clone(),
            timestamp: self.header.timestamp,
            proofs: self.proofs.clone(),
        }
    }

    fn from_wire(signed: SignedPayload) -> Self {
        Self {
            payload: signed.payload,
            type_code: signed.type_code,
            header: Header {
                from: signed.from,
                to: signed.to,
                timestamp: signed.timestamp,
            },
            proofs: signed.proofs,
        }
    }

    /// Wrap in a plain addressed envelope. Only the recipient's fingerprint
    /// identifies the recipient.
    pub fn address_to(&self, recipient: &Address) -> Envelope {
        Envelope {
            to: recipient.fingerprint().to_string(),
            mode: EnvelopeMode::Plain as i32,
            body: self.to_wire().encode_to_vec(),
            ephemeral_kex_pub: Vec::new(),
            nonce: Vec::new(),
        }
    }

    /// Seal to the recipient's X25519 key. Fails if the recipient address
    /// carries no encryption key.
    pub fn seal_to(&self, recipient: &Address) -> Result<Envelope, EnvelopeError> {
        let recipient_kex = recipient
            .encryption_key
            .ok_or(EnvelopeError::NoRecipientKey)?;

        let mut salt = [0u8; 24];
        getrandom::getrandom(&mut salt).map_err(|_| EnvelopeError::DecryptionFailed)?;

        let eph = EphemeralSecret::random_from_rng(OsRng);
        let eph_pub = X25519PublicKey::from(&eph);
        let shared = eph.diffie_hellman(&X25519PublicKey::from(recipient_kex));

        let (key, nonce) = kdf_key_nonce(shared.as_bytes(), &salt);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let to = recipient.fingerprint().to_string();
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &self.to_wire().encode_to_vec(),
                    aad: to.as_bytes(),
                },
            )
            .map_err(|_| EnvelopeError::DecryptionFailed)?;

        Ok(Envelope {
            to,
            mode: EnvelopeMode::Sealed as i32,
            body: ciphertext,
            ephemeral_kex_pub: eph_pub.as_bytes().to_vec(),
            nonce: salt.to_vec(),
        })
    }
}

fn kdf_key_nonce(shared_secret: &[u8; 32], salt: &[u8]) -> ([u8; 32], [u8; 12]) {
    let hk = Hkdf::<Sha256>::new(Some(salt), shared_secret);
    let mut key = [0u8; 32];
    hk.expand(b"adtp_env_key", &mut key).expect("output fits digest");
    let mut nonce = [0u8; 12];
    hk.expand(b"adtp_env_nonce", &mut nonce)
        .expect("output fits digest");
    (key, nonce)
}

/// Open an addressed envelope for `recipient`: unwrap a plain body, or
/// unseal a sealed one with the recipient's key agreement secret.
pub fn open_envelope(env: &Envelope, recipient: &Identity) -> Result<SignedMessage, EnvelopeError> {
    let body = match env.mode() {
        EnvelopeMode::Plain => env.body.clone(),
        EnvelopeMode::Sealed => {
            let eph_pub: [u8; 32] = env
                .ephemeral_kex_pub
                .as_slice()
                .try_into()
                .map_err(|_| EnvelopeError::MalformedEnvelope)?;
            let shared = recipient.key_exchange(&eph_pub);
            let (key, nonce) = kdf_key_nonce(&shared, &env.nonce);
            let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
            cipher
                .decrypt(
                    Nonce::from_slice(&nonce),
                    Payload {
                        msg: &env.body,
                        aad: env.to.as_bytes(),
                    },
                )
                .map_err(|_| EnvelopeError::DecryptionFailed)?
        }
    };

    let signed = SignedPayload::decode(&body[..]).map_err(|_| EnvelopeError::MalformedEnvelope)?;
    Ok(SignedMessage::from_wire(signed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adtp_proto::REGISTRATION_CODE;

    fn signed_to(recipient: &Address, signer: &Identity) -> SignedMessage {
        SignedMessage::sign(b"payload".to_vec(), REGISTRATION_CODE, recipient, signer)
    }

    #[test]
    fn sign_reconstruct_law() {
        let signer = Identity::generate();
        let recipient = Address::from_fingerprint("peer");
        let signed = signed_to(&recipient, &signer);

        assert!(signed.verify());
        let (payload, type_code, header) = signed.reconstruct();
        assert_eq!(payload, b"payload");
        assert_eq!(type_code, REGISTRATION_CODE);
        assert_eq!(header.from, signer.fingerprint());
        assert_eq!(header.to, "peer");
    }

    #[test]
    fn plain_round_trip() {
        let signer = Identity::generate();
        let tracker = Identity::generate();
        let signed = signed_to(tracker.address(), &signer);

        let env = signed.address_to(tracker.address());
        let opened = open_envelope(&env, &tracker).unwrap();
        assert_eq!(opened, signed);
        assert!(opened.verify());
    }

    #[test]
    fn sealed_round_trip() {
        let signer = Identity::generate();
        let tracker = Identity::generate();
        let signed = signed_to(tracker.address(), &signer);

        let env = signed.seal_to(tracker.address()).unwrap();
        let opened = open_envelope(&env, &tracker).unwrap();
        assert_eq!(opened, signed);
        assert!(opened.verify());
    }

    #[test]
    fn sealed_to_other_recipient_fails() {
        let signer = Identity::generate();
        let tracker = Identity::generate();
        let eavesdropper = Identity::generate();
        let signed = signed_to(tracker.address(), &signer);

        let env = signed.seal_to(tracker.address()).unwrap();
        assert!(matches!(
            open_envelope(&env, &eavesdropper),
            Err(EnvelopeError::DecryptionFailed)
        ));
    }

    #[test]
    fn seal_without_key_fails() {
        let signer = Identity::generate();
        let bare = Address::from_fingerprint("peer");
        let signed = signed_to(&bare, &signer);
        assert!(matches!(
            signed.seal_to(&bare),
            Err(EnvelopeError::NoRecipientKey)
        ));
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let signer = Identity::generate();
        let tracker = Identity::generate();
        let signed = signed_to(tracker.address(), &signer);

        let mut env = signed.address_to(tracker.address());
        let mut wire = SignedPayload::decode(&env.body[..]).unwrap();
        wire.payload = b"tampered".to_vec();
        env.body = wire.encode_to_vec();

        let opened = open_envelope(&env, &tracker).unwrap();
        assert!(!opened.verify());
    }

    #[test]
    fn spoofed_sender_fails_verification() {
        let signer = Identity::generate();
        let victim = Identity::generate();
        let tracker = Identity::generate();
        let signed = signed_to(tracker.address(), &signer);

        let mut env = signed.address_to(tracker.address());
        let mut wire = SignedPayload::decode(&env.body[..]).unwrap();
        wire.from = victim.fingerprint().to_string();
        env.body = wire.encode_to_vec();

        let opened = open_envelope(&env, &tracker).unwrap();
        assert!(!opened.verify());
    }

    #[test]
    fn counter_signature_verifies_independently() {
        let owner = Identity::generate();
        let tracker = Identity::generate();
        let mut signed = signed_to(tracker.address(), &owner);
        signed.add_signature(&tracker);

        assert!(signed.verify());
        assert_eq!(signed.proofs().len(), 2);

        // Each proof stands on its own over the same digest.
        let digest = signed.sign_data();
        for proof in signed.proofs() {
            assert!(verify_signature(&proof.sign_pub, &digest, &proof.signature).is_ok());
        }
    }

    #[test]
    fn unsigned_message_fails_verification() {
        let signer = Identity::generate();
        let tracker = Identity::generate();
        let mut signed = signed_to(tracker.address(), &signer);
        signed.proofs.clear();
        assert!(!signed.verify());
    }

    #[test]
    fn stale_timestamp_rejected_with_verification() {
        let signer = Identity::generate();
        let tracker = Identity::generate();
        let mut signed = signed_to(tracker.address(), &signer);
        signed.header.timestamp = now_unix() - TIMESTAMP_WINDOW_SECS - 60;

        assert!(matches!(
            signed.reconstruct_with_timestamp(),
            Err(EnvelopeError::StaleTimestamp { .. })
        ));
        // The timestamp-free path still serves it.
        let (payload, _, _) = signed.reconstruct();
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn fresh_timestamp_accepted() {
        let signer = Identity::generate();
        let tracker = Identity::generate();
        let signed = signed_to(tracker.address(), &signer);
        assert!(signed.reconstruct_with_timestamp().is_ok());
    }

    #[test]
    fn remote_error_materialization() {
        let body = ErrorBody {
            code: ErrorCode::AddressNotFound as i32,
            message: "couldn't find that address".into(),
        };
        let header = Header {
            from: "tracker-fp".into(),
            to: "client-fp".into(),
            timestamp: 0,
        };
        let err = RemoteError::from_payload(&body.encode_to_vec(), &header);
        assert_eq!(err.code, ErrorCode::AddressNotFound);
        assert_eq!(err.address, "tracker-fp");

        // Garbage payloads still materialise, with an unspecified code.
        let err = RemoteError::from_payload(&[0xff, 0xff, 0xff], &header);
        assert_eq!(err.code, ErrorCode::Unspecified);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_sign_verify_reconstruct(
            payload in prop::collection::vec(any::<u8>(), 0..512),
            type_code in "[A-Z]{1,16}",
        ) {
            let signer = Identity::generate();
            let recipient = Address::from_fingerprint("peer");
            let signed = SignedMessage::sign(payload.clone(), &type_code, &recipient, &signer);

            prop_assert!(signed.verify());
            let (got_payload, got_type, header) = signed.reconstruct();
            prop_assert_eq!(got_payload, &payload[..]);
            prop_assert_eq!(got_type, type_code.as_str());
            prop_assert_eq!(header.from.as_str(), signer.fingerprint());
        }

        #[test]
        fn prop_plain_envelope_round_trip(
            payload in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            let signer = Identity::generate();
            let tracker = Identity::generate();
            let signed = SignedMessage::sign(
                payload,
                "QUERY",
                tracker.address(),
                &signer,
            );

            let env = signed.address_to(tracker.address());
            let opened = open_envelope(&env, &tracker).unwrap();
            prop_assert_eq!(opened, signed);
        }
    }
}
