//! Identity: an Ed25519 signing keypair and X25519 key agreement keypair.
//!
//! Key material zeroizes on drop. The identity's address fingerprint is
//! derived from the signing public key.

use std::path::Path;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::address::Address;
use crate::hash::fingerprint;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid key file length: expected {expected}, got {got}")]
    InvalidKeyFileLength { expected: usize, got: usize },
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("key file i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Length of a persisted key file: sign seed (32) followed by kex secret (32).
const KEY_FILE_LEN: usize = 64;

/// A participant with private key material capable of signing envelopes.
pub struct Identity {
    sign_key: SigningKey,
    kex_key: StaticSecret,
    address: Address,
}

impl Identity {
    /// Generate a fresh identity from the system random source.
    pub fn generate() -> Self {
        let sign_key = SigningKey::generate(&mut OsRng);
        let kex_key = StaticSecret::random_from_rng(OsRng);
        Self::from_keys(sign_key, kex_key)
    }

    fn from_keys(sign_key: SigningKey, kex_key: StaticSecret) -> Self {
        let mut address = Address::from_fingerprint(fingerprint(
            &sign_key.verifying_key().to_bytes(),
        ));
        address.encryption_key = Some(*X25519PublicKey::from(&kex_key).as_bytes());
        Self {
            sign_key,
            kex_key,
            address,
        }
    }

    /// Rebuild an identity from raw key bytes.
    pub fn from_bytes(sign_seed: &[u8; 32], kex_secret: &[u8; 32]) -> Self {
        Self::from_keys(SigningKey::from_bytes(sign_seed), StaticSecret::from(*kex_secret))
    }

    /// Load an identity from a key file written by [`Identity::save_to_file`].
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let bytes = Zeroizing::new(std::fs::read(path)?);
        if bytes.len() != KEY_FILE_LEN {
            return Err(IdentityError::InvalidKeyFileLength {
                expected: KEY_FILE_LEN,
                got: bytes.len(),
            });
        }
        let mut sign_seed = [0u8; 32];
        let mut kex_secret = [0u8; 32];
        sign_seed.copy_from_slice(&bytes[..32]);
        kex_secret.copy_from_slice(&bytes[32..]);
        Ok(Self::from_bytes(&sign_seed, &kex_secret))
    }

    /// Persist the private key material to a file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), IdentityError> {
        let mut bytes = Zeroizing::new(Vec::with_capacity(KEY_FILE_LEN));
        bytes.extend_from_slice(&self.sign_key.to_bytes());
        bytes.extend_from_slice(&self.kex_key.to_bytes());
        std::fs::write(path, &*bytes)?;
        Ok(())
    }

    /// The identity's address, carrying its fingerprint and encryption key.
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn fingerprint(&self) -> &str {
        self.address.fingerprint()
    }

    /// Set the transport endpoint this identity is reachable at.
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.address.location = Some(location.into());
    }

    pub fn sign_pub(&self) -> [u8; 32] {
        self.sign_key.verifying_key().to_bytes()
    }

    pub fn kex_pub(&self) -> [u8; 32] {
        *X25519PublicKey::from(&self.kex_key).as_bytes()
    }

    /// Sign a message, returning the 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signature: Signature = self.sign_key.sign(message);
        signature.to_bytes()
    }

    /// X25519 Diffie-Hellman against a peer's public key.
    pub fn key_exchange(&self, peer_kex_pub: &[u8; 32]) -> [u8; 32] {
        let peer = X25519PublicKey::from(*peer_kex_pub);
        *self.kex_key.diffie_hellman(&peer).as_bytes()
    }
}

/// Verify an Ed25519 signature against a public key.
pub fn verify_signature(
    sign_pub: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), IdentityError> {
    let pub_arr: [u8; 32] = sign_pub
        .try_into()
        .map_err(|_| IdentityError::InvalidPublicKey)?;
    let verifying_key =
        VerifyingKey::from_bytes(&pub_arr).map_err(|_| IdentityError::InvalidPublicKey)?;
    let sig_arr: [u8; 64] = signature
        .try_into()
        .map_err(|_| IdentityError::InvalidSignature)?;
    verifying_key
        .verify_strict(message, &Signature::from_bytes(&sig_arr))
        .map_err(|_| IdentityError::InvalidSignature)
}
