//! High-level message bodies and their wire conversions.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;

use adtp_crypto::Identity;
use adtp_proto::{wire, TrackerQuery, TrackerRegister};

/// Lifetime client writers stamp on new registrations: now + 7 days.
/// Informational only; the server does not enforce it.
pub const REGISTRATION_LIFETIME_SECS: u64 = 7 * 24 * 60 * 60;

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A per-lookup-type pointer to another address, applied by the querying
/// client under a fingerprint-match constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectEntry {
    pub lookup_type: String,
    pub fingerprint: String,
    pub alias: String,
}

/// The record sent to a tracker to set up or replace a registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationBody {
    pub address: String,
    pub encryption_key: Vec<u8>,
    pub location: String,
    pub expires: u64,
    pub alias: String,
    /// Keyed by lookup type; duplicates on the wire resolve last-wins.
    pub redirects: HashMap<String, RedirectEntry>,
}

impl RegistrationBody {
    /// Build a registration for `identity`, stamped to expire in 7 days.
    pub fn for_identity(
        identity: &Identity,
        alias: &str,
        redirects: HashMap<String, RedirectEntry>,
    ) -> Self {
        let address = identity.address();
        Self {
            address: address.fingerprint().to_string(),
            encryption_key: address
                .encryption_key
                .map(|key| key.to_vec())
                .unwrap_or_default(),
            location: address.location.clone().unwrap_or_default(),
            expires: now_unix() + REGISTRATION_LIFETIME_SECS,
            alias: alias.to_string(),
            redirects,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let redirect = self
            .redirects
            .values()
            .map(|entry| wire::Redirect {
                types: entry.lookup_type.clone(),
                alias: entry.alias.clone(),
                address: entry.fingerprint.clone(),
            })
            .collect();
        TrackerRegister {
            address: self.address.clone(),
            encryption_key: self.encryption_key.clone(),
            location: self.location.clone(),
            expires: self.expires,
            redirect,
            username: self.alias.clone(),
        }
        .encode_to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        let reg = TrackerRegister::decode(bytes)?;
        let mut redirects = HashMap::new();
        for entry in reg.redirect {
            redirects.insert(
                entry.types.clone(),
                RedirectEntry {
                    lookup_type: entry.types,
                    fingerprint: entry.address,
                    alias: entry.alias,
                },
            );
        }
        Ok(Self {
            address: reg.address,
            encryption_key: reg.encryption_key,
            location: reg.location,
            expires: reg.expires,
            alias: reg.username,
            redirects,
        })
    }
}

/// A lookup by address or alias. Exactly one side is used: an empty alias
/// routes to address lookup, a non-empty alias to alias lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryBody {
    pub address: String,
    pub alias: String,
    /// Reserved; carried but never consulted.
    pub need_key: bool,
}

impl QueryBody {
    pub fn for_address(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ..Self::default()
        }
    }

    pub fn for_alias(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            ..Self::default()
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        TrackerQuery {
            address: self.address.clone(),
            username: self.alias.clone(),
            need_key: self.need_key,
        }
        .encode_to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        let query = TrackerQuery::decode(bytes)?;
        Ok(Self {
            address: query.address,
            alias: query.username,
            need_key: query.need_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(lookup_type: &str, fingerprint: &str) -> RedirectEntry {
        RedirectEntry {
            lookup_type: lookup_type.to_string(),
            fingerprint: fingerprint.to_string(),
            alias: String::new(),
        }
    }

    #[test]
    fn registration_round_trip_with_redirects() {
        let mut redirects = HashMap::new();
        redirects.insert("DEFAULT".to_string(), entry("DEFAULT", "aa11"));
        redirects.insert("*".to_string(), entry("*", "bb22"));

        let body = RegistrationBody {
            address: "cafe".into(),
            encryption_key: vec![1, 2, 3],
            location: "mail.example.com:2048".into(),
            expires: 1_700_000_000,
            alias: "hunter".into(),
            redirects,
        };

        let decoded = RegistrationBody::from_bytes(&body.to_bytes()).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn registration_for_identity_stamps_expiry() {
        let mut identity = Identity::generate();
        identity.set_location("google.com");

        let before = now_unix();
        let body = RegistrationBody::for_identity(&identity, "hunter", HashMap::new());
        let after = now_unix();

        assert_eq!(body.address, identity.fingerprint());
        assert_eq!(body.location, "google.com");
        assert_eq!(body.alias, "hunter");
        assert_eq!(body.encryption_key, identity.kex_pub().to_vec());
        assert!(body.expires >= before + REGISTRATION_LIFETIME_SECS);
        assert!(body.expires <= after + REGISTRATION_LIFETIME_SECS);
    }

    #[test]
    fn query_round_trip() {
        for body in [
            QueryBody::for_address("cafe"),
            QueryBody::for_alias("hunter"),
        ] {
            let decoded = QueryBody::from_bytes(&body.to_bytes()).unwrap();
            assert_eq!(decoded, body);
        }
    }

    #[test]
    fn query_constructors_fill_one_side() {
        assert!(QueryBody::for_address("cafe").alias.is_empty());
        assert!(QueryBody::for_alias("hunter").address.is_empty());
    }
}
