//! The resolver client: one tracker, signed request/reply exchanges.

use std::collections::HashMap;
use std::sync::Arc;

use adtp_crypto::{open_envelope, Address, Identity, RemoteError, SignedMessage};
use adtp_net::{connect, recv_envelope, send_envelope};
use adtp_proto::{ERROR_CODE, LOOKUP_TYPE_WILDCARD, QUERY_CODE, REGISTRATION_CODE};

use crate::error::RouteError;
use crate::messages::{QueryBody, RedirectEntry, RegistrationBody};

/// Application hook applied when a registration carries a redirect entry
/// matching the requested lookup type. The caller enforces that the
/// returned address's fingerprint equals the entry's exactly.
pub trait RedirectHandler: Send + Sync {
    fn handle_redirect(&self, lookup_type: &str, entry: &RedirectEntry) -> Address;
}

/// Default handler: resolve the redirect to a bare address naming the
/// entry's fingerprint.
pub struct FollowRedirects;

impl RedirectHandler for FollowRedirects {
    fn handle_redirect(&self, _lookup_type: &str, entry: &RedirectEntry) -> Address {
        Address::from_fingerprint(&entry.fingerprint)
    }
}

/// A resolver client for a single tracker.
#[derive(Clone)]
pub struct Router {
    url: String,
    origin: Arc<Identity>,
    redirector: Arc<dyn RedirectHandler>,
}

impl Router {
    pub fn new(
        url: impl Into<String>,
        origin: Arc<Identity>,
        redirector: Arc<dyn RedirectHandler>,
    ) -> Self {
        Self {
            url: url.into(),
            origin,
            redirector,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolve an address fingerprint into a full address.
    pub async fn lookup(&self, address: &str, lookup_type: &str) -> Result<Address, RouteError> {
        self.lookup_inner(address, "", lookup_type).await
    }

    /// Resolve an alias into a full address. The envelope recipient is the
    /// anonymous placeholder synthesised from the empty string.
    pub async fn lookup_alias(&self, alias: &str, lookup_type: &str) -> Result<Address, RouteError> {
        self.lookup_inner("", alias, lookup_type).await
    }

    async fn lookup_inner(
        &self,
        address: &str,
        alias: &str,
        lookup_type: &str,
    ) -> Result<Address, RouteError> {
        let query = QueryBody {
            address: address.to_string(),
            alias: alias.to_string(),
            need_key: false,
        };

        // Address the envelope to the queried address itself: only that
        // address's fingerprint identifies the recipient, a property the
        // server depends on.
        let recipient = Address::from_fingerprint(address);
        let signed = SignedMessage::sign(query.to_bytes(), QUERY_CODE, &recipient, &self.origin);
        let envelope = signed.address_to(&recipient);

        let mut conn = connect(&self.url).await?;
        send_envelope(&mut conn, &envelope).await?;
        let reply = recv_envelope(&mut conn)
            .await?
            .ok_or(RouteError::ProtocolViolation)?;

        let signed_reply = open_envelope(&reply, &self.origin)?;
        if !signed_reply.verify() {
            return Err(adtp_crypto::EnvelopeError::BadSignature.into());
        }

        // Registrations are long-lived and may be re-served hours after
        // signing, so the response timestamp is not verified.
        let (payload, type_code, header) = signed_reply.reconstruct();

        if type_code == ERROR_CODE {
            return Err(RemoteError::from_payload(payload, header).into());
        }
        if type_code != REGISTRATION_CODE {
            return Err(RouteError::ProtocolViolation);
        }

        let registration =
            RegistrationBody::from_bytes(payload).map_err(|_| RouteError::ProtocolViolation)?;

        // A redirect for the requested lookup type (or the wildcard)
        // replaces the result, one hop only.
        if let Some(entry) = registration
            .redirects
            .get(lookup_type)
            .or_else(|| registration.redirects.get(LOOKUP_TYPE_WILDCARD))
        {
            let resolved = self.redirector.handle_redirect(lookup_type, entry);
            if resolved.fingerprint() != entry.fingerprint {
                return Err(RouteError::RedirectFingerprintMismatch);
            }
            return Ok(resolved);
        }

        let mut resolved = Address::from_fingerprint(&registration.address);
        resolved.location = Some(registration.location.clone());
        resolved.alias = Some(format!("{}@{}", registration.alias, self.url));
        let key: [u8; 32] = registration
            .encryption_key
            .as_slice()
            .try_into()
            .map_err(|_| RouteError::BadKey)?;
        resolved.encryption_key = Some(key);

        Ok(resolved)
    }

    /// Register `identity` (and optional alias) with the tracker.
    ///
    /// The registration is signed with the registering identity's own key,
    /// never the router's origin, so the signed sender matches the record
    /// being claimed. Absence of an error envelope is the success signal.
    pub async fn register(
        &self,
        identity: &Identity,
        alias: &str,
        redirects: HashMap<String, RedirectEntry>,
    ) -> Result<(), RouteError> {
        let body = RegistrationBody::for_identity(identity, alias, redirects);
        let signed = SignedMessage::sign(
            body.to_bytes(),
            REGISTRATION_CODE,
            identity.address(),
            identity,
        );
        let envelope = signed.address_to(identity.address());

        let mut conn = connect(&self.url).await?;
        send_envelope(&mut conn, &envelope).await?;

        match recv_envelope(&mut conn).await? {
            None => Ok(()),
            Some(reply) => {
                let signed_reply = open_envelope(&reply, identity)?;
                let (payload, type_code, header) = signed_reply.reconstruct();
                if type_code == ERROR_CODE {
                    Err(RemoteError::from_payload(payload, header).into())
                } else {
                    Err(RouteError::ProtocolViolation)
                }
            }
        }
    }
}
