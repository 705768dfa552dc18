//! The delegate contract a tracker runs against.
//!
//! Persistence is required; operational hooks carry defaults that forward
//! to `tracing`, so an application supplies only a record store unless it
//! wants custom policy or logging.

use async_trait::async_trait;
use tracing::{error, info};

use adtp_crypto::{Address, SignedMessage};

/// Error context reported to [`OperationalHooks::handle_error`].
#[derive(Clone, Debug)]
pub struct TrackerFault {
    /// Where in the serving path the failure occurred.
    pub location: &'static str,
    pub detail: String,
}

/// Operational policy and logging hooks. Every method has a default.
pub trait OperationalHooks: Send + Sync {
    /// Consulted before dispatching an authenticated request.
    fn allow_connection(&self, _from: &Address) -> bool {
        true
    }

    /// Side-channel for operational errors.
    fn handle_error(&self, fault: &TrackerFault) {
        error!(location = fault.location, detail = %fault.detail, "tracker fault");
    }

    /// Side-channel for informational logs.
    fn log_message(&self, parts: &[&str]) {
        info!("{}", parts.join(" "));
    }
}

/// Record persistence. May be called from many tasks concurrently;
/// implementations serialise internally.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store the client-supplied signed envelope under the owner's address
    /// and, when non-empty, the alias. Idempotent, last-write-wins.
    async fn save_record(&self, owner: &Address, record: SignedMessage, alias: &str);

    /// Fetch a stored record by address fingerprint. Implementations hand
    /// out owned clones so the caller can counter-sign without touching
    /// the stored envelope.
    async fn get_record_by_address(&self, address: &Address) -> Option<SignedMessage>;

    async fn get_record_by_alias(&self, alias: &str) -> Option<SignedMessage>;
}

/// The full delegate the server composes: persistence plus hooks.
pub trait TrackerDelegate: OperationalHooks + RecordStore {}

impl<T: OperationalHooks + RecordStore> TrackerDelegate for T {}
