//! In-memory reference record store.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use adtp_crypto::{Address, SignedMessage};

use crate::delegate::{OperationalHooks, RecordStore};

/// Reference store: two concurrent maps, one per index, last-write-wins.
/// Records live until evicted; there is no server-initiated expiry.
#[derive(Default)]
pub struct MemoryStore {
    by_address: DashMap<String, SignedMessage>,
    by_alias: DashMap<String, SignedMessage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

impl OperationalHooks for MemoryStore {}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save_record(&self, owner: &Address, record: SignedMessage, alias: &str) {
        debug!(owner = %owner, alias, "saving record");
        if !alias.is_empty() {
            self.by_alias.insert(alias.to_string(), record.clone());
        }
        self.by_address
            .insert(owner.fingerprint().to_string(), record);
    }

    async fn get_record_by_address(&self, address: &Address) -> Option<SignedMessage> {
        self.by_address
            .get(address.fingerprint())
            .map(|record| record.clone())
    }

    async fn get_record_by_alias(&self, alias: &str) -> Option<SignedMessage> {
        self.by_alias.get(alias).map(|record| record.clone())
    }
}
