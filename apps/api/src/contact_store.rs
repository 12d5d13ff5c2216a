use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::contacts::{Contact, ContactRequest};
use crate::error::{ApiError, ApiResult};

/// In-memory contact table keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryContactStore {
    contacts: RwLock<BTreeMap<u64, Contact>>,
    next_id: AtomicU64,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, request: ContactRequest) -> Contact {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let contact = Contact::from_request(id, request);
        self.contacts.write().await.insert(id, contact.clone());
        contact
    }

    pub async fn get(&self, id: u64) -> ApiResult<Contact> {
        self.contacts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Runs `change` on the stored contact under the write lock.
    pub async fn update<T>(
        &self,
        id: u64,
        change: impl FnOnce(&mut Contact) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let mut contacts = self.contacts.write().await;
        let contact = contacts.get_mut(&id).ok_or_else(|| not_found(id))?;
        change(contact)
    }

    pub async fn remove(&self, id: u64) -> ApiResult<()> {
        self.contacts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: u64) -> ApiError {
    ApiError::NotFound(format!("contact {id} not found"))
}
