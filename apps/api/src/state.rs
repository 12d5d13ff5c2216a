use std::sync::Arc;

use patchgate_application::{
    AuthorizationGate, AuthorizedDecoder, Enforcer, PatchDecoder, QueryDecoder,
};
use patchgate_core::{AppResult, Domain};

use crate::contact_store::InMemoryContactStore;
use crate::contacts::{Contact, ContactRequest, ContactValidator};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<InMemoryContactStore>,
    pub contact_decoder: AuthorizedDecoder<ContactRequest>,
    pub contact_query: Arc<QueryDecoder<Contact>>,
    pub gate: AuthorizationGate,
    pub default_domain: Domain,
}

impl AppState {
    pub fn new(enforcer: Arc<dyn Enforcer>, default_domain: Domain) -> AppResult<Self> {
        let contact_decoder = PatchDecoder::<ContactRequest>::new()?
            .with_validator(Arc::new(ContactValidator))
            .with_permission_checker(enforcer.clone());

        Ok(Self {
            contacts: Arc::new(InMemoryContactStore::new()),
            contact_decoder,
            contact_query: Arc::new(QueryDecoder::new(enforcer.clone())?),
            gate: AuthorizationGate::new(enforcer),
            default_domain,
        })
    }
}
