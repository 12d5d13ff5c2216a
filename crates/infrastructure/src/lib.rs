//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_enforcer;
mod policy_document;

pub use in_memory_enforcer::InMemoryEnforcer;
pub use policy_document::{PolicyDocument, PolicyGrant};
