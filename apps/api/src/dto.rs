use std::collections::BTreeMap;

use patchgate_domain::DiffElem;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ContactCreatedResponse {
    pub id: u64,
}

/// Fields an update actually changed.
#[derive(Debug, Serialize)]
pub struct ContactChangesResponse {
    pub id: u64,
    pub changes: BTreeMap<String, DiffElem>,
}

/// Outcome of one batch operation, in request order.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchResultResponse {
    Add { id: u64 },
    Patch {
        id: u64,
        changes: BTreeMap<String, DiffElem>,
    },
    Remove { id: u64 },
}
