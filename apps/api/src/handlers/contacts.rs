use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use bytes::{Buf, Bytes};
use patchgate_application::{DecodedPatch, OperationKind, split_operations};
use patchgate_core::{AppError, Permission};
use patchgate_domain::{DiffElem, diff};
use serde_json::{Map, Value};

use crate::contacts::ContactRequest;
use crate::dto::{BatchResultResponse, ContactChangesResponse, ContactCreatedResponse};
use crate::error::ApiResult;
use crate::middleware::Actor;
use crate::state::AppState;

/// Route pattern batch paths are matched against, relative to `/contacts`.
const CONTACT_ROUTE: &str = "/{id}";

pub async fn get_contact_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Map<String, Value>>> {
    let query = state
        .contact_query
        .decode(&actor.user, &actor.domain)
        .await?;
    let contact = state.contacts.get(id).await?;

    Ok(Json(contact.project(&query)?))
}

pub async fn create_contact_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ContactCreatedResponse>)> {
    let decoded = state
        .contact_decoder
        .decode(body.reader(), OperationKind::Create, &actor.user, &actor.domain)
        .await?;
    let contact = state.contacts.insert(decoded.target).await;

    Ok((
        StatusCode::CREATED,
        Json(ContactCreatedResponse { id: contact.id }),
    ))
}

pub async fn update_contact_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<u64>,
    body: Bytes,
) -> ApiResult<Json<ContactChangesResponse>> {
    let decoded = state
        .contact_decoder
        .decode(body.reader(), OperationKind::Update, &actor.user, &actor.domain)
        .await?;
    let changes = apply_patch(&state, id, &decoded).await?;

    Ok(Json(ContactChangesResponse { id, changes }))
}

pub async fn delete_contact_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state
        .gate
        .authorize_base(
            state.contact_decoder.descriptor(),
            &actor.user,
            &actor.domain,
            Permission::Delete,
        )
        .await?;
    state.contacts.remove(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Applies operations in order and stops at the first failure. Operations
/// applied before the failure stay applied.
pub async fn batch_contacts_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    body: Bytes,
) -> ApiResult<Json<Vec<BatchResultResponse>>> {
    let mut results = Vec::new();

    for operation in split_operations(&body[..], CONTACT_ROUTE) {
        let operation = operation?;
        let decoded = state
            .contact_decoder
            .decode_operation(&operation, &actor.user, &actor.domain)
            .await?;

        let result = match (operation.kind(), decoded) {
            (OperationKind::Create, Some(decoded)) => BatchResultResponse::Add {
                id: state.contacts.insert(decoded.target).await.id,
            },
            (OperationKind::Update, Some(decoded)) => {
                let id = operation.params().parse::<u64>("id")?;
                let changes = apply_patch(&state, id, &decoded).await?;
                BatchResultResponse::Patch { id, changes }
            }
            (OperationKind::Delete, None) => {
                let id = operation.params().parse::<u64>("id")?;
                state.contacts.remove(id).await?;
                BatchResultResponse::Remove { id }
            }
            (kind, _) => {
                return Err(AppError::Internal(format!(
                    "unexpected decode result for {kind:?} operation"
                ))
                .into());
            }
        };
        results.push(result);
    }

    Ok(Json(results))
}

async fn apply_patch(
    state: &AppState,
    id: u64,
    decoded: &DecodedPatch<ContactRequest>,
) -> ApiResult<BTreeMap<String, DiffElem>> {
    state
        .contacts
        .update(id, |contact| {
            let changes = diff(&*contact, &decoded.patch_set)?;
            contact.apply(decoded)?;
            Ok(changes)
        })
        .await
}
