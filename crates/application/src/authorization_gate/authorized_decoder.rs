use std::io::Read;
use std::sync::Arc;

use bytes::Buf;
use patchgate_core::{AppResult, Domain, Permission, User};
use patchgate_domain::{ResourceDescriptor, ResourceSchema};

use super::AuthorizationGate;
use crate::{DecodedPatch, Enforcer, Operation, OperationKind, PatchDecoder, Validator};

/// Decoder that authorizes every patch set it produces.
pub struct AuthorizedDecoder<R> {
    decoder: PatchDecoder<R>,
    descriptor: ResourceDescriptor,
    gate: AuthorizationGate,
}

impl<R> Clone for AuthorizedDecoder<R> {
    fn clone(&self) -> Self {
        Self {
            decoder: self.decoder.clone(),
            descriptor: self.descriptor.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<R: ResourceSchema> AuthorizedDecoder<R> {
    /// Wraps `decoder`, authorizing against the generated descriptor of `R`.
    #[must_use]
    pub fn new(decoder: PatchDecoder<R>, enforcer: Arc<dyn Enforcer>) -> Self {
        Self {
            decoder,
            descriptor: ResourceDescriptor::new::<R>(),
            gate: AuthorizationGate::new(enforcer),
        }
    }

    /// Returns a decoder authorizing against `descriptor` instead.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: ResourceDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Returns a decoder that validates every decoded target.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator<R>>) -> Self {
        self.decoder = self.decoder.with_validator(validator);
        self
    }

    /// Returns the descriptor used for authorization.
    #[must_use]
    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Decodes `body` and authorizes it under the permission of `kind`.
    pub async fn decode(
        &self,
        body: impl Read + Send + 'static,
        kind: OperationKind,
        user: &User,
        domain: &Domain,
    ) -> AppResult<DecodedPatch<R>> {
        let decoded = self.decoder.decode_async(body, kind).await?;
        self.gate
            .authorize(
                &decoded.patch_set,
                &self.descriptor,
                user,
                domain,
                kind.permission(),
            )
            .await?;

        Ok(decoded)
    }

    /// Decodes and authorizes one batch operation.
    ///
    /// Deletes only require `Delete` on the base resource and yield no patch.
    pub async fn decode_operation(
        &self,
        operation: &Operation,
        user: &User,
        domain: &Domain,
    ) -> AppResult<Option<DecodedPatch<R>>> {
        if operation.kind() == OperationKind::Delete {
            self.gate
                .authorize_base(&self.descriptor, user, domain, Permission::Delete)
                .await?;
            return Ok(None);
        }

        let body = operation.body().cloned().unwrap_or_default();
        self.decode(body.reader(), operation.kind(), user, domain)
            .await
            .map(Some)
    }
}
