mod body;
mod struct_decoder;

use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

use patchgate_core::{AppError, AppResult, BoxError};
use patchgate_domain::{FieldMapper, PatchSet, ResourceSchema};
use serde_json::{Map, Value};

use crate::{AuthorizedDecoder, Enforcer, OperationKind, SchemaCache};

pub use struct_decoder::StructDecoder;

/// Structural validation port applied after decoding.
pub trait Validator<R>: Send + Sync {
    /// Validates the whole target.
    fn validate(&self, target: &R) -> Result<(), BoxError>;

    /// Validates only `fields` of the target.
    fn validate_partial(&self, target: &R, fields: &[&str]) -> Result<(), BoxError>;
}

/// Result of decoding one request body.
#[derive(Debug, Clone)]
pub struct DecodedPatch<R> {
    /// Fields present in the body, in declaration order.
    pub patch_set: PatchSet<R>,
    /// Fully decoded target.
    pub target: R,
}

/// Decodes request bodies into patch sets.
pub struct PatchDecoder<R> {
    mapper: Arc<FieldMapper>,
    validator: Option<Arc<dyn Validator<R>>>,
}

impl<R> Clone for PatchDecoder<R> {
    fn clone(&self) -> Self {
        Self {
            mapper: Arc::clone(&self.mapper),
            validator: self.validator.clone(),
        }
    }
}

impl<R: ResourceSchema> PatchDecoder<R> {
    /// Creates a decoder backed by the process-wide schema cache.
    pub fn new() -> AppResult<Self> {
        Self::with_cache(SchemaCache::global())
    }

    /// Creates a decoder backed by `cache`.
    pub fn with_cache(cache: &SchemaCache) -> AppResult<Self> {
        Ok(Self {
            mapper: cache.field_mapper::<R>()?,
            validator: None,
        })
    }

    /// Returns a decoder that validates every decoded target.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator<R>>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Returns a decoder that also authorizes every patch set.
    #[must_use]
    pub fn with_permission_checker(self, enforcer: Arc<dyn Enforcer>) -> AuthorizedDecoder<R> {
        AuthorizedDecoder::new(self, enforcer)
    }

    /// Returns the field mapper of `R`.
    #[must_use]
    pub fn field_mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// Decodes `body`, keeping exactly the fields present in it.
    pub fn decode(&self, body: impl Read, kind: OperationKind) -> AppResult<DecodedPatch<R>> {
        let (presence, mut target) = body::decode_both::<R>(body)?;

        let fields = self.merge(presence, &mut target)?;
        let mut patch_set = PatchSet::new();
        for field in &fields {
            let value = target.field_value(field)?.ok_or_else(|| {
                AppError::Schema(format!("{} has no readable field {field}", R::RESOURCE))
            })?;
            patch_set.set(field, value)?;
        }

        self.validate(&target, &patch_set, kind)?;

        tracing::debug!(
            resource = R::RESOURCE,
            fields = patch_set.len(),
            "decoded patch set"
        );

        Ok(DecodedPatch { patch_set, target })
    }

    /// Decodes `body` on the blocking pool.
    ///
    /// Reading the body and joining the typed decode both block, so async
    /// callers go through here instead of [`PatchDecoder::decode`].
    pub async fn decode_async<B>(&self, body: B, kind: OperationKind) -> AppResult<DecodedPatch<R>>
    where
        B: Read + Send + 'static,
    {
        let decoder = self.clone();
        tokio::task::spawn_blocking(move || decoder.decode(body, kind))
            .await
            .map_err(|error| AppError::Internal(format!("patch decode task failed: {error}")))?
    }

    /// Resolves every present key and applies folded keys the typed decoder
    /// could not see. Returns the canonical fields present.
    fn merge(
        &self,
        presence: Map<String, Value>,
        target: &mut R,
    ) -> AppResult<Vec<&'static str>> {
        let mut seen = HashSet::with_capacity(presence.len());
        let mut fields = Vec::with_capacity(presence.len());

        for (key, value) in presence {
            let (found, exact) = match self.mapper.resolve(&key) {
                Some(found) => (found, true),
                None => self
                    .mapper
                    .resolve(&key.to_lowercase())
                    .map(|found| (found, false))
                    .ok_or_else(|| {
                        AppError::bad_request(format!("invalid field in json - {key}"))
                    })?,
            };

            if !seen.insert(found.field) {
                return Err(AppError::bad_request(format!(
                    "json field name {} collides with another field name of different case",
                    found.field
                )));
            }

            if !(exact && found.wire_native) && !target.assign_json(found.field, value)? {
                return Err(AppError::bad_request(format!(
                    "invalid field in json - {key}"
                )));
            }

            fields.push(found.field);
        }

        Ok(fields)
    }

    fn validate(&self, target: &R, patch_set: &PatchSet<R>, kind: OperationKind) -> AppResult<()> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };

        let result = match kind {
            OperationKind::Update => validator.validate_partial(target, &patch_set.fields()),
            OperationKind::Create | OperationKind::Delete => validator.validate(target),
        };

        result.map_err(|error| AppError::bad_request_with("failed validating the request", error))
    }
}
