use std::io::Read;
use std::sync::Arc;

use patchgate_core::AppResult;
use patchgate_domain::ResourceSchema;

use super::{PatchDecoder, Validator};
use crate::{OperationKind, SchemaCache};

/// Decodes and validates request bodies without tracking a resource.
///
/// Unknown and case-colliding keys are rejected exactly as in
/// [`PatchDecoder`]; only the typed target is returned.
pub struct StructDecoder<R> {
    inner: PatchDecoder<R>,
}

impl<R> Clone for StructDecoder<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: ResourceSchema> StructDecoder<R> {
    /// Creates a decoder backed by the process-wide schema cache.
    pub fn new() -> AppResult<Self> {
        Self::with_cache(SchemaCache::global())
    }

    /// Creates a decoder backed by `cache`.
    pub fn with_cache(cache: &SchemaCache) -> AppResult<Self> {
        Ok(Self {
            inner: PatchDecoder::with_cache(cache)?,
        })
    }

    /// Returns a decoder that validates every decoded target.
    #[must_use]
    pub fn with_validator(self, validator: Arc<dyn Validator<R>>) -> Self {
        Self {
            inner: self.inner.with_validator(validator),
        }
    }

    /// Decodes `body` into `R`.
    pub fn decode(&self, body: impl Read, kind: OperationKind) -> AppResult<R> {
        self.inner.decode(body, kind).map(|decoded| decoded.target)
    }
}
