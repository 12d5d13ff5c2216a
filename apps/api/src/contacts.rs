use patchgate_application::{DecodedPatch, QuerySet, Validator};
use patchgate_core::{AppError, AppResult, BoxError};
use patchgate_domain::ResourceSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stored contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ResourceSchema)]
#[serde(default)]
#[patch(resource = "contacts")]
pub struct Contact {
    pub id: u64,
    pub name: String,
    #[patch(perm = "read,update")]
    pub email: String,
    #[patch(perm = "required")]
    pub age: Option<u32>,
    pub tags: Vec<String>,
}

/// Body of create and update requests.
#[derive(Debug, Clone, Default, Deserialize, ResourceSchema)]
#[serde(default)]
#[patch(resource = "contacts")]
pub struct ContactRequest {
    pub name: String,
    #[patch(perm = "read,update")]
    #[serde(alias = "mail")]
    pub email: String,
    #[patch(perm = "required")]
    pub age: Option<u32>,
    pub tags: Vec<String>,
}

impl Contact {
    pub fn from_request(id: u64, request: ContactRequest) -> Self {
        Self {
            id,
            name: request.name,
            email: request.email,
            age: request.age,
            tags: request.tags,
        }
    }

    /// Copies every patched field from the decoded target.
    pub fn apply(&mut self, patch: &DecodedPatch<ContactRequest>) -> AppResult<()> {
        let target = &patch.target;
        for field in patch.patch_set.fields() {
            match field {
                "name" => self.name.clone_from(&target.name),
                "email" => self.email.clone_from(&target.email),
                "age" => self.age = target.age,
                "tags" => self.tags.clone_from(&target.tags),
                other => {
                    return Err(AppError::Schema(format!(
                        "field {other} not found in {}",
                        Contact::RESOURCE
                    )));
                }
            }
        }

        Ok(())
    }

    /// Serializes the contact keeping only readable fields.
    pub fn project(&self, query: &QuerySet) -> AppResult<Map<String, Value>> {
        let Value::Object(mut fields) = serde_json::to_value(self)
            .map_err(|error| AppError::Internal(format!("failed to encode contact: {error}")))?
        else {
            return Err(AppError::Internal("contact must encode as an object".to_owned()));
        };

        fields.retain(|field, _| query.contains(field));
        Ok(fields)
    }
}

pub struct ContactValidator;

impl ContactValidator {
    fn check(request: &ContactRequest, field: &str) -> Result<(), BoxError> {
        match field {
            "name" if request.name.trim().is_empty() => Err("name must not be empty".into()),
            "email" if !request.email.contains('@') => {
                Err(format!("email {:?} is not an address", request.email).into())
            }
            "age" if request.age.is_some_and(|age| age > 150) => {
                Err("age must be at most 150".into())
            }
            _ => Ok(()),
        }
    }
}

impl Validator<ContactRequest> for ContactValidator {
    fn validate(&self, target: &ContactRequest) -> Result<(), BoxError> {
        ContactRequest::schema()
            .iter()
            .try_for_each(|field| Self::check(target, field.name))
    }

    fn validate_partial(&self, target: &ContactRequest, fields: &[&str]) -> Result<(), BoxError> {
        fields.iter().try_for_each(|field| Self::check(target, field))
    }
}
