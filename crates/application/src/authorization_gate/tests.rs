use std::collections::{HashSet, VecDeque};
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use patchgate_core::{AppError, AppResult, Domain, Permission, Resource, User};
use patchgate_domain::{ResourceDescriptor, ResourceSchema};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::{AuthorizationGate, QueryDecoder};
use crate::{Enforcer, OperationKind, PatchDecoder, ResourceCheck, SchemaCache, split_operations};

#[derive(Debug, Clone, Default, Deserialize, ResourceSchema)]
#[serde(default)]
#[patch(resource = "people")]
struct Person {
    name: String,
    #[patch(perm = "required")]
    age: i64,
    #[patch(perm = "read")]
    salary: i64,
}

#[derive(Debug, Clone, Default, Deserialize, ResourceSchema)]
#[serde(default)]
#[patch(resource = "vault")]
struct Secret {
    #[patch(perm = "read")]
    pin: String,
}

#[derive(Default)]
struct FakeEnforcer {
    granted: HashSet<(Permission, &'static str)>,
    unavailable: bool,
    calls: Mutex<Vec<(Permission, Vec<Resource>)>>,
}

impl FakeEnforcer {
    fn granting(grants: &[(Permission, &'static str)]) -> Self {
        Self {
            granted: grants.iter().copied().collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Enforcer for FakeEnforcer {
    async fn require_resources(
        &self,
        _: &User,
        _: &Domain,
        permission: Permission,
        resources: &[Resource],
    ) -> AppResult<ResourceCheck> {
        self.calls
            .lock()
            .await
            .push((permission, resources.to_vec()));
        if self.unavailable {
            return Err(AppError::infrastructure("policy store unavailable"));
        }

        let missing = resources
            .iter()
            .filter(|resource| {
                !self
                    .granted
                    .iter()
                    .any(|(granted, name)| *granted == permission && *name == resource.as_str())
            })
            .cloned()
            .collect::<Vec<_>>();

        Ok(if missing.is_empty() {
            ResourceCheck::Granted
        } else {
            ResourceCheck::Missing(missing)
        })
    }
}

fn alice() -> (User, Domain) {
    (User::new("alice"), Domain::global())
}

fn patch_decoder() -> PatchDecoder<Person> {
    PatchDecoder::with_cache(&SchemaCache::new()).unwrap_or_else(|_| unreachable!())
}

fn names(resources: &[Resource]) -> Vec<&str> {
    resources.iter().map(Resource::as_str).collect()
}

/// Body that stalls the reading thread before every chunk.
struct SlowBody {
    chunks: VecDeque<&'static [u8]>,
}

impl Read for SlowBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        std::thread::sleep(Duration::from_millis(20));
        let Some(chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let count = chunk.len().min(buf.len());
        buf[..count].copy_from_slice(&chunk[..count]);
        if count < chunk.len() {
            self.chunks.push_front(&chunk[count..]);
        }
        Ok(count)
    }
}

#[tokio::test]
async fn gated_fields_are_checked_with_the_base_in_one_call() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[
        (Permission::Update, "people"),
        (Permission::Update, "people.age"),
    ]));
    let decoder = patch_decoder().with_permission_checker(enforcer.clone());
    let (user, domain) = alice();

    let result = decoder
        .decode(&br#"{"age": 30}"#[..], OperationKind::Update, &user, &domain)
        .await;
    assert!(result.is_ok());

    let calls = enforcer.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Permission::Update);
    assert_eq!(names(&calls[0].1), vec!["people", "people.age"]);
}

#[tokio::test]
async fn custom_descriptor_decides_the_checked_resources() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[
        (Permission::Update, "staff"),
        (Permission::Update, "staff.age"),
    ]));
    let decoder = patch_decoder()
        .with_permission_checker(enforcer.clone())
        .with_descriptor(ResourceDescriptor::from_schema(
            Resource::new("staff"),
            Person::schema(),
        ));
    let (user, domain) = alice();

    let result = decoder
        .decode(&br#"{"age": 30}"#[..], OperationKind::Update, &user, &domain)
        .await;
    assert!(result.is_ok());
    assert_eq!(decoder.descriptor().base_resource().as_str(), "staff");

    let calls = enforcer.calls.lock().await;
    assert_eq!(names(&calls[0].1), vec!["staff", "staff.age"]);
}

#[tokio::test]
async fn decoding_leaves_the_runtime_free_for_other_tasks() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[(Permission::Update, "people")]));
    let decoder = patch_decoder().with_permission_checker(enforcer);
    let (user, domain) = alice();

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = tokio::spawn({
        let ticks = Arc::clone(&ticks);
        async move {
            loop {
                tokio::time::sleep(Duration::from_millis(2)).await;
                ticks.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let body = SlowBody {
        chunks: VecDeque::from([&br#"{"name""#[..], &b": "[..], &br#""Al"}"#[..]]),
    };
    let result = decoder
        .decode(body, OperationKind::Update, &user, &domain)
        .await;
    let ticked = ticks.load(Ordering::Relaxed);
    ticker.abort();

    assert!(matches!(result, Ok(decoded) if decoded.target.name == "Al"));
    assert!(ticked > 0, "ticker made no progress while the body was read");
}

#[tokio::test]
async fn ungated_fields_still_check_the_base() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[(Permission::Update, "people")]));
    let decoder = patch_decoder().with_permission_checker(enforcer.clone());
    let (user, domain) = alice();

    let result = decoder
        .decode(
            &br#"{"name": "Al", "salary": 1}"#[..],
            OperationKind::Update,
            &user,
            &domain,
        )
        .await;
    assert!(result.is_ok());

    let calls = enforcer.calls.lock().await;
    assert_eq!(names(&calls[0].1), vec!["people"]);
}

#[tokio::test]
async fn missing_resources_are_forbidden() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[(Permission::Update, "people")]));
    let decoder = patch_decoder().with_permission_checker(enforcer);
    let (user, domain) = alice();

    let result = decoder
        .decode(&br#"{"age": 30}"#[..], OperationKind::Update, &user, &domain)
        .await;

    let Err(AppError::Forbidden {
        message,
        permission,
        missing,
    }) = result
    else {
        panic!("expected forbidden");
    };
    assert_eq!(message, "identity alice lacks update on [people.age]");
    assert_eq!(permission, Permission::Update);
    assert_eq!(names(&missing), vec!["people.age"]);
}

#[tokio::test]
async fn enforcer_failures_are_not_denials() {
    let enforcer = Arc::new(FakeEnforcer {
        unavailable: true,
        ..FakeEnforcer::default()
    });
    let gate = AuthorizationGate::new(enforcer);
    let descriptor = ResourceDescriptor::new::<Person>();
    let (user, domain) = alice();

    let result = gate
        .authorize_base(&descriptor, &user, &domain, Permission::Create)
        .await;
    assert!(matches!(result, Err(AppError::Infrastructure(_))));
}

#[tokio::test]
async fn batch_operations_reuse_the_single_resource_pipeline() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[
        (Permission::Update, "people"),
        (Permission::Update, "people.age"),
        (Permission::Delete, "people"),
    ]));
    let decoder = patch_decoder().with_permission_checker(enforcer.clone());
    let (user, domain) = alice();
    let body = r#"[{"op":"patch","path":"/10","value":{"age":5}},{"op":"remove","path":"/11"}]"#;

    let mut decoded = Vec::new();
    for operation in split_operations(body.as_bytes(), "/{id}") {
        let operation = operation.unwrap_or_else(|_| unreachable!());
        let patch = decoder
            .decode_operation(&operation, &user, &domain)
            .await
            .unwrap_or_else(|_| unreachable!());
        decoded.push((operation.params().parse::<u64>("id").ok(), patch));
    }

    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].0, Some(10));
    assert!(matches!(&decoded[0].1, Some(patch) if patch.target.age == 5));
    assert_eq!(decoded[1].0, Some(11));
    assert!(decoded[1].1.is_none());

    let calls = enforcer.calls.lock().await;
    assert_eq!(calls[1].0, Permission::Delete);
    assert_eq!(names(&calls[1].1), vec!["people"]);
}

#[tokio::test]
async fn delete_requires_delete_on_the_base() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[(Permission::Update, "people")]));
    let decoder = patch_decoder().with_permission_checker(enforcer);
    let (user, domain) = alice();

    let operation = split_operations(&br#"[{"op":"remove","path":"/1"}]"#[..], "/{id}")
        .next()
        .and_then(Result::ok)
        .unwrap_or_else(|| unreachable!());

    let result = decoder.decode_operation(&operation, &user, &domain).await;
    assert!(matches!(
        result,
        Err(AppError::Forbidden { permission: Permission::Delete, .. })
    ));
}

#[tokio::test]
async fn query_decoder_filters_gated_fields() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[
        (Permission::Read, "people"),
        (Permission::Read, "people.age"),
    ]));
    let decoder = QueryDecoder::<Person>::with_cache(&SchemaCache::new(), enforcer)
        .unwrap_or_else(|_| unreachable!());
    let (user, domain) = alice();

    let query = decoder
        .decode(&user, &domain)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(query.fields(), &["name", "age"]);
    assert!(!query.contains("salary"));
}

#[tokio::test]
async fn query_decoder_requires_the_base_resource() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[(Permission::Read, "people.age")]));
    let decoder = QueryDecoder::<Person>::with_cache(&SchemaCache::new(), enforcer.clone())
        .unwrap_or_else(|_| unreachable!());
    let (user, domain) = alice();

    let result = decoder.decode(&user, &domain).await;

    assert!(matches!(
        result,
        Err(error) if error.message() == Some("identity alice lacks read on people")
    ));
    assert_eq!(enforcer.calls.lock().await.len(), 1);
}

#[tokio::test]
async fn query_decoder_forbids_an_empty_projection() {
    let enforcer = Arc::new(FakeEnforcer::granting(&[(Permission::Read, "vault")]));
    let decoder = QueryDecoder::<Secret>::with_cache(&SchemaCache::new(), enforcer)
        .unwrap_or_else(|_| unreachable!());
    let (user, domain) = alice();

    let result = decoder.decode(&user, &domain).await;

    assert!(matches!(
        result,
        Err(error) if error.message()
            == Some("identity alice lacks read on any fields in vault")
    ));
}

#[tokio::test]
async fn query_decoder_propagates_enforcer_failures() {
    let enforcer = Arc::new(FakeEnforcer {
        unavailable: true,
        ..FakeEnforcer::default()
    });
    let decoder = QueryDecoder::<Person>::with_cache(&SchemaCache::new(), enforcer)
        .unwrap_or_else(|_| unreachable!());
    let (user, domain) = alice();

    assert!(matches!(
        decoder.decode(&user, &domain).await,
        Err(AppError::Infrastructure(_))
    ));
}
