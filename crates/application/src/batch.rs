use std::io::{BufRead, BufReader, Read};
use std::iter::FusedIterator;

use bytes::Bytes;
use http::Method;
use matchit::Router;
use patchgate_core::{AppError, AppResult};
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::{OperationKind, PathParams};

/// One element of a batch envelope, shaped as a single-resource request.
#[derive(Debug, Clone)]
pub struct Operation {
    kind: OperationKind,
    path: String,
    params: PathParams,
    body: Option<Bytes>,
}

impl Operation {
    /// Returns the kind of change.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns the equivalent HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.kind.method()
    }

    /// Returns the path the operation addresses.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the route parameters matched from the path.
    #[must_use]
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Returns the raw `value` of the envelope, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

#[derive(Deserialize)]
struct Envelope {
    op: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    value: Option<Box<RawValue>>,
}

enum State {
    Failed(AppError),
    Start,
    Elements { first: bool },
    Done,
}

/// Lazy, single-pass iterator over a batch envelope.
///
/// Iteration stops after the first error. Dropping the iterator early leaves
/// the rest of the stream unread.
pub struct Operations<B> {
    reader: BufReader<B>,
    router: Router<()>,
    pattern: String,
    state: State,
}

/// Splits a JSON array of `{op, path, value}` envelopes into operations.
///
/// `route_pattern` uses the router syntax of the service (`/{id}`) and is
/// matched against the path of every update and delete.
pub fn split_operations<B: Read>(body: B, route_pattern: &str) -> Operations<B> {
    let mut router = Router::new();
    let state = if !route_pattern.starts_with('/') {
        State::Failed(AppError::bad_request("pattern must start with /"))
    } else {
        match router.insert(route_pattern, ()) {
            Ok(()) => State::Start,
            Err(error) => State::Failed(AppError::Internal(format!(
                "invalid route pattern {route_pattern}: {error}"
            ))),
        }
    };

    Operations {
        reader: BufReader::new(body),
        router,
        pattern: route_pattern.to_owned(),
        state,
    }
}

impl<B: Read> Operations<B> {
    fn open(&mut self) -> AppResult<()> {
        match self.peek()? {
            Some(b'[') => {
                self.reader.consume(1);
                Ok(())
            }
            Some(other) => Err(AppError::bad_request(format!(
                "expected start of array, got {:?}",
                char::from(other)
            ))),
            None => Err(AppError::bad_request(
                "expected start of array, got end of input",
            )),
        }
    }

    fn element(&mut self, first: bool) -> AppResult<Option<Operation>> {
        match self.peek()? {
            Some(b']') => {
                self.reader.consume(1);
                return Ok(None);
            }
            Some(b',') if !first => self.reader.consume(1),
            None => return Err(AppError::bad_request("failed to find end of array")),
            Some(other) if !first => {
                return Err(AppError::bad_request(format!(
                    "expected ',' or ']' in array, got {:?}",
                    char::from(other)
                )));
            }
            Some(_) => {}
        }

        let envelope = Envelope::deserialize(&mut serde_json::Deserializer::from_reader(
            &mut self.reader,
        ))
        .map_err(|error| {
            if error.is_io() {
                AppError::infrastructure(error)
            } else {
                AppError::bad_request_with("failed to decode operation", error)
            }
        })?;

        self.operation(envelope).map(Some)
    }

    fn operation(&self, envelope: Envelope) -> AppResult<Operation> {
        let kind = OperationKind::from_op(&envelope.op)?;

        let params = if kind.addresses_existing() {
            let matched = self.router.at(&envelope.path).map_err(|_| {
                AppError::bad_request(format!(
                    "path {} does not match route pattern {}",
                    envelope.path, self.pattern
                ))
            })?;
            matched.params.iter().collect()
        } else {
            PathParams::new()
        };

        tracing::debug!(op = %envelope.op, path = %envelope.path, "split batch operation");

        Ok(Operation {
            kind,
            path: envelope.path,
            params,
            body: envelope
                .value
                .map(|value| Bytes::from(value.get().to_owned())),
        })
    }

    fn peek(&mut self) -> AppResult<Option<u8>> {
        loop {
            let buffer = self.reader.fill_buf().map_err(AppError::infrastructure)?;
            let Some(&byte) = buffer.first() else {
                return Ok(None);
            };
            if !byte.is_ascii_whitespace() {
                return Ok(Some(byte));
            }
            self.reader.consume(1);
        }
    }
}

impl<B: Read> Iterator for Operations<B> {
    type Item = AppResult<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match std::mem::replace(&mut self.state, State::Done) {
            State::Failed(error) => return Some(Err(error)),
            State::Done => return None,
            State::Start => self.open().and_then(|()| self.element(true)),
            State::Elements { first } => self.element(first),
        };

        match result {
            Ok(Some(operation)) => {
                self.state = State::Elements { first: false };
                Some(Ok(operation))
            }
            Ok(None) => None,
            Err(error) => Some(Err(error)),
        }
    }
}

impl<B: Read> FusedIterator for Operations<B> {}
