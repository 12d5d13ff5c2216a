use std::io::{self, BufReader, Read};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use patchgate_core::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Reads the body once, decoding it into a presence map on the calling
/// thread and into `R` on a scoped helper thread.
///
/// The helper is always joined before this returns; its decode error is only
/// observed through the join.
pub(super) fn decode_both<R>(body: impl Read) -> AppResult<(Map<String, Value>, R)>
where
    R: DeserializeOwned + Send,
{
    let (sender, receiver) = mpsc::channel();

    thread::scope(|scope| {
        let helper = scope.spawn(move || {
            serde_json::from_reader::<_, R>(BufReader::new(PipeReader::new(receiver)))
        });

        // The tee is consumed by the presence decode; dropping it closes the pipe.
        let presence = serde_json::from_reader::<_, Map<String, Value>>(BufReader::new(
            TeeReader::new(body, sender),
        ));
        let typed = helper.join();

        let presence =
            presence.map_err(|error| decode_error(error, "failed to decode request body"))?;
        let typed = typed
            .map_err(|_| AppError::Internal("typed body decoder panicked".to_owned()))?
            .map_err(|error| decode_error(error, "failed to unmarshal request body"))?;

        Ok((presence, typed))
    })
}

fn decode_error(error: serde_json::Error, message: &str) -> AppError {
    if error.is_io() {
        AppError::infrastructure(error)
    } else {
        AppError::bad_request_with(message, error)
    }
}

/// Forwards every chunk read from `inner` into a pipe.
struct TeeReader<B> {
    inner: B,
    pipe: Option<Sender<Vec<u8>>>,
}

impl<B> TeeReader<B> {
    fn new(inner: B, pipe: Sender<Vec<u8>>) -> Self {
        Self {
            inner,
            pipe: Some(pipe),
        }
    }
}

impl<B: Read> Read for TeeReader<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        if read > 0
            && let Some(pipe) = &self.pipe
            && pipe.send(buf[..read].to_vec()).is_err()
        {
            // Reader side stopped early; keep serving the primary decode.
            self.pipe = None;
        }
        Ok(read)
    }
}

/// Read half of the in-process pipe; yields EOF once every sender is gone.
struct PipeReader {
    chunks: Receiver<Vec<u8>>,
    current: Vec<u8>,
    position: usize,
}

impl PipeReader {
    fn new(chunks: Receiver<Vec<u8>>) -> Self {
        Self {
            chunks,
            current: Vec::new(),
            position: 0,
        }
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.position >= self.current.len() {
            match self.chunks.recv() {
                Ok(chunk) => {
                    self.current = chunk;
                    self.position = 0;
                }
                Err(_) => return Ok(0),
            }
        }

        let remaining = &self.current[self.position..];
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }
}
