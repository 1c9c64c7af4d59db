//! Live log stream from the device agent

use futures::stream::{self, BoxStream, Stream, StreamExt};
use openapi_client::models::LogEntry;
use reqwest::Response;
use tracing::debug;

use crate::errors::ApiError;

/// Exclusively owned log stream.
///
/// The underlying connection is released when the stream is closed or
/// dropped. It is never reconnected; callers that want to follow the logs
/// across agent restarts have to request a new stream.
pub struct LogStream {
    chunks: BoxStream<'static, Result<Vec<u8>, ApiError>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl LogStream {
    pub(crate) fn new(response: Response) -> Self {
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ApiError::from));
        Self::from_chunks(chunks)
    }

    /// Build a stream from raw chunks
    pub fn from_chunks<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, ApiError>> + Send + 'static,
    {
        Self {
            chunks: chunks.boxed(),
            buffer: Vec::new(),
            finished: false,
        }
    }

    /// Next chunk of bytes as received, including anything already buffered
    /// by [`LogStream::next_line`]
    pub async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, ApiError>> {
        if !self.buffer.is_empty() {
            return Some(Ok(std::mem::take(&mut self.buffer)));
        }
        if self.finished {
            return None;
        }
        match self.chunks.next().await {
            Some(chunk) => Some(chunk),
            None => {
                self.finished = true;
                None
            }
        }
    }

    /// Next line, without its terminator. A trailing line with no newline is
    /// returned once the stream ends.
    pub async fn next_line(&mut self) -> Option<Result<String, ApiError>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Some(Ok(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut self.buffer);
                return Some(Ok(String::from_utf8_lossy(&line).into_owned()));
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                None => self.finished = true,
            }
        }
    }

    /// Next log entry. Blank lines are skipped.
    pub async fn next_entry(&mut self) -> Option<Result<LogEntry, ApiError>> {
        loop {
            let line = match self.next_line().await? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(ApiError::from));
        }
    }

    /// Turn the stream into a stream of log entries
    pub fn into_entries(self) -> impl Stream<Item = Result<LogEntry, ApiError>> + Send {
        stream::unfold(self, |mut logs| async move {
            logs.next_entry().await.map(|entry| (entry, logs))
        })
    }

    /// Release the connection
    pub fn close(self) {
        debug!("Closing log stream");
    }
}
