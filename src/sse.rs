//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! `streamGenerateContent?alt=sse` answers with one `data:` record per chunk,
//! each a JSON [`GenerateContentResponse`] or an `{"error": ...}` envelope.
//! This module turns the raw byte stream into a stream of parsed chunks.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::client::error_from_body;
use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::{ErrorEnvelope, GenerateContentResponse};
use crate::{Error, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum StreamPayload {
    Failure(ErrorEnvelope),
    Chunk(GenerateContentResponse),
}

/// Process a stream of bytes into a stream of response chunks.
///
/// The returned stream ends after the first error it yields.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<GenerateContentResponse>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer: Vec<u8> = Vec::new();
    let done = false;

    stream::unfold(
        (stream, buffer, done),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }
            loop {
                // First check if we have a complete event in the buffer
                if let Some(event) = take_event(&mut buffer) {
                    match parse_event(&event) {
                        Some(Ok(chunk)) => {
                            STREAM_EVENTS.click();
                            return Some((Ok(chunk), (stream, buffer, false)));
                        }
                        Some(Err(err)) => {
                            STREAM_ERRORS.click();
                            return Some((Err(err), (stream, buffer, true)));
                        }
                        None => continue,
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
                    }
                    Some(Err(e)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // End of stream; a final record may lack its blank line.
                        if buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                            let event = std::mem::take(&mut buffer);
                            match parse_event(&event) {
                                Some(Ok(chunk)) => {
                                    STREAM_EVENTS.click();
                                    return Some((Ok(chunk), (stream, buffer, true)));
                                }
                                Some(Err(err)) => {
                                    STREAM_ERRORS.click();
                                    return Some((Err(err), (stream, buffer, true)));
                                }
                                None => {}
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Removes and returns the first complete event (terminated by a blank line).
fn take_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let mut event: Vec<u8> = buffer.drain(..end + 2).collect();
    event.truncate(end);
    Some(event)
}

/// Parses one SSE record.
///
/// Returns `None` for records without data (comments, keep-alives).
fn parse_event(event: &[u8]) -> Option<Result<GenerateContentResponse>> {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => {
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");
    if data.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamPayload>(&data) {
        Ok(StreamPayload::Chunk(chunk)) => Some(Ok(chunk)),
        Ok(StreamPayload::Failure(envelope)) => {
            let status = envelope.error.code;
            Some(Err(error_from_body(status, &envelope.error, None)))
        }
        Err(e) => Some(Err(Error::serialization(
            format!("Failed to parse stream chunk: {e}"),
            Some(Box::new(e)),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io;

    fn chunk(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{text}\"}}],\"role\":\"model\"}}}}]}}\r\n\r\n"
        )
    }

    fn ok(data: impl Into<Vec<u8>>) -> std::result::Result<Bytes, io::Error> {
        Ok(Bytes::from(data.into()))
    }

    #[tokio::test]
    async fn parse_single_chunk() {
        let stream = stream::iter(vec![ok(chunk("He"))]);
        let mut sse_stream = Box::pin(process_sse(stream));

        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("He"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_multiple_chunks_in_one_read() {
        let data = format!("{}{}", chunk("He"), chunk("llo"));
        let stream = stream::iter(vec![ok(data)]);
        let sse_stream = process_sse(stream);

        let texts: Vec<String> = sse_stream
            .map(|event| event.unwrap().text().unwrap())
            .collect()
            .await;
        assert_eq!(texts, vec!["He".to_string(), "llo".to_string()]);
    }

    #[tokio::test]
    async fn handle_split_event() {
        let data = chunk("there").into_bytes();
        let (first, second) = data.split_at(17);
        let stream = stream::iter(vec![ok(first.to_vec()), ok(second.to_vec())]);

        let mut sse_stream = Box::pin(process_sse(stream));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("there"));
    }

    #[tokio::test]
    async fn handle_multibyte_split() {
        let data = chunk("héllo").into_bytes();
        let split = data.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let (first, second) = data.split_at(split);
        let stream = stream::iter(vec![ok(first.to_vec()), ok(second.to_vec())]);

        let mut sse_stream = Box::pin(process_sse(stream));
        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("héllo"));
    }

    #[tokio::test]
    async fn skip_comments_and_trailing_record() {
        let data = format!(": keep-alive\n\n{}", chunk("x").trim_end());
        let stream = stream::iter(vec![ok(data)]);
        let mut sse_stream = Box::pin(process_sse(stream));

        let event = sse_stream.next().await.unwrap().unwrap();
        assert_eq!(event.text().as_deref(), Some("x"));
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn malformed_json_ends_stream() {
        let data = format!("data: {{not json\n\n{}", chunk("late"));
        let stream = stream::iter(vec![ok(data)]);
        let mut sse_stream = Box::pin(process_sse(stream));

        assert!(sse_stream.next().await.unwrap().is_err());
        assert!(sse_stream.next().await.is_none());
    }

    #[tokio::test]
    async fn inline_error_envelope() {
        let data = "data: {\"error\":{\"code\":503,\"message\":\"overloaded\",\"status\":\"UNAVAILABLE\"}}\n\n";
        let stream = stream::iter(vec![ok(data)]);
        let mut sse_stream = Box::pin(process_sse(stream));

        let err = sse_stream.next().await.unwrap().unwrap_err();
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let stream = stream::iter(vec![
            ok(chunk("He")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            ok(chunk("never")),
        ]);
        let mut sse_stream = Box::pin(process_sse(stream));

        assert!(sse_stream.next().await.unwrap().is_ok());
        let err = sse_stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Streaming { .. }));
        assert!(sse_stream.next().await.is_none());
    }
}
