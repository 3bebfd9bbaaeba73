//! Streaming relay: forwards upstream generation chunks to the HTTP response
//! as they arrive, in order, without buffering the whole result.
//!
//! Two response flavors exist. [`sse_response`] frames each chunk as one SSE
//! event; a mid-stream upstream failure is reported as a terminal in-band
//! `event: error` event, because the 200 status is already committed once the
//! first chunk has been sent. [`text_response`] forwards raw text chunks for
//! clients that consume plain chunked output; there a mid-stream failure can
//! only end the connection.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::{future, Stream, StreamExt};

use crate::error::Error;

/// Frame one chunk as an SSE `data:` event. Multi-line chunks become one
/// event with one `data:` line per chunk line, so the client's event joins
/// back to the original text.
pub fn frame_data(chunk: &str) -> String {
    let mut framed = String::with_capacity(chunk.len() + 16);
    for line in chunk.split('\n') {
        framed.push_str("data: ");
        framed.push_str(line);
        framed.push('\n');
    }
    framed.push('\n');
    framed
}

/// Frame the terminal in-band error event.
pub fn frame_error(message: &str) -> String {
    format!("event: error\ndata: {}\n\n", message)
}

/// Relay an upstream chunk stream as a `text/event-stream` response.
///
/// Chunks are framed and flushed in arrival order; the body stream completes
/// when the upstream does. On an upstream error the terminal error event is
/// written and the stream ends; nothing after the error is forwarded.
pub fn sse_response<S>(upstream: S) -> Response
where
    S: Stream<Item = Result<String, Error>> + Send + 'static,
{
    let mut failed = false;
    let framed = upstream
        .take_while(move |item| {
            if failed {
                return future::ready(false);
            }
            if item.is_err() {
                failed = true;
            }
            future::ready(true)
        })
        .map(|item| {
            let frame = match item {
                Ok(chunk) => frame_data(&chunk),
                Err(e) => {
                    tracing::error!(error = %e, "Generation stream failed mid-response");
                    frame_error(&e.to_string())
                }
            };
            Ok::<_, Infallible>(Bytes::from(frame))
        });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(framed))
        .unwrap()
}

/// Relay an upstream chunk stream as raw chunked plain text.
///
/// Used by the compose endpoint, whose client consumes unframed text. On an
/// upstream error the failure is logged and the body simply ends; there is no
/// in-band framing available in plain text.
pub fn text_response<S>(upstream: S) -> Response
where
    S: Stream<Item = Result<String, Error>> + Send + 'static,
{
    let chunks = upstream
        .take_while(|item| {
            if let Err(e) = item {
                tracing::error!(error = %e, "Generation stream failed mid-response");
            }
            future::ready(item.is_ok())
        })
        .map(|item| Ok::<_, Infallible>(Bytes::from(item.unwrap_or_default())));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(chunks))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[test]
    fn test_frame_data_single_line() {
        assert_eq!(frame_data("hello"), "data: hello\n\n");
    }

    #[test]
    fn test_frame_data_multi_line() {
        assert_eq!(frame_data("a\nb"), "data: a\ndata: b\n\n");
    }

    #[test]
    fn test_frame_data_empty_chunk() {
        assert_eq!(frame_data(""), "data: \n\n");
    }

    #[test]
    fn test_frame_error() {
        assert_eq!(frame_error("boom"), "event: error\ndata: boom\n\n");
    }

    #[tokio::test]
    async fn test_sse_response_preserves_order() {
        let upstream = stream::iter(vec![
            Ok("Hel".to_string()),
            Ok("lo ".to_string()),
            Ok("world".to_string()),
        ]);

        let response = sse_response(upstream);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-cache"
        );

        let body = body_string(response).await;
        assert_eq!(body, "data: Hel\n\ndata: lo \n\ndata: world\n\n");
    }

    #[tokio::test]
    async fn test_sse_response_error_is_terminal() {
        let upstream = stream::iter(vec![
            Ok("first".to_string()),
            Err(Error::GenAi("stream broke".to_string())),
            Ok("never sent".to_string()),
        ]);

        let body = body_string(sse_response(upstream)).await;
        assert!(body.starts_with("data: first\n\n"));
        assert!(body.contains("event: error\n"));
        assert!(
            !body.contains("never sent"),
            "nothing after the error event may be forwarded: {}",
            body
        );
        assert!(
            body.ends_with("\n\n"),
            "error event must terminate the stream cleanly: {}",
            body
        );
    }

    #[tokio::test]
    async fn test_sse_response_concatenation_matches_upstream() {
        let chunks = vec!["The", " quick", " brown", " fox"];
        let upstream = stream::iter(chunks.iter().map(|c| Ok(c.to_string())).collect::<Vec<_>>());

        let body = body_string(sse_response(upstream)).await;
        let reassembled: String = body
            .split("\n\n")
            .filter(|event| !event.is_empty())
            .map(|event| event.strip_prefix("data: ").unwrap_or(event))
            .collect();
        assert_eq!(reassembled, chunks.concat());
    }

    #[tokio::test]
    async fn test_text_response_concatenates_raw_chunks() {
        let upstream = stream::iter(vec![
            Ok("Dear team,".to_string()),
            Ok("\n\nRegards".to_string()),
        ]);

        let response = text_response(upstream);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );

        let body = body_string(response).await;
        assert_eq!(body, "Dear team,\n\nRegards");
    }

    #[tokio::test]
    async fn test_text_response_error_ends_body() {
        let upstream = stream::iter(vec![
            Ok("partial".to_string()),
            Err(Error::GenAi("stream broke".to_string())),
            Ok("never sent".to_string()),
        ]);

        let body = body_string(text_response(upstream)).await;
        assert_eq!(body, "partial");
    }
}
