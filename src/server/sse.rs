//! Server-sent event encoding for turn streams.

use std::time::Duration;

use axum::http::header::{CACHE_CONTROL, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;

use crate::agent::{StreamEvent, TurnStream};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Encodes one event as an SSE frame named after its tag.
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized.
pub fn frame(event: &StreamEvent) -> Result<Event, axum::Error> {
    Event::default().event(event.name()).json_data(event)
}

/// Wraps a turn stream into an SSE response with periodic keep-alive
/// comments.
///
/// The turn is cancelled when the client disconnects, since the body (and
/// with it the [`TurnStream`]) is dropped.
pub fn turn_response(turn: TurnStream, keep_alive: Duration) -> Response {
    let frames = turn.map(|event| frame(&event));
    let mut response = Sse::new(frames)
        .keep_alive(KeepAlive::new().interval(keep_alive).text("ping"))
        .into_response();

    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    response
}
