//! Decoding of the `/v1/realtime` server-sent event stream.

use std::fmt::Display;

use futures::{Stream, StreamExt};

use fanvote_core::ChangeEvent;
use fanvote_ledger::ChangeStream;

/// Event name the service uses for row changes.
pub const CHANGE_EVENT: &str = "change";

/// Turn a raw SSE body into a stream of change events.
///
/// Keep-alive comments and events with other names are skipped. The stream
/// ends when the body ends or fails.
pub fn change_events<S, B, E>(body: S) -> ChangeStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    futures::stream::unfold(
        (Box::pin(body), Vec::new()),
        |(mut body, mut buffer)| async move {
            loop {
                if let Some(frame) = take_frame(&mut buffer) {
                    match parse_frame(&frame) {
                        Some(event) => return Some((event, (body, buffer))),
                        None => continue,
                    }
                }

                match body.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Realtime stream failed");
                        return None;
                    }
                    None => return None,
                }
            }
        },
    )
    .boxed()
}

/// Split the first complete frame off the buffer.
fn take_frame(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let mut frame: Vec<u8> = buffer.drain(..end + 2).collect();
    frame.truncate(end);
    Some(frame)
}

fn parse_frame(frame: &[u8]) -> Option<ChangeEvent> {
    let text = std::str::from_utf8(frame).ok()?;

    let mut name = None;
    let mut data = String::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix("event:") {
            name = Some(value.trim_start());
        } else if let Some(value) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    if name.is_some_and(|n| n != CHANGE_EVENT) || data.is_empty() {
        return None;
    }

    match serde_json::from_str(&data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping undecodable change event");
            None
        }
    }
}
