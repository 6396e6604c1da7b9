//! Server-Sent Events stream for a session.
//!
//! Actions arrive over POST; their events are mirrored here so a UI can
//! render the story as it happens. Narrative blocks are re-emitted as
//! per-paragraph `narrative_chunk` events so the client can stream prose
//! instead of waiting for the full block.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::broadcast;
use tracing::warn;

use everwhen::session::Event;

use crate::state::AppState;

/// Mirror dispatched events onto a session channel. `narrative` events are
/// replaced by their paragraph chunks; everything else passes through.
/// Send errors just mean nobody is listening.
pub fn broadcast_events(tx: &broadcast::Sender<Event>, events: &[Event]) {
    for event in events {
        match event {
            Event::Narrative { text } => {
                for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
                    let _ = tx.send(Event::NarrativeChunk {
                        text: paragraph.to_string(),
                    });
                }
            }
            other => {
                let _ = tx.send(other.clone());
            }
        }
    }
}

/// GET /sessions/:id/events - SSE stream of session events.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let mut rx = state.channel(&id).subscribe();

    let stream = async_stream::stream! {
        yield Ok(SseEvent::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        yield Ok(SseEvent::default().event("game").data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(session = %id, skipped = n, "SSE client lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrative_blocks_are_chunked_per_paragraph() {
        let (tx, mut rx) = broadcast::channel(16);
        let events = vec![
            Event::Narrative {
                text: "First paragraph.\n\nSecond paragraph.".to_string(),
            },
            Event::GameEnd,
        ];
        broadcast_events(&tx, &events);

        let first = rx.try_recv().expect("chunk");
        assert_eq!(
            first,
            Event::NarrativeChunk {
                text: "First paragraph.".to_string()
            }
        );
        let second = rx.try_recv().expect("chunk");
        assert_eq!(
            second,
            Event::NarrativeChunk {
                text: "Second paragraph.".to_string()
            }
        );
        assert_eq!(rx.try_recv().expect("pass-through"), Event::GameEnd);
    }
}
