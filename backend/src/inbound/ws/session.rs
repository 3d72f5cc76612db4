//! Per-connection trip feed socket.
//!
//! Drains the feed's frame queue into the socket and keeps the connection
//! alive with heartbeats. The public contract pings every 5s and considers a
//! connection idle after 10s without client traffic; tests shorten both.
//! Leaving the loop for any reason stops the feed.

use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, warn};

use crate::domain::TripFeedHandle;

use super::messages::FeedMessage;

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(50);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
const CLIENT_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) async fn handle_feed_session(
    feed: TripFeedHandle,
    frames: mpsc::UnboundedReceiver<FeedMessage>,
    session: Session,
    stream: MessageStream,
) {
    FeedConnection { feed, frames }.run(session, stream).await;
}

enum SessionError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    FeedEnded,
    Network(Closed),
}

struct FeedConnection {
    feed: TripFeedHandle,
    frames: mpsc::UnboundedReceiver<FeedMessage>,
}

impl FeedConnection {
    async fn run(mut self, mut session: Session, mut stream: MessageStream) {
        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        let error = loop {
            let result = tokio::select! {
                frame = self.frames.recv() => match frame {
                    Some(frame) => send_json(&mut session, &frame).await,
                    None => Err(SessionError::FeedEnded),
                },
                _ = heartbeat.tick() => handle_heartbeat_tick(&mut session, last_heartbeat).await,
                message = stream.recv() => {
                    handle_stream_message(&mut session, &mut last_heartbeat, message).await
                }
            };
            if let Err(error) = result {
                break error;
            }
        };

        self.feed.stop();
        log_shutdown_reason(&error);
        if let Some(reason) = close_reason_for(error) {
            if let Err(error) = session.close(reason).await {
                warn!(error = %error, "Failed to close WebSocket session");
            }
        }
    }
}

async fn handle_heartbeat_tick(
    session: &mut Session,
    last_heartbeat: Instant,
) -> Result<(), SessionError> {
    if Instant::now().duration_since(last_heartbeat) > CLIENT_TIMEOUT {
        return Err(SessionError::HeartbeatTimeout);
    }

    session.ping(b"").await.map_err(SessionError::Network)
}

async fn handle_stream_message(
    session: &mut Session,
    last_heartbeat: &mut Instant,
    message: Option<Result<Message, ProtocolError>>,
) -> Result<(), SessionError> {
    let Some(message) = message else {
        return Err(SessionError::StreamClosed);
    };

    match message {
        Ok(Message::Ping(payload)) => {
            *last_heartbeat = Instant::now();
            session.pong(&payload).await.map_err(SessionError::Network)
        }
        // The feed is read-only; client frames only prove liveness.
        Ok(
            Message::Pong(_)
            | Message::Text(_)
            | Message::Binary(_)
            | Message::Continuation(_)
            | Message::Nop,
        ) => {
            *last_heartbeat = Instant::now();
            Ok(())
        }
        Ok(Message::Close(reason)) => Err(SessionError::ClientClosed(reason)),
        Err(error) => Err(SessionError::Protocol(error)),
    }
}

async fn send_json(session: &mut Session, frame: &FeedMessage) -> Result<(), SessionError> {
    match serde_json::to_string(frame) {
        Ok(body) => session.text(body).await.map_err(SessionError::Network),
        Err(error) => {
            warn!(error = %error, "Failed to serialize trip feed frame");
            Ok(())
        }
    }
}

fn log_shutdown_reason(error: &SessionError) {
    match error {
        SessionError::HeartbeatTimeout => {
            warn!("WebSocket heartbeat timeout; closing connection");
        }
        SessionError::Protocol(error) => {
            warn!(error = %error, "WebSocket protocol error");
        }
        SessionError::Network(error) => {
            warn!(error = %error, "WebSocket send failed; closing connection");
        }
        SessionError::FeedEnded => debug!("trip feed ended; closing connection"),
        SessionError::ClientClosed(_) | SessionError::StreamClosed => {}
    }
}

fn close_reason_for(error: SessionError) -> Option<Option<CloseReason>> {
    match error {
        SessionError::HeartbeatTimeout => Some(Some(CloseReason {
            code: CloseCode::Normal,
            description: Some("heartbeat timeout".to_owned()),
        })),
        SessionError::Protocol(_) => Some(Some(CloseReason {
            code: CloseCode::Protocol,
            description: Some("protocol error".to_owned()),
        })),
        SessionError::FeedEnded => Some(Some(CloseReason {
            code: CloseCode::Normal,
            description: Some("feed ended".to_owned()),
        })),
        SessionError::ClientClosed(reason) => Some(reason),
        SessionError::StreamClosed | SessionError::Network(_) => None,
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
