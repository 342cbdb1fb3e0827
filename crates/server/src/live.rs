// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Live update streaming for operator dashboards.
//!
//! Events are published after a write has committed and describe what
//! changed. They are informational only: clients re-read canonical state
//! over HTTP. The channel is push-only and inbound messages are ignored.

use axum::{
    extract::{
        State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use parkops_domain::format_timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Maximum number of events buffered per subscriber.
/// Slow clients lose the oldest events.
const EVENT_BUFFER_SIZE: usize = 256;

/// Kind of record a change event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Site,
    Zone,
    Lane,
    Device,
    Controller,
    Policy,
    Holiday,
    Member,
    Payment,
}

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    Created,
    Updated,
    Deleted,
}

/// Post-commit change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A configuration or membership record changed.
    RecordChanged {
        /// Kind of record.
        entity: Entity,
        /// Identifier of the record.
        id: i64,
        /// Owning site, when known.
        site_id: Option<i64>,
        /// What happened.
        change: Change,
    },
    /// Devices on a lane were replaced.
    LaneDevicesAssigned {
        /// The lane.
        lane_id: i64,
        /// Devices now on the lane.
        device_ids: Vec<i64>,
    },
    /// A controller was claimed or released.
    ControllerToggled {
        /// The controller.
        controller_id: i64,
        /// Site now holding it.
        site_id: Option<i64>,
        /// Site that held it before.
        previous_site_id: Option<i64>,
    },
    /// A site's policies were replaced wholesale.
    PoliciesReset {
        /// The site.
        site_id: i64,
        /// Number of policies now defined.
        count: usize,
    },
    /// A site's selected blacklist changed.
    BlacklistSelected {
        /// The site.
        site_id: i64,
        /// Newly selected blacklist.
        policy_id: i64,
        /// Blacklist selected before.
        previous_policy_id: Option<i64>,
    },
    /// A vehicle entered.
    SessionOpened {
        /// The site.
        site_id: i64,
        /// The new session.
        session_id: i64,
        /// Normalized plate.
        car_number: String,
    },
    /// Settlement progress on an active session.
    SessionUpdated {
        /// The site.
        site_id: i64,
        /// The session.
        session_id: i64,
        /// Status after the update.
        status: String,
    },
    /// A session was closed.
    SessionClosed {
        /// The site.
        site_id: i64,
        /// The session.
        session_id: i64,
        /// `COMPLETED` or `FORCE_COMPLETED`.
        status: String,
        /// Amount collected.
        paid_fee: i64,
    },
    /// Connection confirmation sent on connect.
    Connected {
        /// Server time, `YYYY-MM-DDTHH:MM:SSZ`.
        timestamp: String,
    },
}

/// Fan-out of live events to every connected client.
#[derive(Clone)]
pub struct LiveEventBroadcaster {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveEventBroadcaster {
    /// Creates a broadcaster with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self { tx }
    }

    /// Publishes an event. Dropped silently when nobody is listening.
    pub fn broadcast(&self, event: LiveEvent) {
        match self.tx.send(event) {
            Ok(count) => debug!(receivers = count, "Broadcast live event"),
            Err(_) => debug!("No receivers for live event"),
        }
    }

    /// Receives every event published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Default for LiveEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler for GET `/live`.
///
/// Upgrades the connection and streams live events until the client goes
/// away.
pub async fn live_events_handler(
    ws: WebSocketUpgrade,
    AxumState(broadcaster): AxumState<Arc<LiveEventBroadcaster>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

fn encode(event: &LiveEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            error!(?e, "Failed to serialize live event");
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, broadcaster: Arc<LiveEventBroadcaster>) {
    info!("Client connected to live event stream");

    let (mut sender, mut receiver) = socket.split();
    let mut rx: broadcast::Receiver<LiveEvent> = broadcaster.subscribe();

    let connected: LiveEvent = LiveEvent::Connected {
        timestamp: format_timestamp(time::OffsetDateTime::now_utc())
            .unwrap_or_else(|_| String::from("unknown")),
    };
    let Some(greeting) = encode(&connected) else {
        return;
    };
    if sender.send(greeting).await.is_err() {
        warn!("Failed to send connection confirmation");
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            let event: LiveEvent = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Live client fell behind");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let Some(message) = encode(&event) else {
                continue;
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Inbound traffic is drained and ignored.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    debug!("Ignoring inbound message on live stream");
                }
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => {
                    error!(?e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            debug!("Receive task completed");
            send_task.abort();
        }
    }

    info!("Client disconnected from live event stream");
}
