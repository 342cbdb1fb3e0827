// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod error;
mod extract;
mod live;
mod routes;

#[cfg(test)]
mod tests;

use axum::{Router, extract::FromRef};
use clap::Parser;
use parkops_persistence::Persistence;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::{HttpError, ServerError};
use crate::live::{LiveEvent, LiveEventBroadcaster};

/// `ParkOps` Server - HTTP server for the parking operations core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Seconds a request may wait for storage before failing with 503
    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, default_value = "info")]
    log_filter: String,
}

/// Application state shared across handlers.
///
/// Storage is a single connection behind an async mutex. Every write runs
/// as one transaction while the lock is held.
#[derive(Clone)]
pub struct AppState {
    persistence: Arc<Mutex<Persistence>>,
    broadcaster: Arc<LiveEventBroadcaster>,
    request_timeout: Duration,
}

impl AppState {
    fn new(persistence: Persistence, request_timeout: Duration) -> Self {
        Self {
            persistence: Arc::new(Mutex::new(persistence)),
            broadcaster: Arc::new(LiveEventBroadcaster::new()),
            request_timeout,
        }
    }

    /// Acquires the storage handle within the request deadline.
    ///
    /// # Errors
    ///
    /// Returns a 503 error when the deadline passes first.
    pub async fn lock(&self) -> Result<MutexGuard<'_, Persistence>, HttpError> {
        tokio::time::timeout(self.request_timeout, self.persistence.lock())
            .await
            .map_err(|_| {
                warn!(
                    timeout_ms = self.request_timeout.as_millis(),
                    "Timed out waiting for storage"
                );
                HttpError::unavailable(String::from("Storage is busy, retry later"))
            })
    }

    /// Publishes a committed change to live subscribers.
    pub fn publish(&self, event: LiveEvent) {
        self.broadcaster.broadcast(event);
    }
}

impl FromRef<AppState> for Arc<LiveEventBroadcaster> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.broadcaster)
    }
}

fn open_persistence(args: &Args) -> Result<Persistence, ServerError> {
    let mut persistence: Persistence = match &args.database {
        Some(db_path) => {
            info!("Using file-based database at: {}", db_path);
            Persistence::new_with_file(db_path)?
        }
        None => {
            info!("Using in-memory database");
            Persistence::new_in_memory()?
        }
    };
    persistence.set_busy_timeout(Duration::from_secs(args.request_timeout_secs))?;
    Ok(persistence)
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args: Args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter)),
        )
        .init();

    info!("Initializing ParkOps Server");

    let persistence: Persistence = open_persistence(&args)?;
    let app_state: AppState =
        AppState::new(persistence, Duration::from_secs(args.request_timeout_secs));

    let app: Router = routes::build_router(app_state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
