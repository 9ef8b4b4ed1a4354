// Application state for HTTP handlers
use crate::domain::snapshot::BmsSnapshot;
use std::time::Instant;
use tokio::sync::watch;

pub struct AppState {
    pub snapshot_rx: watch::Receiver<Option<BmsSnapshot>>,
    pub started: Instant,
}
