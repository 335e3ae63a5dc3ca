//! Poller lifecycle hooks
//!
//! Logging callbacks invoked by the poller on state changes.

use std::time::Duration;
use tracing::{debug, info, warn};

/// Handle connection established (polling started)
pub fn on_connected(symbols: usize, period: Duration) {
    info!("Quote feed connected: {} symbols every {:?}", symbols, period);
}

/// Handle disconnection (polling stopped)
pub fn on_disconnected() {
    info!("Quote feed disconnected");
}

pub fn on_subscribed(symbol: &str, replaced: bool) {
    if replaced {
        debug!("Replaced subscriber for {}", symbol);
    } else {
        info!("Subscribed to {}", symbol);
    }
}

pub fn on_unsubscribed(symbol: &str, remaining: usize) {
    info!("Unsubscribed from {} ({} remaining)", symbol, remaining);
}

pub fn on_reconnecting() {
    info!("Restarting quote feed");
}

pub fn on_frequency_changed(period: Duration) {
    info!("Polling frequency set to {:?}", period);
}

/// Handle a failed quote on one tick
pub fn on_tick_error(symbol: &str, error: &str) {
    warn!("Quote refresh failed for {}: {}", symbol, error);
}

pub fn on_idle_stop() {
    debug!("No subscribed symbols at tick, stopping poll task");
}
