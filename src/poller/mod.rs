//! Subscription poller
//!
//! Turns request/response quote fetching into a push-style feed. One shared
//! periodic task refreshes every subscribed symbol each tick and hands the
//! result to that symbol's callback. A synthetic [`ConnectionStatus`] is
//! broadcast to a single status observer whenever polling starts or stops.
//!
//! # Delivery policy
//!
//! - One callback per symbol; subscribing again replaces the previous one.
//! - The callback is looked up when a result is ready, so a symbol
//!   unsubscribed mid-tick gets nothing from that tick and a replaced
//!   callback receives the in-flight result. At most one stale delivery can
//!   race an `unsubscribe` issued from another thread.
//! - Per-symbol failures become [`FeedMessage::Error`] and never stop the
//!   feed or other symbols.

mod handlers;
mod scheduler;
pub mod simulation;

pub use scheduler::PollTask;

use crate::config::{clamp_polling_frequency, PollerConfig};
use crate::models::{now_timestamp, ApiResponse, Quote};
use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Quote-fetching contract the poller depends on
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> ApiResponse<Quote>;
}

/// Message delivered to a symbol's callback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedMessage {
    Quote { symbol: String, data: Quote },
    Error { symbol: String, message: String },
}

/// Synthetic liveness indicator
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<String>,
    pub reconnect_attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type FeedCallback = Arc<dyn Fn(FeedMessage) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Symbol -> single callback slot, remembering registration order
#[derive(Default)]
struct Registry {
    order: Vec<String>,
    callbacks: HashMap<String, FeedCallback>,
}

impl Registry {
    /// Returns true when an existing callback was replaced
    fn insert(&mut self, symbol: String, callback: FeedCallback) -> bool {
        let replaced = self.callbacks.insert(symbol.clone(), callback).is_some();
        if !replaced {
            self.order.push(symbol);
        }
        replaced
    }

    fn remove(&mut self, symbol: &str) {
        if self.callbacks.remove(symbol).is_some() {
            self.order.retain(|s| s != symbol);
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.callbacks.clear();
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

struct Shared {
    source: Arc<dyn QuoteSource>,
    registry: RwLock<Registry>,
    status: RwLock<ConnectionStatus>,
    status_callback: RwLock<Option<StatusCallback>>,
    /// At most one live poll task; `None` means idle
    task: Mutex<Option<PollTask>>,
    frequency: Mutex<Duration>,
    next_task_id: AtomicU64,
}

/// Polling quote feed. Cloning yields another handle to the same feed.
///
/// Methods that may start polling must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct QuotePoller {
    shared: Arc<Shared>,
}

impl QuotePoller {
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self::with_config(source, PollerConfig::default())
    }

    pub fn with_config(source: Arc<dyn QuoteSource>, config: PollerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                registry: RwLock::new(Registry::default()),
                status: RwLock::new(ConnectionStatus::default()),
                status_callback: RwLock::new(None),
                task: Mutex::new(None),
                frequency: Mutex::new(clamp_polling_frequency(config.polling_frequency)),
                next_task_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register (or replace) the callback for `symbol`.
    ///
    /// The first subscriber on an idle poller starts polling.
    pub fn subscribe<F>(&self, symbol: impl Into<String>, callback: F)
    where
        F: Fn(FeedMessage) + Send + Sync + 'static,
    {
        self.subscribe_callback(symbol.into(), Arc::new(callback));
    }

    /// Like [`subscribe`](Self::subscribe), with quotes perturbed by up to ±1%
    /// before delivery. Error messages pass through untouched.
    pub fn subscribe_with_simulation<F>(&self, symbol: impl Into<String>, callback: F)
    where
        F: Fn(FeedMessage) + Send + Sync + 'static,
    {
        self.subscribe(symbol, move |message| callback(simulation::simulate_message(message)));
    }

    pub fn subscribe_callback(&self, symbol: String, callback: FeedCallback) {
        let replaced = self.shared.registry.write().insert(symbol.clone(), callback);
        handlers::on_subscribed(&symbol, replaced);

        // No-op while a task is live, so a subscriber is never left unpolled
        self.shared.start_polling();
    }

    /// Remove `symbol`; the last removal stops polling and disconnects.
    pub fn unsubscribe(&self, symbol: &str) {
        let remaining = {
            let mut registry = self.shared.registry.write();
            registry.remove(symbol);
            registry.len()
        };
        handlers::on_unsubscribed(symbol, remaining);

        if remaining == 0 {
            self.shared.stop_if_idle(None);
        }
    }

    /// Change the poll interval (floored at 1 s), restarting a running task
    pub fn set_polling_frequency(&self, frequency: Duration) {
        let frequency = clamp_polling_frequency(frequency);
        *self.shared.frequency.lock() = frequency;
        handlers::on_frequency_changed(frequency);

        if self.is_polling() {
            self.shared.stop_polling();
            self.shared.start_polling();
        }
    }

    pub fn polling_frequency(&self) -> Duration {
        *self.shared.frequency.lock()
    }

    /// Stop, reset the attempt counter and start polling again.
    ///
    /// Polling restarts even with no subscribers; the first empty tick then
    /// stops it and reports disconnected.
    pub fn reconnect(&self) {
        handlers::on_reconnecting();
        self.shared.stop_polling();
        self.shared.status.write().reconnect_attempts = 0;
        self.shared.start_polling();
    }

    /// Stop polling, drop every subscriber and the status observer.
    pub fn disconnect(&self) {
        self.shared.stop_polling();
        self.shared.registry.write().clear();
        self.shared.status_callback.write().take();
        self.shared.update_connection_status(false);
    }

    /// Register the single status observer, replacing any previous one
    pub fn subscribe_to_connection_status<F>(&self, callback: F)
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        *self.shared.status_callback.write() = Some(Arc::new(callback));
    }

    pub fn unsubscribe_from_connection_status(&self) {
        self.shared.status_callback.write().take();
    }

    /// Snapshot of the current status
    pub fn get_connection_status(&self) -> ConnectionStatus {
        self.shared.status.read().clone()
    }

    /// Subscribed symbols in registration order
    pub fn get_subscribed_symbols(&self) -> Vec<String> {
        self.shared.registry.read().order.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.shared.task.lock().is_some()
    }
}

impl Shared {
    /// Spawn the poll task unless one is already live.
    ///
    /// Status transitions happen while the task slot is locked, so the stored
    /// status always agrees with whether a task exists.
    fn start_polling(self: &Arc<Self>) {
        let period = *self.frequency.lock();
        let snapshot = {
            let mut slot = self.task.lock();
            if slot.is_some() {
                return;
            }

            let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
            let weak: Weak<Shared> = Arc::downgrade(self);
            *slot = Some(PollTask::spawn(id, period, move || {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(shared) => shared.tick(id).await,
                        None => ControlFlow::Break(()),
                    }
                }
            }));
            self.set_connected(true)
        };

        handlers::on_connected(self.registry.read().len(), period);
        self.notify_status(snapshot);
    }

    fn stop_polling(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.stop();
        }
    }

    fn is_current(&self, id: u64) -> bool {
        self.task.lock().as_ref().map(PollTask::id) == Some(id)
    }

    /// One refresh across every subscribed symbol
    async fn tick(&self, id: u64) -> ControlFlow<()> {
        if !self.is_current(id) {
            return ControlFlow::Break(());
        }

        let symbols = self.registry.read().order.clone();
        if symbols.is_empty() {
            if self.stop_if_idle(Some(id)) {
                handlers::on_idle_stop();
                return ControlFlow::Break(());
            }
            // A subscriber arrived after the snapshot; poll it next tick
            return ControlFlow::Continue(());
        }

        join_all(symbols.iter().map(|symbol| async move {
            let message = match self.source.get_quote(symbol).await.into_result() {
                Ok(data) => FeedMessage::Quote {
                    symbol: symbol.clone(),
                    data,
                },
                Err(message) => {
                    handlers::on_tick_error(symbol, &message);
                    FeedMessage::Error {
                        symbol: symbol.clone(),
                        message,
                    }
                }
            };
            self.deliver(symbol, message);
        }))
        .await;

        ControlFlow::Continue(())
    }

    /// Stop polling and report disconnected, but only if the registry is
    /// still empty once the task slot is held.
    ///
    /// `from_task` names the calling poll task; it is released rather than
    /// aborted, and nothing happens if a newer task has replaced it.
    fn stop_if_idle(&self, from_task: Option<u64>) -> bool {
        let (task, snapshot) = {
            let mut slot = self.task.lock();
            if self.registry.read().len() > 0 {
                return false;
            }
            if from_task.is_some() && slot.as_ref().map(PollTask::id) != from_task {
                return false;
            }
            (slot.take(), self.set_connected(false))
        };

        match (task, from_task) {
            (Some(task), Some(_)) => task.detach(),
            (Some(task), None) => task.stop(),
            (None, _) => {}
        }
        self.notify_status(snapshot);
        true
    }

    fn deliver(&self, symbol: &str, message: FeedMessage) {
        let callback = self.registry.read().callbacks.get(symbol).cloned();
        if let Some(callback) = callback {
            callback(message);
        }
    }

    fn update_connection_status(&self, connected: bool) {
        let snapshot = self.set_connected(connected);
        self.notify_status(snapshot);
    }

    fn set_connected(&self, connected: bool) -> ConnectionStatus {
        let mut status = self.status.write();
        status.connected = connected;
        if connected {
            status.last_connected = Some(now_timestamp());
        } else {
            handlers::on_disconnected();
        }
        status.error = None;
        status.clone()
    }

    /// Hand `snapshot` to the status observer; no lock is held while it runs
    fn notify_status(&self, snapshot: ConnectionStatus) {
        let callback = self.status_callback.read().clone();
        if let Some(callback) = callback {
            callback(snapshot);
        }
    }
}
