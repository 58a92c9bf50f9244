//! Queue listener.
//!
//! A [`QueueListener`] consumes the configured queue and feeds every
//! delivery through the protocol mapper and the handler registry, then
//! acknowledges it according to the outcome:
//!
//! | Outcome                                   | Broker call             |
//! |-------------------------------------------|-------------------------|
//! | handled, dropped event, fallback accepted | `ack`                   |
//! | handler failed, verdict `Requeue`         | `reject(requeue=true)`  |
//! | handler failed, verdict `Default`         | `reject(requeue=false)` |
//! | undecodable delivery, no registry         | `reject(requeue=false)` |
//!
//! ```text
//! Stopped ──start()──► Running ──stop()──► Stopped
//! ```

mod error;
mod settle;
mod stats;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use crate::broker::{BrokerChannel, BrokerConnection, Connector, Delivery, DeliveryCallback};
use crate::config::BrokerSettings;
use crate::dispatch::HandlerRegistry;

pub use error::ListenerError;
pub use settle::{settle, Settlement};
pub use stats::ListenerStats;

use stats::Counters;

/// Lifecycle of a listener.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceStatus {
    #[default]
    Stopped,
    Running,
}

type Subscription = (Arc<dyn BrokerConnection>, Arc<dyn BrokerChannel>, String);

#[derive(Default)]
struct ListenerState {
    status: ServiceStatus,
    starting: bool,
    connection: Option<Arc<dyn BrokerConnection>>,
    channel: Option<Arc<dyn BrokerChannel>>,
    consumer_tag: Option<String>,
}

/// Consumes one queue and dispatches its deliveries.
///
/// Deliveries are handled on whatever thread the channel delivers on.
/// Dropping a running listener stops it.
pub struct QueueListener {
    settings: Arc<BrokerSettings>,
    connector: Arc<dyn Connector>,
    registry: Option<Arc<HandlerRegistry>>,
    state: Mutex<ListenerState>,
    counters: Arc<Counters>,
}

impl QueueListener {
    pub fn new(
        settings: Arc<BrokerSettings>,
        connector: Arc<dyn Connector>,
        registry: Option<Arc<HandlerRegistry>>,
    ) -> Self {
        Self {
            settings,
            connector,
            registry,
            state: Mutex::new(ListenerState::default()),
            counters: Arc::new(Counters::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ListenerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> ServiceStatus {
        self.state().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == ServiceStatus::Running
    }

    pub fn stats(&self) -> ListenerStats {
        self.counters.snapshot()
    }

    pub fn registry(&self) -> Option<&Arc<HandlerRegistry>> {
        self.registry.as_ref()
    }

    /// Consumer tag of the running subscription.
    pub fn consumer_tag(&self) -> Option<String> {
        self.state().consumer_tag.clone()
    }

    /// Connect, open a channel and start consuming. No-op when running or
    /// while another `start` is in progress.
    ///
    /// The state lock is not held while the channel subscribes, so handlers
    /// draining the backlog may query or stop the listener. They observe it
    /// as `Stopped` until the subscription is committed.
    pub fn start(&self) -> Result<(), ListenerError> {
        {
            let mut state = self.state();
            if state.status == ServiceStatus::Running || state.starting {
                return Ok(());
            }
            state.starting = true;
        }

        let subscribed = self.subscribe();
        let mut state = self.state();
        state.starting = false;
        let (connection, channel, consumer_tag) = subscribed?;

        state.status = ServiceStatus::Running;
        state.connection = Some(connection);
        state.channel = Some(channel);
        state.consumer_tag = Some(consumer_tag);
        Ok(())
    }

    fn subscribe(&self) -> Result<Subscription, ListenerError> {
        let queue = self.settings.require_queue()?;
        let target = self.settings.connection_target()?;
        if self.settings.show_parameters_on_startup {
            self.settings.log_summary();
        }

        let connection = self.connector.connect(&target)?;
        let channel = connection.create_channel()?;
        let callback = self.delivery_callback(&channel);
        let consumer_tag = match channel.consume(queue, callback) {
            Ok(tag) => tag,
            Err(err) => {
                if let Err(close_err) = channel.close() {
                    debug!(error = %close_err, "closing channel after failed consume");
                }
                return Err(err.into());
            }
        };

        info!(queue, url = %target.url, consumer_tag = %consumer_tag, "listener started");
        Ok((connection, channel, consumer_tag))
    }

    /// Close the channel and stop. No-op when stopped.
    ///
    /// When closing fails the listener stays `Running` and the error is
    /// returned.
    pub fn stop(&self) -> Result<(), ListenerError> {
        let mut state = self.state();
        if state.status == ServiceStatus::Stopped {
            return Ok(());
        }

        if let Some(channel) = state.channel.as_ref() {
            if channel.is_open() {
                channel.close()?;
            }
        }

        state.status = ServiceStatus::Stopped;
        state.channel = None;
        state.connection = None;
        state.consumer_tag = None;
        info!(queue = ?self.settings.queue, "listener stopped");
        Ok(())
    }

    fn delivery_callback(&self, channel: &Arc<dyn BrokerChannel>) -> DeliveryCallback {
        let channel = Arc::downgrade(channel);
        let registry = self.registry.clone();
        let counters = Arc::clone(&self.counters);

        Arc::new(move |delivery: Delivery| {
            let settlement = settle(&delivery, registry.as_deref());
            counters.record(settlement);

            let Some(channel) = channel.upgrade() else {
                error!(delivery_tag = delivery.delivery_tag, "channel gone before settlement");
                return;
            };
            if let Err(err) = settlement.apply(channel.as_ref(), delivery.delivery_tag) {
                error!(
                    delivery_tag = delivery.delivery_tag,
                    ?settlement,
                    error = %err,
                    "failed to settle delivery"
                );
            }
        })
    }
}

impl Drop for QueueListener {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            error!(error = %err, "failed to stop listener on drop");
        }
    }
}
