//! Wiring for a messaging participant.
//!
//! [`MessagingNode::assemble`] turns settings, a connector, a codec and a
//! handler registry into a ready publisher and listener:
//!
//! - nothing is built when `enabled` is false
//! - the logging unsupported-message handler is installed when
//!   `use_default_unsupported_handlers` is set and the registry has none
//! - the listener is started right away when `auto_start` is set

use std::sync::Arc;

use tracing::{debug, info};

use crate::broker::Connector;
use crate::codec::PayloadCodec;
use crate::config::BrokerSettings;
use crate::dispatch::{HandlerRegistry, LogUnsupportedHandler};
use crate::listener::{ListenerError, QueueListener};
use crate::publisher::Publisher;

/// A publisher and a listener sharing one identity and registry.
pub struct MessagingNode {
    settings: Arc<BrokerSettings>,
    registry: Arc<HandlerRegistry>,
    publisher: Arc<Publisher>,
    listener: QueueListener,
}

impl MessagingNode {
    /// Build the node. Returns `Ok(None)` when messaging is disabled.
    pub fn assemble(
        settings: BrokerSettings,
        connector: Arc<dyn Connector>,
        codec: Arc<dyn PayloadCodec>,
        registry: Arc<HandlerRegistry>,
    ) -> Result<Option<Self>, ListenerError> {
        if !settings.enabled {
            info!("messaging disabled");
            return Ok(None);
        }
        let settings = Arc::new(settings);

        if settings.use_default_unsupported_handlers && !registry.has_unsupported_handler() {
            registry.set_unsupported_handler(Some(Arc::new(LogUnsupportedHandler)));
            debug!("installed logging unsupported-message handler");
        }

        let publisher = Arc::new(Publisher::new(
            Arc::clone(&settings),
            Arc::clone(&connector),
            codec,
        ));
        let listener = QueueListener::new(
            Arc::clone(&settings),
            connector,
            Some(Arc::clone(&registry)),
        );

        if settings.auto_start {
            listener.start()?;
        } else {
            info!("listener auto start disabled");
        }

        Ok(Some(Self {
            settings,
            registry,
            publisher,
            listener,
        }))
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Shared publisher, e.g. for handlers that reply with task results.
    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    pub fn listener(&self) -> &QueueListener {
        &self.listener
    }

    /// Stop the listener and drop the publisher's connection.
    pub fn shutdown(&self) -> Result<(), ListenerError> {
        self.listener.stop()?;
        self.publisher.disconnect();
        Ok(())
    }
}
