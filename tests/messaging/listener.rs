//! Acknowledgement policy of a running listener.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use envelope_mq::broker::{
    BrokerChannel, BrokerConnection, BrokerError, Connector, DeliveryCallback, TransportProperties,
};
use envelope_mq::{
    ConnectionTarget, ExceptionResolution, HandlerError, HandlerRegistry, InMemoryBroker,
    ListenerError, ListenerStats, QueueListener, ServiceStatus,
};

use crate::support::{broker_with_services, publisher_for, registry, settings_for, Inbox, TASKS};

fn start(broker: &InMemoryBroker, registry: Option<HandlerRegistry>) -> QueueListener {
    let listener = QueueListener::new(
        Arc::new(settings_for("worker")),
        Arc::new(broker.clone()),
        registry.map(Arc::new),
    );
    listener.start().unwrap();
    listener
}

#[test]
fn requeue_verdict_rejects_with_requeue() {
    let broker = broker_with_services(&["worker"]);
    let attempts = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&attempts);
    let listener = start(
        &broker,
        Some(
            registry()
                .on_task("flaky", move |_| {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Err(HandlerError::Rejected("downstream unavailable".into()))
                })
                .with_exception_handler(|_, _| ExceptionResolution::Requeue),
        ),
    );

    publisher_for(&broker, "client")
        .send_task("flaky", (), "worker")
        .unwrap();

    let rejected = broker.rejected();
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].requeue);
    assert_eq!(broker.queue_depth("worker"), 1);
    assert!(broker.dead_letters().is_empty());
    assert_eq!(listener.stats().requeued, 1);

    // the requeued copy comes back flagged as a redelivery
    assert_eq!(broker.deliver_pending("worker"), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn default_verdict_rejects_without_requeue() {
    let broker = broker_with_services(&["worker"]);
    let listener = start(
        &broker,
        Some(
            registry()
                .on_task("broken", |_| Err(HandlerError::Rejected("bad input".into())))
                .with_exception_handler(|_, _| ExceptionResolution::Default),
        ),
    );

    publisher_for(&broker, "client")
        .send_task("broken", (), "worker")
        .unwrap();

    assert!(!broker.rejected()[0].requeue);
    assert_eq!(broker.dead_letters().len(), 1);
    assert_eq!(broker.queue_depth("worker"), 0);
    assert_eq!(listener.stats().dead_lettered, 1);
}

#[test]
fn exception_handler_sees_the_failing_message_and_cause() {
    let broker = broker_with_services(&["worker"]);
    let causes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&causes);
    let _listener = start(
        &broker,
        Some(
            registry()
                .on_task("boom", |_| Err(HandlerError::Rejected("kaput".into())))
                .with_exception_handler(move |message, cause| {
                    sink.lock()
                        .unwrap()
                        .push((message.name.clone(), cause.to_string()));
                    ExceptionResolution::Default
                }),
        ),
    );

    publisher_for(&broker, "client")
        .send_task("boom", (), "worker")
        .unwrap();

    assert_eq!(
        causes.lock().unwrap().clone(),
        vec![(Some("boom".to_string()), "rejected: kaput".to_string())]
    );
}

#[test]
fn headerless_delivery_is_rejected_without_dispatch() {
    let broker = broker_with_services(&["worker"]);
    let dispatched = Inbox::new();
    let listener = start(
        &broker,
        Some(
            registry()
                .with_interceptor(dispatched.record())
                .with_unsupported_handler(|_| Ok(())),
        ),
    );

    let channel = broker
        .connect(&ConnectionTarget::new("amqp://localhost:5672"))
        .unwrap()
        .create_channel()
        .unwrap();
    channel
        .publish(
            TASKS,
            "worker",
            &TransportProperties::default(),
            Some(b"{}".as_slice()),
        )
        .unwrap();

    assert_eq!(dispatched.len(), 0);
    assert_eq!(broker.rejected().len(), 1);
    assert!(!broker.rejected()[0].requeue);
    assert_eq!(
        listener.stats(),
        ListenerStats {
            acked: 0,
            requeued: 0,
            dead_lettered: 1,
            malformed: 1,
        }
    );
}

#[test]
fn listener_without_registry_rejects_everything() {
    let broker = broker_with_services(&["worker"]);
    let _listener = start(&broker, None);

    publisher_for(&broker, "client")
        .send_task("anything", (), "worker")
        .unwrap();

    assert_eq!(broker.dead_letters().len(), 1);
    assert!(broker.acked().is_empty());
}

#[test]
fn backlog_is_consumed_on_start() {
    let broker = broker_with_services(&["worker"]);
    let publisher = publisher_for(&broker, "client");
    publisher.send_task("queued-1", (), "worker").unwrap();
    publisher.send_task("queued-2", (), "worker").unwrap();
    assert_eq!(broker.queue_depth("worker"), 2);

    let inbox = Inbox::new();
    let listener = start(
        &broker,
        Some(
            registry()
                .on_task("queued-1", inbox.record())
                .on_task("queued-2", inbox.record()),
        ),
    );

    assert_eq!(inbox.names(), vec!["queued-1", "queued-2"]);
    assert_eq!(broker.queue_depth("worker"), 0);
    assert_eq!(listener.stats().acked, 2);
}

#[test]
fn stopped_listener_leaves_messages_queued() {
    let broker = broker_with_services(&["worker"]);
    let inbox = Inbox::new();
    let listener = start(&broker, Some(registry().on_task("job", inbox.record())));
    listener.stop().unwrap();
    assert_eq!(listener.status(), ServiceStatus::Stopped);

    publisher_for(&broker, "client")
        .send_task("job", (), "worker")
        .unwrap();
    assert_eq!(inbox.len(), 0);
    assert_eq!(broker.queue_depth("worker"), 1);

    listener.start().unwrap();
    assert_eq!(inbox.len(), 1);
}

// =============================================================================
// Channels that fail to close
// =============================================================================

/// Wraps an [`InMemoryBroker`] so that the next `failures` channel closes
/// return an error without closing anything.
struct StickyClose {
    broker: InMemoryBroker,
    failures: Arc<AtomicUsize>,
}

impl StickyClose {
    fn new(broker: &InMemoryBroker, failures: usize) -> Self {
        Self {
            broker: broker.clone(),
            failures: Arc::new(AtomicUsize::new(failures)),
        }
    }
}

impl Connector for StickyClose {
    fn connect(&self, target: &ConnectionTarget) -> Result<Arc<dyn BrokerConnection>, BrokerError> {
        Ok(Arc::new(StickyConnection {
            inner: self.broker.connect(target)?,
            failures: Arc::clone(&self.failures),
        }))
    }
}

struct StickyConnection {
    inner: Arc<dyn BrokerConnection>,
    failures: Arc<AtomicUsize>,
}

impl BrokerConnection for StickyConnection {
    fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        Ok(Arc::new(StickyChannel {
            inner: self.inner.create_channel()?,
            failures: Arc::clone(&self.failures),
        }))
    }
}

struct StickyChannel {
    inner: Arc<dyn BrokerChannel>,
    failures: Arc<AtomicUsize>,
}

impl BrokerChannel for StickyChannel {
    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: &TransportProperties,
        body: Option<&[u8]>,
    ) -> Result<(), BrokerError> {
        self.inner.publish(exchange, routing_key, properties, body)
    }

    fn consume(&self, queue: &str, on_delivery: DeliveryCallback) -> Result<String, BrokerError> {
        self.inner.consume(queue, on_delivery)
    }

    fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.inner.ack(delivery_tag)
    }

    fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError> {
        self.inner.reject(delivery_tag, requeue)
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&self) -> Result<(), BrokerError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BrokerError::Other("close timed out".into()));
        }
        self.inner.close()
    }
}

#[test]
fn failed_close_keeps_listener_running_for_retry() {
    let broker = broker_with_services(&["worker"]);
    let listener = QueueListener::new(
        Arc::new(settings_for("worker")),
        Arc::new(StickyClose::new(&broker, 1)),
        Some(Arc::new(registry())),
    );
    listener.start().unwrap();

    let err = listener.stop().unwrap_err();
    assert!(matches!(err, ListenerError::Broker(BrokerError::Other(_))));
    assert_eq!(listener.status(), ServiceStatus::Running);
    assert!(listener.consumer_tag().is_some());
    assert!(broker.has_consumer("worker"));

    listener.stop().unwrap();
    assert_eq!(listener.status(), ServiceStatus::Stopped);
    assert!(listener.consumer_tag().is_none());
    assert!(!broker.has_consumer("worker"));
}
