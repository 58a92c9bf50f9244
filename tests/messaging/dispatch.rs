//! Routing rules observed through a running listener.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use envelope_mq::{HandlerError, HandlerRegistry, InMemoryBroker, Message, MessageType, QueueListener};

use crate::support::{broker_with_services, publisher_for, registry, settings_for, Inbox, TASKS};

fn listen(broker: &InMemoryBroker, service: &str, registry: HandlerRegistry) -> QueueListener {
    let listener = QueueListener::new(
        Arc::new(settings_for(service)),
        Arc::new(broker.clone()),
        Some(Arc::new(registry)),
    );
    listener.start().unwrap();
    listener
}

#[test]
fn handler_names_match_case_insensitively() {
    let broker = broker_with_services(&["worker"]);
    let inbox = Inbox::new();
    let _listener = listen(&broker, "worker", registry().on_task("Render", inbox.record()));
    let publisher = publisher_for(&broker, "client");

    publisher.send_task("render", (), "worker").unwrap();
    publisher.send_task("RENDER", (), "worker").unwrap();

    assert_eq!(inbox.names(), vec!["render", "RENDER"]);
    assert_eq!(broker.acked().len(), 2);
}

#[test]
fn unknown_event_is_dropped_and_acked() {
    let broker = broker_with_services(&["worker"]);
    let listener = listen(&broker, "worker", registry());
    let publisher = publisher_for(&broker, "client");

    publisher.send_event("nobody.cares", "{}").unwrap();

    assert_eq!(broker.acked().len(), 1);
    assert!(broker.rejected().is_empty());
    assert_eq!(listener.stats().acked, 1);
}

#[test]
fn unknown_task_without_fallback_is_dead_lettered() {
    let broker = broker_with_services(&["worker"]);
    let listener = listen(&broker, "worker", registry());
    let publisher = publisher_for(&broker, "client");

    publisher.send_task("unheard.of", "{}", "worker").unwrap();

    assert!(broker.acked().is_empty());
    assert_eq!(broker.rejected().len(), 1);
    assert!(!broker.rejected()[0].requeue);
    assert_eq!(broker.dead_letters().len(), 1);
    assert_eq!(listener.stats().dead_lettered, 1);
}

#[test]
fn unknown_task_with_fallback_is_acked() {
    let broker = broker_with_services(&["worker"]);
    let fallback = Inbox::new();
    let _listener = listen(
        &broker,
        "worker",
        registry().with_unsupported_handler(fallback.record()),
    );
    let publisher = publisher_for(&broker, "client");

    publisher.send_task("unheard.of", "{}", "worker").unwrap();

    assert_eq!(fallback.names(), vec!["unheard.of"]);
    assert_eq!(broker.acked().len(), 1);
}

#[test]
fn task_result_handlers_are_separate_from_task_handlers() {
    let broker = broker_with_services(&["worker"]);
    let tasks = Inbox::new();
    let results = Inbox::new();
    let registry = registry()
        .on_task("render", tasks.record())
        .on_task_result("render", results.record());
    assert_eq!(registry.handlers(MessageType::TaskResult), vec!["render"]);
    let _listener = listen(&broker, "worker", registry);
    let publisher = publisher_for(&broker, "client");

    let task = publisher.send_task("render", (), "worker").unwrap();
    let source = Message::task("render")
        .with_message_id(task.message_id.clone().unwrap())
        .with_sender("worker");
    publisher
        .send_task_result("render", (), Some(0), None, Some(&source))
        .unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(results.len(), 1);
    assert_eq!(results.messages()[0].source_message_id, task.message_id);
}

#[test]
fn interceptor_runs_for_every_delivery() {
    let broker = broker_with_services(&["worker"]);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let _listener = listen(
        &broker,
        "worker",
        registry()
            .on_task("known", |_| Ok(()))
            .with_interceptor(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
    );
    let publisher = publisher_for(&broker, "client");

    publisher.send_task("known", (), "worker").unwrap();
    publisher.send_task("unknown", (), "worker").unwrap();
    publisher.send_event("anything", ()).unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn interceptor_failure_rejects_before_handler() {
    let broker = broker_with_services(&["worker"]);
    let inbox = Inbox::new();
    let _listener = listen(
        &broker,
        "worker",
        registry()
            .on_task("guarded", inbox.record())
            .with_interceptor(|message| match message.param_as_string("token") {
                Some(_) => Ok(()),
                None => Err(HandlerError::Rejected("missing token".into())),
            }),
    );
    let publisher = publisher_for(&broker, "client");

    publisher.send_task("guarded", (), "worker").unwrap();
    publisher
        .send_message(
            Message::task("guarded").with_param("token", "t-1"),
            TASKS,
            "worker",
        )
        .unwrap();

    assert_eq!(inbox.len(), 1);
    assert_eq!(broker.rejected().len(), 1);
    assert_eq!(broker.acked().len(), 1);
    assert!(!broker.rejected()[0].requeue);
}
