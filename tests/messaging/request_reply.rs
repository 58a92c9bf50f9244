//! Two services talking through assembled nodes.

use std::sync::Arc;

use envelope_mq::message::{EVENT_PING, EVENT_PONG};
use envelope_mq::{
    HandlerError, HandlerRegistry, InMemoryBroker, JsonCodec, Message, MessagingNode, Payload,
    ServiceStatus,
};

use crate::support::{
    broker_with_services, publisher_for, settings_for, Inbox, RenderThumbnail, ThumbnailRendered,
};

fn node(broker: &InMemoryBroker, service: &str, registry: HandlerRegistry) -> MessagingNode {
    MessagingNode::assemble(
        settings_for(service),
        Arc::new(broker.clone()),
        Arc::new(JsonCodec),
        Arc::new(registry),
    )
    .unwrap()
    .unwrap()
}

#[test]
fn task_and_result_round_trip_between_services() {
    let broker = broker_with_services(&["gateway", "renderer"]);

    let replies = Arc::new(publisher_for(&broker, "renderer"));
    let renderer = node(
        &broker,
        "renderer",
        HandlerRegistry::new().on_task("render", move |task: &Message| {
            let request: RenderThumbnail = task
                .payload_as(&JsonCodec)?
                .ok_or_else(|| HandlerError::DecodeFailed("empty render request".into()))?;
            let rendered = ThumbnailRendered {
                url: format!("https://cdn/{}-{}x{}.png", request.image_id, request.width, request.height),
                image_id: request.image_id,
            };
            replies.send_task_result(
                "render",
                Payload::typed(&rendered)?,
                Some(0),
                Some("ok"),
                Some(task),
            )?;
            Ok(())
        }),
    );

    let results = Inbox::new();
    let gateway = node(
        &broker,
        "gateway",
        HandlerRegistry::new().on_task_result("render", results.record()),
    );
    assert_eq!(gateway.listener().status(), ServiceStatus::Running);

    let task = gateway
        .publisher()
        .send_task(
            "render",
            Payload::typed(&RenderThumbnail {
                image_id: "img-7".into(),
                width: 64,
                height: 64,
            })
            .unwrap(),
            "renderer",
        )
        .unwrap();

    let received = results.messages();
    assert_eq!(received.len(), 1);
    let result = &received[0];
    assert_eq!(result.source_message_id, task.message_id);
    assert_eq!(result.sender_id.as_deref(), Some("renderer"));
    assert_eq!(result.result_code, Some(0));
    assert_eq!(result.result.as_deref(), Some("ok"));
    assert_eq!(
        result.payload_as::<ThumbnailRendered>(&JsonCodec).unwrap(),
        Some(ThumbnailRendered {
            image_id: "img-7".into(),
            url: "https://cdn/img-7-64x64.png".into(),
        })
    );

    assert_eq!(renderer.listener().stats().acked, 1);
    assert_eq!(gateway.listener().stats().acked, 1);
    assert!(broker.rejected().is_empty());
}

#[test]
fn ping_is_answered_with_pong() {
    let broker = broker_with_services(&["responder", "prober"]);

    let responder_publisher = Arc::new(publisher_for(&broker, "responder"));
    let _responder = node(
        &broker,
        "responder",
        HandlerRegistry::new().on_event(EVENT_PING, move |_| {
            responder_publisher.send_event(EVENT_PONG, ())?;
            Ok(())
        }),
    );

    let pongs = Inbox::new();
    let prober = node(
        &broker,
        "prober",
        HandlerRegistry::new().on_event(EVENT_PONG, pongs.record()),
    );

    prober.publisher().send_event(EVENT_PING, ()).unwrap();

    assert_eq!(pongs.len(), 1);
    assert_eq!(pongs.messages()[0].sender_id.as_deref(), Some("responder"));
    // both services see both events; the unhandled ones are dropped and acked
    assert_eq!(broker.acked().len(), 4);
}

#[test]
fn unsupported_tasks_are_logged_and_acked_by_default() {
    let broker = broker_with_services(&["worker"]);
    let worker = node(&broker, "worker", HandlerRegistry::new());
    assert!(worker.registry().has_unsupported_handler());

    publisher_for(&broker, "client")
        .send_task("not.implemented", (), "worker")
        .unwrap();

    assert_eq!(broker.acked().len(), 1);
    assert!(broker.dead_letters().is_empty());
}
