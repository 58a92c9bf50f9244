//! Envelope fields survive encode, transport and decode.

use envelope_mq::broker::{Delivery, Headers, TransportProperties};
use envelope_mq::protocol::{self, HEADER_MESSAGE_TYPE, STRUCTURAL_HEADERS};
use envelope_mq::{CodecError, HeaderValue, JsonCodec, Message, MessageType, Payload, ProtocolError};

use crate::support::{
    broker_with_services, publisher_for, redeliver, ImageUploaded, RenderThumbnail, EVENTS, TASKS,
};

fn headers_only(headers: Headers) -> Delivery {
    Delivery {
        delivery_tag: 1,
        exchange: TASKS.into(),
        routing_key: "svc".into(),
        redelivered: false,
        properties: TransportProperties {
            headers: Some(headers),
            ..TransportProperties::default()
        },
        body: None,
    }
}

#[test]
fn task_round_trips_through_broker() {
    let broker = broker_with_services(&["renderer"]);
    let publisher = publisher_for(&broker, "gateway");
    let payload = RenderThumbnail {
        image_id: "img-1".into(),
        width: 128,
        height: 96,
    };

    let sent = publisher
        .send_task("render", Payload::typed(&payload).unwrap(), "renderer")
        .unwrap();

    let published = &broker.published_to(TASKS)[0];
    let received = protocol::decode(&redeliver(published)).unwrap();

    assert_eq!(received.message_type, Some(MessageType::Task));
    assert_eq!(received.name.as_deref(), Some("render"));
    assert_eq!(received.message_id, sent.message_id);
    assert_eq!(received.sender_id.as_deref(), Some("gateway"));
    assert_eq!(received.protocol_version.as_deref(), Some("1.1"));
    assert_eq!(received.routing_key.as_deref(), Some("renderer"));
    assert_eq!(received.content_type.as_deref(), Some("application/json"));
    assert_eq!(received.payload_class(), sent.payload_class());
    assert_eq!(
        received.payload_as::<RenderThumbnail>(&JsonCodec).unwrap(),
        Some(payload)
    );
}

#[test]
fn params_and_structural_headers_all_arrive() {
    let broker = broker_with_services(&[]);
    let publisher = publisher_for(&broker, "svc");
    let message = Message::event("audit")
        .with_param("tenant", "acme")
        .with_param("attempt", 3)
        .with_param("dry_run", true)
        .with_process_id("proc-42");

    publisher.send_message(message, EVENTS, "").unwrap();

    let received = protocol::decode(&redeliver(&broker.published_to(EVENTS)[0])).unwrap();
    assert_eq!(received.param_as_string("tenant").as_deref(), Some("acme"));
    assert_eq!(received.param_as_integer("attempt"), Some(3));
    assert_eq!(received.param("dry_run"), Some(&HeaderValue::Bool(true)));
    assert_eq!(received.process_id.as_deref(), Some("proc-42"));
    for key in STRUCTURAL_HEADERS {
        assert!(received.param(key).is_some(), "missing structural header {}", key);
    }
}

#[test]
fn type_literals_classify_in_any_casing() {
    let cases = [
        ("task", MessageType::Task),
        ("TASK", MessageType::Task),
        ("Task_Result", MessageType::TaskResult),
        ("EVENT", MessageType::Event),
        ("Error", MessageType::Error),
        ("notification", MessageType::Unknown),
    ];
    for (literal, expected) in cases {
        let mut headers = Headers::new();
        headers.insert(HEADER_MESSAGE_TYPE.into(), HeaderValue::from(literal));
        let message = protocol::decode(&headers_only(headers)).unwrap();
        assert_eq!(message.message_type, Some(expected), "literal {}", literal);
        assert_eq!(message.type_original.as_deref(), Some(literal));
    }
}

#[test]
fn missing_type_header_is_unknown() {
    let message = protocol::decode(&headers_only(Headers::new())).unwrap();
    assert_eq!(message.message_type, Some(MessageType::Unknown));
    assert_eq!(message.type_original, None);
}

#[test]
fn headerless_delivery_is_rejected_by_the_mapper() {
    let mut delivery = headers_only(Headers::new());
    delivery.properties.headers = None;
    assert_eq!(protocol::decode(&delivery).unwrap_err(), ProtocolError::MissingHeaders);
}

#[test]
fn message_id_is_assigned_once() {
    let mut message = Message::event("x");
    let first = message.ensure_message_id().to_string();
    let second = message.ensure_message_id().to_string();
    assert_eq!(first, second);

    let props = protocol::encode_properties(&mut message, "svc");
    assert_eq!(props.message_id.as_deref(), Some(first.as_str()));
}

#[test]
fn typed_payload_of_another_shape_is_a_mismatch() {
    let message = Message::event("uploaded").with_payload(
        Payload::typed(&ImageUploaded {
            image_id: "img-1".into(),
            bytes: 2048,
        })
        .unwrap(),
    );
    let err = message.payload_as::<RenderThumbnail>(&JsonCodec).unwrap_err();
    assert!(matches!(err, CodecError::ShapeMismatch { .. }));
}

#[test]
fn unset_payload_travels_without_body() {
    let broker = broker_with_services(&[]);
    let publisher = publisher_for(&broker, "svc");
    publisher.send_event("ping", ()).unwrap();

    let published = &broker.published_to(EVENTS)[0];
    assert_eq!(published.body, None);
    let received = protocol::decode(&redeliver(published)).unwrap();
    assert!(received.payload().is_unset());
    assert_eq!(received.payload_class(), None);
    assert_eq!(received.payload_as::<ImageUploaded>(&JsonCodec).unwrap(), None);
}
