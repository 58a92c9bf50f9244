use tracing::{error, warn};

use crate::broker::{BrokerChannel, BrokerError, Delivery};
use crate::dispatch::{DispatchOutcome, ExceptionResolution, HandlerRegistry};
use crate::protocol;

/// How a delivery is acknowledged to the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Acknowledge.
    Ack,
    /// Reject and ask for redelivery.
    Requeue,
    /// Reject without requeue.
    Reject,
    /// The delivery could not be decoded; rejected without requeue.
    Malformed,
}

impl Settlement {
    fn from_resolution(resolution: ExceptionResolution) -> Self {
        match resolution {
            ExceptionResolution::Requeue => Settlement::Requeue,
            ExceptionResolution::Default => Settlement::Reject,
        }
    }

    /// Send the acknowledgement for `delivery_tag` on `channel`.
    pub fn apply(self, channel: &dyn BrokerChannel, delivery_tag: u64) -> Result<(), BrokerError> {
        match self {
            Settlement::Ack => channel.ack(delivery_tag),
            Settlement::Requeue => channel.reject(delivery_tag, true),
            Settlement::Reject | Settlement::Malformed => channel.reject(delivery_tag, false),
        }
    }
}

/// Decode a delivery, dispatch it and decide how to acknowledge it.
///
/// Decode failures never reach the registry. Without a registry every
/// delivery is rejected.
pub fn settle(delivery: &Delivery, registry: Option<&HandlerRegistry>) -> Settlement {
    let message = match protocol::decode(delivery) {
        Ok(message) => message,
        Err(err) => {
            error!(
                delivery_tag = delivery.delivery_tag,
                routing_key = %delivery.routing_key,
                error = %err,
                "failed to decode delivery"
            );
            return Settlement::Malformed;
        }
    };

    let Some(registry) = registry else {
        warn!(
            message_id = ?message.message_id,
            "no handler registry attached, rejecting"
        );
        return Settlement::Reject;
    };

    match registry.dispatch(&message) {
        Ok(DispatchOutcome::Resolved(resolution)) => Settlement::from_resolution(resolution),
        Ok(_) => Settlement::Ack,
        Err(err) => {
            let resolution = registry.resolve_exception(&message, &err);
            error!(
                message_id = ?message.message_id,
                message_type = %message.resolved_type(),
                name = ?message.name,
                error = %err,
                ?resolution,
                "message handling failed"
            );
            Settlement::from_resolution(resolution)
        }
    }
}
