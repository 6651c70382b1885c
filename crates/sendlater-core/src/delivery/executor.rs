//! Delivery executor
//!
//! Performs exactly one send attempt per call and classifies the
//! result. Retry policy belongs to the scheduler, which keeps this a
//! single deterministic step.

use std::sync::Arc;
use tracing::debug;

use super::payload::{encode_raw_message, OutgoingMessage};
use crate::mail::{MailTransport, TransportError};

/// Classified result of one delivery attempt
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Accepted by the mail API
    Sent { message_id: String },
    /// Token invalid/expired/insufficient; not retried automatically
    AuthRequired { reason: String },
    /// Any other failure; the caller decides whether a later attempt
    /// makes sense
    TransientFailure { reason: String },
}

/// Delivery executor over an injected mail transport
pub struct DeliveryExecutor {
    transport: Arc<dyn MailTransport>,
}

impl DeliveryExecutor {
    /// Create a new executor
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Attempt delivery of a fully-resolved message
    pub async fn send(&self, message: &OutgoingMessage) -> Outcome {
        let raw = encode_raw_message(message);

        debug!(
            to = %message.to.join(", "),
            subject = %message.subject,
            "Dispatching send attempt"
        );

        match self.transport.send_raw(&raw).await {
            Ok(receipt) => Outcome::Sent {
                message_id: receipt.id,
            },
            Err(TransportError::AuthRequired(reason)) => Outcome::AuthRequired { reason },
            Err(e) => Outcome::TransientFailure {
                reason: e.to_string(),
            },
        }
    }
}
