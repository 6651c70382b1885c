//! Delivery of fully-resolved messages against the mail-send capability

mod executor;
mod payload;

pub use executor::{DeliveryExecutor, Outcome};
pub use payload::{encode_raw_message, OutgoingMessage};
