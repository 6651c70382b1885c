//! Sendlater Core - Scheduling and delivery automation
//!
//! This crate implements the worker core: the trigger source, the daily
//! send budget, the delivery executor against the external mail API,
//! the scheduler state machine, the follow-up rule engine, and the
//! bulk sequential sender.

pub mod bulk;
pub mod delivery;
pub mod followup;
pub mod mail;
pub mod scheduled;
pub mod worker;

pub use bulk::{BulkOutcome, BulkReport, BulkSender, BulkTemplate};
pub use delivery::{DeliveryExecutor, Outcome, OutgoingMessage};
pub use followup::{FollowUpEngine, FollowUpError, SweepReport, TemplateContext, TemplateRenderer};
pub use mail::{
    AuthProvider, AuthSignal, BearerTokenProvider, HistoryEntry, HttpMailClient, HttpSheetClient,
    MailApiConfig, MailHistory, MailTransport, MessageDetail, RowSource, SendReceipt,
    TransportError,
};
pub use scheduled::{
    RateLimiter, Scheduler, SchedulerError, TriggerEvent, TriggerSource,
};
