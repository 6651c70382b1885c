//! Follow-up automation: rule evaluation and template personalization

mod engine;
mod template;

pub use engine::{FollowUpEngine, FollowUpError, SweepReport};
pub use template::{recipient_name_from, TemplateContext, TemplateRenderer};
