//! Repository layer for data access

pub mod auth_state;
pub mod budget;
pub mod followup_log;
pub mod rules;
pub mod sent_messages;
pub mod work_items;

pub use auth_state::AuthStateRepository;
pub use budget::BudgetRepository;
pub use followup_log::FollowUpLogRepository;
pub use rules::FollowUpRuleRepository;
pub use sent_messages::SentMessageRepository;
pub use work_items::WorkItemRepository;
