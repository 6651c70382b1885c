//! Sendlater Storage - SQLite persistence layer
//!
//! This crate provides the durable state of the worker: work items,
//! the daily send budget, follow-up rules, the sent-message history,
//! and the follow-up processed set.

pub mod db;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use models::*;
pub use repository::*;
